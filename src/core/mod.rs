pub mod activity;
pub mod client;
pub mod error;

pub use activity::{Activity, ActivityListing, ActivityName, Email};
pub use client::{Client, ClientError};
pub use error::RegistryError;
