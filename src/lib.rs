pub mod config;
pub mod core;
pub mod inmemory_db;
pub mod seed;
pub mod server;

pub use crate::config::ServerConfig;
pub use crate::core::{Activity, ActivityListing, ActivityName, Client, Email, RegistryError};
pub use crate::inmemory_db::Db;
pub use crate::server::{router, Server, ServerError, ServerState};
