use thiserror::Error;

use crate::core::activity::{ActivityName, Email};

/// Rejections raised by the activity registry. The display text is what callers see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Activity not found")]
    NotFound { activity: ActivityName },

    #[error("Student is already signed up")]
    AlreadyRegistered { activity: ActivityName, email: Email },

    #[error("Student is not signed up for this activity")]
    NotRegistered { activity: ActivityName, email: Email },

    #[error("Activity is full")]
    Full {
        activity: ActivityName,
        max_participants: usize,
    },

    /// Seed data that would break the capacity or uniqueness invariant.
    #[error("invalid activity {activity}: {reason}")]
    InvalidActivity {
        activity: ActivityName,
        reason: String,
    },
}
