//! Error types for the player registry

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur in the player registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The roster already holds the maximum number of players
    #[error("Tournament is full: all {capacity} slots are taken")]
    CapacityExceeded { capacity: usize },

    /// A player with the same UID is already registered
    #[error("A player with UID {uid} is already registered")]
    DuplicateUid { uid: String },

    /// A player with the same email (case-insensitive) is already registered
    #[error("A player with email {email} is already registered")]
    DuplicateEmail { email: String },

    /// The backing file exists but could not be parsed
    #[error("Backing file {path} is corrupted: {reason}")]
    Corrupted { path: String, reason: String },

    /// I/O errors while reading or writing the backing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new corruption error for the given backing file
    pub fn corrupted(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Corrupted { path: path.display().to_string(), reason: reason.into() }
    }

    /// Whether this error is an admission rule rejecting the candidate,
    /// as opposed to a storage failure
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::DuplicateUid { .. } | Self::DuplicateEmail { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_rejections() {
        assert!(RegistryError::CapacityExceeded { capacity: 48 }.is_admission_rejection());
        assert!(RegistryError::DuplicateUid { uid: "123456789".into() }.is_admission_rejection());
        assert!(RegistryError::DuplicateEmail { email: "a@x.com".into() }.is_admission_rejection());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!RegistryError::from(io).is_admission_rejection());
        assert!(!RegistryError::config("bad").is_admission_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = RegistryError::CapacityExceeded { capacity: 48 };
        assert_eq!(err.to_string(), "Tournament is full: all 48 slots are taken");

        let err = RegistryError::corrupted(std::path::Path::new("data/players.json"), "eof");
        assert_eq!(err.to_string(), "Backing file data/players.json is corrupted: eof");
    }
}
