//! Error types for Peerbook

use thiserror::Error;

/// Main error type for Peerbook operations
#[derive(Error, Debug)]
pub enum ContactError {
    /// Attempted to add or process our own pubkey as a contact
    #[error("Cannot add own pubkey as contact: {0}")]
    SelfReference(String),

    /// Profile resolution collaborator could not produce a contact
    #[error("Resolution failed for {pubkey}: {reason}")]
    Resolution { pubkey: String, reason: String },

    /// Contact was not found in the relevant registry collection
    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    /// Error during transport operations (publish/subscribe)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Send attempted while no subscription is active
    #[error("Not subscribed: transport has no active subscription")]
    NotSubscribed,

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related error
    #[error("Network error: {0}")]
    Network(String),

    /// Relay connect attempt failed
    #[error("Relay error: {0}")]
    Relay(String),
}

/// Result type alias using ContactError
pub type ContactResult<T> = Result<T, ContactError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContactError::SelfReference("abc123".to_string());
        assert_eq!(
            format!("{}", err),
            "Cannot add own pubkey as contact: abc123"
        );
    }

    #[test]
    fn test_resolution_error_display() {
        let err = ContactError::Resolution {
            pubkey: "peer1".to_string(),
            reason: "unreachable".to_string(),
        };
        assert_eq!(format!("{}", err), "Resolution failed for peer1: unreachable");
    }
}
