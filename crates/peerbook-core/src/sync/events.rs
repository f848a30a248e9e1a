//! Contact events for observers
//!
//! Emitted on a broadcast channel whenever contact state changes. Consumers
//! (UI layers, higher-level services) subscribe via
//! [`ContactSync::subscribe_events`](crate::sync::service::ContactSync::subscribe_events);
//! a lagging or absent receiver never blocks the protocol.

/// Event emitted by the contact sync core
#[derive(Debug, Clone, PartialEq)]
pub enum ContactEvent {
    /// A peer was added to the directory
    ContactAdded { pubkey: String },
    /// A peer was explicitly removed from the directory or pool
    ContactRemoved { pubkey: String },
    /// A peer was resolved and stored into the pool
    ContactResolved { pubkey: String },
    /// Positive liveness evidence arrived for a peer
    ContactAlive { pubkey: String },
    /// A directory contact acknowledged being added
    AddedAckConfirmed { pubkey: String },
    /// A peer announced it added us as a contact
    FollowerAdded { pubkey: String },
    /// A directory contact disclosed its contact list
    ContactListReceived { pubkey: String, count: usize },
}

impl ContactEvent {
    /// The pubkey this event concerns
    pub fn pubkey(&self) -> &str {
        match self {
            Self::ContactAdded { pubkey }
            | Self::ContactRemoved { pubkey }
            | Self::ContactResolved { pubkey }
            | Self::ContactAlive { pubkey }
            | Self::AddedAckConfirmed { pubkey }
            | Self::FollowerAdded { pubkey }
            | Self::ContactListReceived { pubkey, .. } => pubkey,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_pubkey_accessor() {
        let event = ContactEvent::ContactListReceived {
            pubkey: "peerA".to_string(),
            count: 3,
        };
        assert_eq!(event.pubkey(), "peerA");

        let event = ContactEvent::ContactAlive {
            pubkey: "peerB".to_string(),
        };
        assert_eq!(event.pubkey(), "peerB");
    }
}
