//! Added-as-contact acknowledgment handshake
//!
//! Establishes mutual knowledge that "A added B as a contact":
//!
//! ```text
//! Alice (added Bob)              Bob
//!   |                             |
//!   |--- AddedContactQuery ------>|  Bob records Alice as follower
//!   |<-- AddedContactAck ---------|  Alice sets added_ack on Bob
//! ```
//!
//! Delivery of the query is not guaranteed, and no retry timer exists:
//! whenever any handler produces positive liveness evidence for a contact
//! whose `added_ack` is still false, the query is re-sent. Once
//! acknowledged, liveness evidence triggers the best-effort relay hint
//! instead.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ContactResult;
use crate::registry::ContactRegistry;
use crate::sync::events::ContactEvent;
use crate::sync::protocol::{contacts_topic, ProtocolMessage};
use crate::sync::resolver::ContactResolver;
use crate::sync::transport::MessageTransport;
use crate::types::contact::short_identity;
use crate::types::Contact;

/// Drives the mutual added-as-contact acknowledgment protocol
pub struct HandshakeController {
    registry: ContactRegistry,
    transport: Arc<MessageTransport>,
    resolver: Arc<ContactResolver>,
    own_pubkey: String,
    events: broadcast::Sender<ContactEvent>,
}

impl HandshakeController {
    /// Create the handshake controller
    pub fn new(
        registry: ContactRegistry,
        transport: Arc<MessageTransport>,
        resolver: Arc<ContactResolver>,
        own_pubkey: String,
        events: broadcast::Sender<ContactEvent>,
    ) -> Self {
        Self {
            registry,
            transport,
            resolver,
            own_pubkey,
            events,
        }
    }

    /// Ask a contact to acknowledge that we added it
    pub async fn request_ack(&self, contact: &Contact) -> ContactResult<()> {
        self.transport
            .send(
                contact.contacts_topic,
                &ProtocolMessage::AddedContactQuery {
                    from: self.own_pubkey.clone(),
                },
            )
            .await
    }

    /// Handle an inbound "I added you as a contact" announcement
    ///
    /// Records the sender as a follower, schedules a background pool fill
    /// if the sender is unresolved, replies with an acknowledgment and
    /// treats the exchange as liveness evidence.
    pub async fn handle_added_contact_query(&self, from: &str) -> ContactResult<()> {
        if self.registry.insert_follower(from) {
            debug!(peer = %short_identity(from), "Peer added us as a contact");
            let _ = self.events.send(ContactEvent::FollowerAdded {
                pubkey: from.to_string(),
            });
        }

        if !self.registry.has_in_pool(from) {
            self.resolver.spawn_ensure_pooled(from);
        }

        self.transport
            .send(
                contacts_topic(from),
                &ProtocolMessage::AddedContactAck {
                    from: self.own_pubkey.clone(),
                },
            )
            .await?;

        self.on_alive(from).await;
        Ok(())
    }

    /// Handle an inbound acknowledgment of our added-as-contact query
    ///
    /// Directory-only: acks from peers we never added are dropped.
    pub async fn handle_added_contact_ack(&self, from: &str) -> ContactResult<()> {
        if !self.registry.has_in_directory(from) {
            debug!(peer = %short_identity(from), "Dropping AddedContactAck from non-directory sender");
            return Ok(());
        }

        self.registry.set_added_ack(from);
        debug!(peer = %short_identity(from), "Contact acknowledged being added");
        let _ = self.events.send(ContactEvent::AddedAckConfirmed {
            pubkey: from.to_string(),
        });

        self.on_alive(from).await;
        Ok(())
    }

    /// React to positive liveness evidence for a peer
    ///
    /// Not a directory member: nothing to do. Unacknowledged: re-send the
    /// added-as-contact query, piggybacking the retry on the liveness
    /// signal. Acknowledged: fire the best-effort relay hint. Failures here
    /// are logged, never propagated.
    pub async fn on_alive(&self, pubkey: &str) {
        let Some(contact) = self.registry.find_in_directory(pubkey) else {
            return;
        };

        if !contact.added_ack {
            if let Err(e) = self.request_ack(&contact).await {
                warn!(peer = %contact.identity, error = %e, "Failed to re-send added-contact query");
            }
        } else {
            self.resolver.relay_hint(&contact).await;
        }
    }
}
