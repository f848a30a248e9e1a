//! Liveness probing with ping/pong token challenges
//!
//! A challenge stores a fresh token on the contact and sends it in a `Ping`;
//! the peer echoes the token unchanged in a `Pong`. Matching the echoed
//! token against the stored one correlates request and response despite
//! reordering and duplication. A missing or mismatched token is network
//! noise, never an error.

use std::sync::Arc;

use rand::RngCore;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ContactResult;
use crate::registry::ContactRegistry;
use crate::sync::events::ContactEvent;
use crate::sync::handshake::HandshakeController;
use crate::sync::protocol::ProtocolMessage;
use crate::sync::resolver::ContactResolver;
use crate::sync::transport::MessageTransport;
use crate::types::contact::short_identity;
use crate::types::Contact;

/// Generate a fresh liveness token (16 random bytes, hex)
pub(crate) fn generate_ping_token() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and verifies ping/pong token challenges
pub struct LivenessProbe {
    registry: ContactRegistry,
    transport: Arc<MessageTransport>,
    resolver: Arc<ContactResolver>,
    handshake: Arc<HandshakeController>,
    own_pubkey: String,
    events: broadcast::Sender<ContactEvent>,
}

impl LivenessProbe {
    /// Create the liveness probe
    pub fn new(
        registry: ContactRegistry,
        transport: Arc<MessageTransport>,
        resolver: Arc<ContactResolver>,
        handshake: Arc<HandshakeController>,
        own_pubkey: String,
        events: broadcast::Sender<ContactEvent>,
    ) -> Self {
        Self {
            registry,
            transport,
            resolver,
            handshake,
            own_pubkey,
            events,
        }
    }

    /// Issue a fresh liveness challenge to a contact
    ///
    /// Overwrites any prior token; only the most recent challenge is valid.
    pub async fn issue_challenge(&self, contact: &Contact) -> ContactResult<()> {
        let token = generate_ping_token();
        self.registry.set_ping_token(&contact.pubkey, &token);
        debug!(peer = %contact.identity, "Issuing liveness challenge");

        self.transport
            .send(
                contact.contacts_topic,
                &ProtocolMessage::Ping {
                    from: self.own_pubkey.clone(),
                    token,
                },
            )
            .await
    }

    /// Handle an inbound liveness challenge
    ///
    /// Probes from unresolved senders are not answered; the sender is
    /// scheduled for a background pool fill and will retry. Known senders
    /// get a `Pong` echoing the token unchanged.
    pub async fn handle_ping(&self, from: &str, token: &str) -> ContactResult<()> {
        let Some(contact) = self.registry.find_in_pool(from) else {
            debug!(peer = %short_identity(from), "Dropping ping from unresolved sender, scheduling pool fill");
            self.resolver.spawn_ensure_pooled(from);
            return Ok(());
        };

        self.transport
            .send(
                contact.contacts_topic,
                &ProtocolMessage::Pong {
                    from: self.own_pubkey.clone(),
                    token: token.to_string(),
                },
            )
            .await
    }

    /// Handle an inbound liveness response
    ///
    /// Directory-only; a pong from anyone else, or one carrying anything
    /// but the last issued token, is dropped silently.
    pub async fn handle_pong(&self, from: &str, token: &str) -> ContactResult<()> {
        let Some(contact) = self.registry.find_in_directory(from) else {
            debug!(peer = %short_identity(from), "Dropping pong from non-directory sender");
            return Ok(());
        };

        if contact.ping_token.as_deref() != Some(token) {
            debug!(peer = %contact.identity, "Dropping pong with stale token");
            return Ok(());
        }

        self.registry.mark_alive(from);
        debug!(peer = %contact.identity, "Liveness confirmed");
        let _ = self.events.send(ContactEvent::ContactAlive {
            pubkey: from.to_string(),
        });

        self.handshake.on_alive(from).await;
        Ok(())
    }
}
