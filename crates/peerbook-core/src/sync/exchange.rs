//! Directory-list exchange and transitive discovery
//!
//! A directory contact can be asked for the contacts it is willing to
//! disclose; the reply feeds transitive discovery, resolving every listed
//! pubkey missing from the pool in the background.
//!
//! Disclosure is guarded twice: queries from peers outside our directory
//! get no reply at all, and the reply payload is computed by
//! `public_contacts` under the current privacy settings, never more.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ContactResult;
use crate::registry::ContactRegistry;
use crate::sync::events::ContactEvent;
use crate::sync::handshake::HandshakeController;
use crate::sync::protocol::{is_well_formed_pubkey, ProtocolMessage};
use crate::sync::resolver::ContactResolver;
use crate::sync::transport::MessageTransport;
use crate::types::contact::short_identity;
use crate::types::{Contact, PrivacySettings};

/// Query/reply exchange of directory membership
pub struct ContactListExchange {
    registry: ContactRegistry,
    transport: Arc<MessageTransport>,
    resolver: Arc<ContactResolver>,
    handshake: Arc<HandshakeController>,
    settings: Arc<RwLock<PrivacySettings>>,
    own_pubkey: String,
    events: broadcast::Sender<ContactEvent>,
}

impl ContactListExchange {
    /// Create the exchange controller
    pub fn new(
        registry: ContactRegistry,
        transport: Arc<MessageTransport>,
        resolver: Arc<ContactResolver>,
        handshake: Arc<HandshakeController>,
        settings: Arc<RwLock<PrivacySettings>>,
        own_pubkey: String,
        events: broadcast::Sender<ContactEvent>,
    ) -> Self {
        Self {
            registry,
            transport,
            resolver,
            handshake,
            settings,
            own_pubkey,
            events,
        }
    }

    /// Ask a contact for its disclosed contact list
    pub async fn query_contact_list(&self, contact: &Contact) -> ContactResult<()> {
        self.transport
            .send(
                contact.contacts_topic,
                &ProtocolMessage::QueryContacts {
                    from: self.own_pubkey.clone(),
                },
            )
            .await
    }

    /// Handle an inbound contacts query
    ///
    /// Unknown senders receive no reply; replying would disclose our
    /// contact list to an unconfirmed peer.
    pub async fn handle_query_contacts(&self, from: &str) -> ContactResult<()> {
        let Some(contact) = self.registry.find_in_directory(from) else {
            debug!(peer = %short_identity(from), "Dropping contacts query from non-directory sender");
            return Ok(());
        };

        let disclosed = {
            let settings = *self.settings.read();
            self.registry.public_contacts(&settings)
        };

        self.transport
            .send(
                contact.contacts_topic,
                &ProtocolMessage::ContactsReply {
                    from: self.own_pubkey.clone(),
                    contacts: disclosed,
                },
            )
            .await?;

        self.handshake.on_alive(from).await;
        Ok(())
    }

    /// Handle an inbound contacts reply
    ///
    /// Directory-only. Entries failing the pubkey syntax check are dropped
    /// before anything treats them as resolvable; the surviving list is
    /// persisted against the sender and every pubkey missing from the pool
    /// is scheduled for background resolution.
    pub async fn handle_contacts_reply(&self, from: &str, contacts: &[String]) -> ContactResult<()> {
        if !self.registry.has_in_directory(from) {
            debug!(peer = %short_identity(from), "Dropping contacts reply from non-directory sender");
            return Ok(());
        }

        let valid: Vec<String> = contacts
            .iter()
            .filter(|c| is_well_formed_pubkey(c))
            .cloned()
            .collect();
        let dropped = contacts.len() - valid.len();
        if dropped > 0 {
            warn!(peer = %short_identity(from), dropped, "Dropping malformed pubkeys from contacts reply");
        }

        self.registry.set_known_contacts(from, &valid);
        debug!(peer = %short_identity(from), count = valid.len(), "Received contact list");
        let _ = self.events.send(ContactEvent::ContactListReceived {
            pubkey: from.to_string(),
            count: valid.len(),
        });

        for pubkey in self.registry.missing_in_pool(&valid) {
            self.resolver.spawn_ensure_pooled(&pubkey);
        }

        self.handshake.on_alive(from).await;
        Ok(())
    }
}
