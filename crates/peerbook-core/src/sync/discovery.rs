//! Contact discovery orchestration
//!
//! Adding a peer to the directory resolves it, stores it, and kicks off the
//! full introduction sequence: best-effort relay connect, a liveness
//! challenge, the added-as-contact query, and a contact-list query. Bulk
//! operations fan the single-contact operations out over the whole
//! directory concurrently, capturing each contact's outcome independently.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{ContactError, ContactResult};
use crate::registry::ContactRegistry;
use crate::sync::events::ContactEvent;
use crate::sync::exchange::ContactListExchange;
use crate::sync::handshake::HandshakeController;
use crate::sync::liveness::LivenessProbe;
use crate::sync::resolver::ContactResolver;
use crate::types::Contact;

/// Per-contact outcome of a bulk fan-out operation
pub type FanOutOutcome = (String, ContactResult<()>);

/// Orchestrates directory/pool membership changes and bulk operations
pub struct DiscoveryController {
    registry: ContactRegistry,
    resolver: Arc<ContactResolver>,
    liveness: Arc<LivenessProbe>,
    handshake: Arc<HandshakeController>,
    exchange: Arc<ContactListExchange>,
    events: broadcast::Sender<ContactEvent>,
}

impl DiscoveryController {
    /// Create the discovery controller
    pub fn new(
        registry: ContactRegistry,
        resolver: Arc<ContactResolver>,
        liveness: Arc<LivenessProbe>,
        handshake: Arc<HandshakeController>,
        exchange: Arc<ContactListExchange>,
        events: broadcast::Sender<ContactEvent>,
    ) -> Self {
        Self {
            registry,
            resolver,
            liveness,
            handshake,
            exchange,
            events,
        }
    }

    /// Add a peer to the directory and introduce ourselves
    ///
    /// Fails with `SelfReference` for the own pubkey and with the
    /// resolution error when the peer cannot be resolved; in both cases no
    /// state is stored. After the directory store, the relay hint is
    /// best-effort while send failures of the introduction messages surface
    /// to the caller.
    pub async fn add_to_directory(&self, pubkey: &str) -> ContactResult<Contact> {
        if pubkey == self.registry.own_pubkey() {
            return Err(ContactError::SelfReference(pubkey.to_string()));
        }

        let contact = match self.registry.find_in_pool(pubkey) {
            Some(contact) => contact,
            None => {
                let contact = self.resolver.resolve_contact(pubkey).await?;
                self.registry.insert_pool(contact.clone())?;
                contact
            }
        };

        self.registry.insert_directory(contact.clone())?;
        info!(peer = %contact.identity, "Added contact to directory");
        let _ = self.events.send(ContactEvent::ContactAdded {
            pubkey: pubkey.to_string(),
        });

        self.resolver.relay_hint(&contact).await;
        self.liveness.issue_challenge(&contact).await?;
        self.handshake.request_ack(&contact).await?;
        self.exchange.query_contact_list(&contact).await?;

        Ok(contact)
    }

    /// Resolve a peer into the pool if missing
    ///
    /// No-op for the own pubkey and for peers already pooled.
    pub async fn add_to_pool(&self, pubkey: &str) -> ContactResult<()> {
        self.resolver.ensure_pooled(pubkey).await
    }

    /// Fetch a single referenced pubkey into the pool if absent
    pub async fn fetch_if_missing(&self, pubkey: &str) -> ContactResult<()> {
        self.add_to_pool(pubkey).await
    }

    /// Fetch every referenced pubkey absent from the pool, concurrently
    ///
    /// Targets run as independent tasks with no ordering guarantee;
    /// concurrent references to the same pubkey share one resolution.
    pub async fn fetch_all_missing<I, S>(&self, refs: I) -> Vec<FanOutOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let missing = self.registry.missing_in_pool(refs);
        join_all(missing.into_iter().map(|pubkey| async move {
            let result = self.add_to_pool(&pubkey).await;
            (pubkey, result)
        }))
        .await
    }

    /// Remove a contact from the directory
    pub async fn remove_from_directory(&self, pubkey: &str) -> ContactResult<Contact> {
        let contact = self
            .registry
            .remove_from_directory(pubkey)
            .ok_or_else(|| ContactError::ContactNotFound(pubkey.to_string()))?;
        info!(peer = %contact.identity, "Removed contact from directory");
        let _ = self.events.send(ContactEvent::ContactRemoved {
            pubkey: pubkey.to_string(),
        });
        Ok(contact)
    }

    /// Remove a contact from the pool
    pub async fn remove_from_pool(&self, pubkey: &str) -> ContactResult<Contact> {
        let contact = self
            .registry
            .remove_from_pool(pubkey)
            .ok_or_else(|| ContactError::ContactNotFound(pubkey.to_string()))?;
        debug!(peer = %contact.identity, "Removed contact from pool");
        let _ = self.events.send(ContactEvent::ContactRemoved {
            pubkey: pubkey.to_string(),
        });
        Ok(contact)
    }

    /// Refresh a single directory contact
    ///
    /// Liveness challenge, handshake retry while unacknowledged, and a
    /// contact-list query.
    pub async fn update_contact(&self, contact: &Contact) -> ContactResult<()> {
        self.liveness.issue_challenge(contact).await?;
        if !contact.added_ack {
            self.handshake.request_ack(contact).await?;
        }
        self.exchange.query_contact_list(contact).await
    }

    /// Refresh every directory contact concurrently
    pub async fn update_all_contacts(&self) -> Vec<FanOutOutcome> {
        self.fan_out(|contact| async move { self.update_contact(&contact).await })
            .await
    }

    /// Issue a liveness challenge to every directory contact
    pub async fn ping_all_contacts(&self) -> Vec<FanOutOutcome> {
        self.fan_out(|contact| async move { self.liveness.issue_challenge(&contact).await })
            .await
    }

    /// Query every directory contact for its contact list
    pub async fn query_all_contact_lists(&self) -> Vec<FanOutOutcome> {
        self.fan_out(|contact| async move { self.exchange.query_contact_list(&contact).await })
            .await
    }

    /// Attempt a relay connection to every directory contact
    ///
    /// Unlike the single-contact relay hint, the per-contact dial results
    /// are reported in the outcomes.
    pub async fn relay_connect_all_directory_contacts(&self) -> Vec<FanOutOutcome> {
        self.fan_out(|contact| async move { self.resolver.relay_connect(&contact).await })
            .await
    }

    /// Apply an operation to every directory contact concurrently
    ///
    /// One entry per contact; a failing contact never blocks or fails the
    /// others.
    async fn fan_out<'a, F, Fut>(&'a self, op: F) -> Vec<FanOutOutcome>
    where
        F: Fn(Contact) -> Fut,
        Fut: Future<Output = ContactResult<()>> + 'a,
    {
        let targets = self.registry.directory_mapped();
        join_all(targets.into_iter().map(|contact| {
            let pubkey = contact.pubkey.clone();
            let fut = op(contact);
            async move { (pubkey, fut.await) }
        }))
        .await
    }
}
