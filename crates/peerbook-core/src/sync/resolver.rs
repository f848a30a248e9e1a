//! Profile resolution into the contact pool
//!
//! Owns the two collaborator seams this core consumes (profile resolution
//! by pubkey and best-effort relay dialing) plus the shared resolution
//! service used by every call path that fills the pool.
//!
//! Concurrent resolutions of the same pubkey share one in-flight attempt
//! through a keyed `OnceCell` map instead of issuing duplicates; the entry
//! is dropped once the attempt settles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, warn};

use crate::error::ContactResult;
use crate::registry::ContactRegistry;
use crate::sync::events::ContactEvent;
use crate::types::contact::short_identity;
use crate::types::Contact;

/// Resolves a peer's public profile into a contact record
///
/// Fails with [`ContactError::Resolution`](crate::error::ContactError::Resolution)
/// when the peer cannot be reached or verified.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Resolve a pubkey into a contact
    async fn resolve(&self, pubkey: &str) -> ContactResult<Contact>;
}

/// Best-effort NAT-traversal relay dialer
///
/// A connectivity hint only: callers either swallow failures with a log or
/// report them as per-contact outcomes, never abort on them.
#[async_trait]
pub trait RelayDialer: Send + Sync {
    /// Attempt a relay connection to a contact
    async fn relay_connect(&self, contact: &Contact) -> ContactResult<()>;
}

/// Shared resolution service filling the contact pool
pub struct ContactResolver {
    registry: ContactRegistry,
    profiles: Arc<dyn ProfileResolver>,
    relay: Arc<dyn RelayDialer>,
    events: broadcast::Sender<ContactEvent>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Contact>>>>,
}

impl ContactResolver {
    /// Create the resolution service
    pub fn new(
        registry: ContactRegistry,
        profiles: Arc<dyn ProfileResolver>,
        relay: Arc<dyn RelayDialer>,
        events: broadcast::Sender<ContactEvent>,
    ) -> Self {
        Self {
            registry,
            profiles,
            relay,
            events,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a pubkey into a contact, sharing concurrent attempts
    ///
    /// Does not touch the registry. While a resolution for this pubkey is
    /// already in flight, callers await its outcome instead of issuing a
    /// duplicate lookup.
    pub async fn resolve_contact(&self, pubkey: &str) -> ContactResult<Contact> {
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(pubkey.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = cell
            .get_or_try_init(|| async { self.profiles.resolve(pubkey).await })
            .await
            .map(|contact| contact.clone());

        // Entry dropped once settled; the pool check in callers keeps a
        // later miss from re-resolving a known peer.
        self.in_flight.lock().await.remove(pubkey);
        result
    }

    /// Resolve a pubkey into the pool if it is not there yet
    ///
    /// No-op for the own pubkey and for pool hits. On a fresh insert of a
    /// peer already known as a follower or directory member, fires the
    /// relay-connect hint.
    pub async fn ensure_pooled(&self, pubkey: &str) -> ContactResult<()> {
        if pubkey == self.registry.own_pubkey() || self.registry.has_in_pool(pubkey) {
            return Ok(());
        }

        let contact = self.resolve_contact(pubkey).await?;
        self.registry.insert_pool(contact.clone())?;
        debug!(peer = %contact.identity, "Resolved peer into pool");
        let _ = self.events.send(ContactEvent::ContactResolved {
            pubkey: pubkey.to_string(),
        });

        if self.registry.is_follower(pubkey) || self.registry.has_in_directory(pubkey) {
            self.relay_hint(&contact).await;
        }

        Ok(())
    }

    /// Fire-and-forget background pool fill
    ///
    /// Used by inbound handlers for unresolved senders; failure is logged,
    /// never propagated. The sender will retry on its own schedule.
    pub fn spawn_ensure_pooled(self: &Arc<Self>, pubkey: &str) {
        let resolver = Arc::clone(self);
        let pubkey = pubkey.to_string();
        tokio::spawn(async move {
            if let Err(e) = resolver.ensure_pooled(&pubkey).await {
                warn!(peer = %short_identity(&pubkey), error = %e, "Background pool fill failed");
            }
        });
    }

    /// Best-effort relay-connect hint: failure is logged and swallowed
    pub async fn relay_hint(&self, contact: &Contact) {
        if let Err(e) = self.relay.relay_connect(contact).await {
            debug!(peer = %contact.identity, error = %e, "Relay connect hint failed");
        }
    }

    /// Relay-connect with the outcome reported to the caller
    ///
    /// Used by bulk operations that capture per-contact results.
    pub async fn relay_connect(&self, contact: &Contact) -> ContactResult<()> {
        self.relay.relay_connect(contact).await
    }
}
