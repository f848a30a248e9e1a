//! Contact sync session
//!
//! [`ContactSync`] composes the registry, transport and protocol
//! controllers into one session object owned by whatever embeds this core.
//! `start` binds the subscription to the own contacts topic and spawns the
//! dispatch loop; `shutdown` (or dropping the session) releases both. The
//! subscription handle lives inside the session, never in process-wide
//! state.
//!
//! Inbound messages are dispatched sequentially from one channel, so
//! handlers never race each other; handler failures degrade to a log entry
//! because inbound traffic is adversarial and must not take the session
//! down.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ContactResult;
use crate::registry::ContactRegistry;
use crate::sync::discovery::DiscoveryController;
use crate::sync::events::ContactEvent;
use crate::sync::exchange::ContactListExchange;
use crate::sync::handshake::HandshakeController;
use crate::sync::liveness::LivenessProbe;
use crate::sync::protocol::ProtocolMessage;
use crate::sync::resolver::{ContactResolver, ProfileResolver, RelayDialer};
use crate::sync::transport::{MessageTransport, Pubsub};
use crate::types::contact::short_identity;
use crate::types::{ContactVisibility, OwnProfile, PrivacySettings};

/// Depth of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A running contact synchronization session for one local profile
pub struct ContactSync {
    profile: OwnProfile,
    registry: ContactRegistry,
    transport: Arc<MessageTransport>,
    liveness: Arc<LivenessProbe>,
    handshake: Arc<HandshakeController>,
    exchange: Arc<ContactListExchange>,
    discovery: Arc<DiscoveryController>,
    settings: Arc<parking_lot::RwLock<PrivacySettings>>,
    events: broadcast::Sender<ContactEvent>,
    listener: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ContactSync {
    /// Wire up a session for the given local profile and collaborators
    pub fn new(
        own_pubkey: impl Into<String>,
        pubsub: Arc<dyn Pubsub>,
        profiles: Arc<dyn ProfileResolver>,
        relay: Arc<dyn RelayDialer>,
        settings: PrivacySettings,
    ) -> Self {
        let profile = OwnProfile::new(own_pubkey);
        let registry = ContactRegistry::new(profile.pubkey.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let transport = Arc::new(MessageTransport::new(pubsub));
        let resolver = Arc::new(ContactResolver::new(
            registry.clone(),
            profiles,
            relay,
            events.clone(),
        ));
        let handshake = Arc::new(HandshakeController::new(
            registry.clone(),
            Arc::clone(&transport),
            Arc::clone(&resolver),
            profile.pubkey.clone(),
            events.clone(),
        ));
        let liveness = Arc::new(LivenessProbe::new(
            registry.clone(),
            Arc::clone(&transport),
            Arc::clone(&resolver),
            Arc::clone(&handshake),
            profile.pubkey.clone(),
            events.clone(),
        ));
        let settings = Arc::new(parking_lot::RwLock::new(settings));
        let exchange = Arc::new(ContactListExchange::new(
            registry.clone(),
            Arc::clone(&transport),
            Arc::clone(&resolver),
            Arc::clone(&handshake),
            Arc::clone(&settings),
            profile.pubkey.clone(),
            events.clone(),
        ));
        let discovery = Arc::new(DiscoveryController::new(
            registry.clone(),
            Arc::clone(&resolver),
            Arc::clone(&liveness),
            Arc::clone(&handshake),
            Arc::clone(&exchange),
            events.clone(),
        ));

        Self {
            profile,
            registry,
            transport,
            liveness,
            handshake,
            exchange,
            discovery,
            settings,
            events,
            listener: parking_lot::Mutex::new(None),
        }
    }

    /// Subscribe to the own contacts topic and start dispatching
    ///
    /// Restarting an already-started session rebinds the subscription and
    /// replaces the dispatch loop.
    pub async fn start(&self) -> ContactResult<()> {
        let inbound = self.transport.subscribe(self.profile.contacts_topic).await?;

        let handle = tokio::spawn(Self::dispatch_loop(
            inbound,
            self.profile.pubkey.clone(),
            Arc::clone(&self.liveness),
            Arc::clone(&self.handshake),
            Arc::clone(&self.exchange),
        ));

        if let Some(prev) = self.listener.lock().replace(handle) {
            prev.abort();
        }

        info!(
            pubkey = %self.profile.pubkey,
            topic = %self.profile.contacts_topic,
            "Contact sync started"
        );
        Ok(())
    }

    /// Stop dispatching and release the subscription
    pub async fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
        self.transport.unsubscribe().await;
        info!(pubkey = %self.profile.pubkey, "Contact sync stopped");
    }

    /// The local profile this session serves
    pub fn profile(&self) -> &OwnProfile {
        &self.profile
    }

    /// The contact registry
    pub fn registry(&self) -> &ContactRegistry {
        &self.registry
    }

    /// Directory/pool membership operations and bulk fan-outs
    pub fn discovery(&self) -> &DiscoveryController {
        &self.discovery
    }

    /// Subscribe to contact events
    pub fn subscribe_events(&self) -> broadcast::Receiver<ContactEvent> {
        self.events.subscribe()
    }

    /// Change who may see our directory in contacts replies
    pub fn set_contact_visibility(&self, visibility: ContactVisibility) {
        self.settings.write().contact_visibility = visibility;
    }

    /// Sequentially dispatch inbound messages to their handlers
    async fn dispatch_loop(
        mut inbound: mpsc::Receiver<Vec<u8>>,
        own_pubkey: String,
        liveness: Arc<LivenessProbe>,
        handshake: Arc<HandshakeController>,
        exchange: Arc<ContactListExchange>,
    ) {
        while let Some(payload) = inbound.recv().await {
            let message = match ProtocolMessage::decode(&payload) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, len = payload.len(), "Dropping undecodable inbound message");
                    continue;
                }
            };

            // Gossip topics can echo our own publishes back
            if message.from() == own_pubkey {
                continue;
            }

            debug!(
                kind = message.kind(),
                from = %short_identity(message.from()),
                "Dispatching inbound message"
            );

            let kind = message.kind();
            let result = match &message {
                ProtocolMessage::Ping { from, token } => liveness.handle_ping(from, token).await,
                ProtocolMessage::Pong { from, token } => liveness.handle_pong(from, token).await,
                ProtocolMessage::QueryContacts { from } => {
                    exchange.handle_query_contacts(from).await
                }
                ProtocolMessage::ContactsReply { from, contacts } => {
                    exchange.handle_contacts_reply(from, contacts).await
                }
                ProtocolMessage::AddedContactQuery { from } => {
                    handshake.handle_added_contact_query(from).await
                }
                ProtocolMessage::AddedContactAck { from } => {
                    handshake.handle_added_contact_ack(from).await
                }
            };

            if let Err(e) = result {
                warn!(kind, error = %e, "Handler failed for inbound message");
            }
        }

        debug!("Inbound message stream closed");
    }
}

impl Drop for ContactSync {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}
