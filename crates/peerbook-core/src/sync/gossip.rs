//! Gossip-backed pub/sub transport using iroh-gossip
//!
//! Production implementation of the [`Pubsub`] primitive. Each contacts
//! topic maps to an iroh-gossip topic; subscribing spawns a forward task
//! pumping received gossip events into the subscription channel, and
//! publishing joins the target topic on first use so later sends reuse the
//! joined handle.

use std::collections::HashMap;

use async_trait::async_trait;
use iroh::discovery::static_provider::StaticProvider;
use iroh::protocol::Router;
use iroh::{Endpoint, EndpointAddr, SecretKey};
use iroh_gossip::net::{Gossip, GOSSIP_ALPN};
use iroh_gossip::proto::TopicId as GossipTopicId;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ContactError, ContactResult};
use crate::sync::protocol::TopicId;
use crate::sync::transport::{Pubsub, Subscription};

/// Contact messages are small; cap gossip payloads well below the realm
/// sizes other protocols need.
const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Inbound channel depth per subscription
const INBOUND_BUFFER: usize = 256;

struct PublishHandle {
    sender: iroh_gossip::api::GossipSender,
    // Unpolled receiver half is drained by a task that exits when the
    // topic closes
    _drain: JoinHandle<()>,
}

/// iroh-gossip implementation of the pub/sub primitive
pub struct GossipPubsub {
    endpoint: Endpoint,
    gossip: Gossip,
    _router: Router,
    static_provider: StaticProvider,
    publish_topics: Mutex<HashMap<TopicId, PublishHandle>>,
}

impl GossipPubsub {
    /// Create a gossip node with a fresh secret key
    pub async fn new() -> ContactResult<Self> {
        Self::with_secret_key(None).await
    }

    /// Create a gossip node, optionally with a persistent secret key
    pub async fn with_secret_key(secret_key: Option<SecretKey>) -> ContactResult<Self> {
        let secret_key = secret_key.unwrap_or_else(|| SecretKey::generate(&mut rand::rng()));

        let static_provider = StaticProvider::new();

        let endpoint = Endpoint::builder()
            .secret_key(secret_key)
            .alpns(vec![GOSSIP_ALPN.to_vec()])
            .discovery(static_provider.clone())
            .bind()
            .await
            .map_err(|e| ContactError::Network(format!("Failed to bind endpoint: {}", e)))?;

        let endpoint_id = endpoint.id();
        info!(%endpoint_id, "Endpoint bound");

        let gossip = Gossip::builder()
            .max_message_size(MAX_MESSAGE_SIZE)
            .spawn(endpoint.clone());

        let router = Router::builder(endpoint.clone())
            .accept(GOSSIP_ALPN, gossip.clone())
            .spawn();

        Ok(Self {
            endpoint,
            gossip,
            _router: router,
            static_provider,
            publish_topics: Mutex::new(HashMap::new()),
        })
    }

    /// This node's endpoint ID
    pub fn endpoint_id(&self) -> iroh::EndpointId {
        self.endpoint.id()
    }

    /// This node's current addressing information
    pub fn endpoint_addr(&self) -> EndpointAddr {
        self.endpoint.addr()
    }

    /// Add a peer's address to the static discovery provider
    ///
    /// Out-of-band addresses let gossip connect without DNS discovery.
    pub fn add_peer_addr(&self, endpoint_addr: EndpointAddr) {
        info!(
            peer = %endpoint_addr.id,
            addrs = endpoint_addr.addrs.len(),
            "Adding peer address to static discovery"
        );
        self.static_provider.add_endpoint_info(endpoint_addr);
    }

    async fn join_for_publish(&self, topic: TopicId) -> ContactResult<()> {
        let mut topics = self.publish_topics.lock().await;
        if topics.contains_key(&topic) {
            return Ok(());
        }

        let gossip_topic = self
            .gossip
            .subscribe(GossipTopicId::from_bytes(*topic.as_bytes()), vec![])
            .await
            .map_err(|e| ContactError::Transport(format!("Failed to join topic: {}", e)))?;
        let (sender, mut receiver) = gossip_topic.split();

        let drain = tokio::spawn(async move {
            use n0_future::StreamExt;
            while let Ok(Some(_)) = receiver.try_next().await {}
        });

        debug!(topic = %topic, "Joined gossip topic for publishing");
        topics.insert(
            topic,
            PublishHandle {
                sender,
                _drain: drain,
            },
        );
        Ok(())
    }
}

/// Subscription guard: dropping it stops the forward task and releases the
/// gossip topic
struct GossipSubscriptionGuard {
    _sender: iroh_gossip::api::GossipSender,
    forward: JoinHandle<()>,
}

impl Drop for GossipSubscriptionGuard {
    fn drop(&mut self) {
        self.forward.abort();
    }
}

#[async_trait]
impl Pubsub for GossipPubsub {
    async fn publish(&self, topic: TopicId, payload: Vec<u8>) -> ContactResult<()> {
        self.join_for_publish(topic).await?;

        let mut topics = self.publish_topics.lock().await;
        let handle = topics
            .get_mut(&topic)
            .ok_or_else(|| ContactError::Transport("Publish topic vanished".to_string()))?;

        handle
            .sender
            .broadcast(payload.into())
            .await
            .map_err(|e| ContactError::Transport(format!("Failed to broadcast: {}", e)))
    }

    async fn subscribe(&self, topic: TopicId) -> ContactResult<Subscription> {
        let gossip_topic = self
            .gossip
            .subscribe(GossipTopicId::from_bytes(*topic.as_bytes()), vec![])
            .await
            .map_err(|e| ContactError::Transport(format!("Failed to subscribe: {}", e)))?;
        let (sender, mut receiver) = gossip_topic.split();

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let forward = tokio::spawn(async move {
            use iroh_gossip::api::Event;
            use n0_future::StreamExt;

            loop {
                match receiver.try_next().await {
                    Ok(Some(Event::Received(msg))) => {
                        debug!(from = ?msg.delivered_from, len = msg.content.len(), "Received gossip message");
                        if tx.send(msg.content.to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Event::NeighborUp(peer))) => {
                        debug!(?peer, "Neighbor joined contacts topic");
                    }
                    Ok(Some(Event::NeighborDown(peer))) => {
                        debug!(?peer, "Neighbor left contacts topic");
                    }
                    Ok(Some(Event::Lagged)) => {
                        warn!("Lagged behind on contacts topic");
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = ?e, "Error receiving from contacts topic");
                        break;
                    }
                }
            }
        });

        debug!(topic = %topic, "Subscribed to gossip topic");
        Ok(Subscription {
            topic,
            messages: rx,
            guard: Some(Box::new(GossipSubscriptionGuard {
                _sender: sender,
                forward,
            })),
        })
    }
}
