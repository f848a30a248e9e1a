//! Typed message transport over a pub/sub primitive
//!
//! Wraps the external topic-based pub/sub collaborator behind the [`Pubsub`]
//! trait and owns the single active subscription of the local profile.
//! Rebinding tears the previous handle down first, so at most one
//! subscription is ever live; after [`MessageTransport::unsubscribe`],
//! sends fail until the next subscribe.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{ContactError, ContactResult};
use crate::sync::protocol::{ProtocolMessage, TopicId};

/// Topic-based publish/subscribe primitive
///
/// Implemented by the iroh-gossip adapter in production and by an in-memory
/// hub in tests. Delivery is unreliable and unordered; implementations must
/// not be assumed to deliver, deduplicate, or order messages.
#[async_trait]
pub trait Pubsub: Send + Sync {
    /// Publish a payload onto a topic
    async fn publish(&self, topic: TopicId, payload: Vec<u8>) -> ContactResult<()>;

    /// Subscribe to a topic, returning its inbound message stream
    async fn subscribe(&self, topic: TopicId) -> ContactResult<Subscription>;
}

/// An active topic subscription
///
/// `guard` holds the transport-specific handle; dropping it releases the
/// subscription.
pub struct Subscription {
    /// The subscribed topic
    pub topic: TopicId,
    /// Inbound raw payloads from the topic
    pub messages: mpsc::Receiver<Vec<u8>>,
    /// Transport handle released on drop
    pub guard: Option<Box<dyn Any + Send>>,
}

struct ActiveSubscription {
    topic: TopicId,
    _guard: Option<Box<dyn Any + Send>>,
}

/// Typed send/subscribe adapter owning the single active subscription
pub struct MessageTransport {
    pubsub: Arc<dyn Pubsub>,
    active: Mutex<Option<ActiveSubscription>>,
}

impl MessageTransport {
    /// Wrap a pub/sub primitive
    pub fn new(pubsub: Arc<dyn Pubsub>) -> Self {
        Self {
            pubsub,
            active: Mutex::new(None),
        }
    }

    /// Subscribe to a topic, releasing any previously active subscription
    ///
    /// The returned receiver yields raw inbound payloads; the subscription
    /// handle itself stays owned here until [`unsubscribe`](Self::unsubscribe)
    /// or the next subscribe.
    pub async fn subscribe(&self, topic: TopicId) -> ContactResult<mpsc::Receiver<Vec<u8>>> {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            debug!(topic = %prev.topic, "Releasing previous subscription before rebind");
        }

        let subscription = self.pubsub.subscribe(topic).await?;
        *active = Some(ActiveSubscription {
            topic,
            _guard: subscription.guard,
        });

        debug!(topic = %topic, "Subscribed to contacts topic");
        Ok(subscription.messages)
    }

    /// Release the active subscription
    ///
    /// Sends fail with [`ContactError::NotSubscribed`] until the next
    /// subscribe.
    pub async fn unsubscribe(&self) {
        if let Some(prev) = self.active.lock().await.take() {
            debug!(topic = %prev.topic, "Unsubscribed from contacts topic");
        }
    }

    /// Whether a subscription is currently active
    pub async fn is_subscribed(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Encode and publish a protocol message onto a topic
    pub async fn send(&self, topic: TopicId, message: &ProtocolMessage) -> ContactResult<()> {
        if self.active.lock().await.is_none() {
            return Err(ContactError::NotSubscribed);
        }

        let payload = message
            .encode()
            .map_err(|e| ContactError::Serialization(e.to_string()))?;

        debug!(topic = %topic, kind = message.kind(), len = payload.len(), "Sending contact message");
        self.pubsub.publish(topic, payload).await
    }
}
