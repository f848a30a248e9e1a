//! Peerbook Core Library
//!
//! Contact synchronization for a peer in a decentralized social network,
//! over an unreliable topic-based pub/sub transport.
//!
//! ## Overview
//!
//! Each peer keeps a three-tier view of the peers it knows:
//!
//! - **pool**: every peer ever resolved locally, regardless of trust
//! - **directory**: peers explicitly added as contacts
//! - **followers**: peers known to have added us as their contact
//!
//! On top of the registry, a small protocol keeps the view synchronized:
//! ping/pong liveness challenges correlated by single-use tokens, a mutual
//! added-as-contact acknowledgment handshake whose retries piggyback on
//! liveness evidence, and a contact-list exchange feeding transitive
//! discovery. The channel is lossy and unauthenticated, so every handler
//! tolerates unknown senders, stale and duplicate messages, and never
//! discloses the contact list to unconfirmed peers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use peerbook_core::{ContactSync, GossipPubsub, PrivacySettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pubsub = Arc::new(GossipPubsub::new().await?);
//!     let sync = ContactSync::new(my_pubkey, pubsub, profiles, relay,
//!         PrivacySettings::default());
//!     sync.start().await?;
//!
//!     // Add a contact: resolves the peer, then introduces us
//!     sync.discovery().add_to_directory(&peer_pubkey).await?;
//!
//!     // Probe everyone we added
//!     for (pubkey, outcome) in sync.discovery().ping_all_contacts().await {
//!         println!("{pubkey}: {outcome:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod registry;
pub mod sync;
pub mod types;

// Re-exports
pub use error::{ContactError, ContactResult};
pub use registry::ContactRegistry;
pub use sync::{
    contacts_topic, ContactEvent, ContactListExchange, ContactResolver, ContactSync,
    DiscoveryController, FanOutOutcome, GossipPubsub, HandshakeController, LivenessProbe,
    MessageTransport, ProfileResolver, ProtocolMessage, Pubsub, RelayDialer, Subscription,
    TopicId,
};
pub use types::*;
