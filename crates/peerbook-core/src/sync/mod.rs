//! Contact synchronization over topic-based pub/sub
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ContactSync (session)                                          │
//! │  ├── MessageTransport (single subscription + typed sends)       │
//! │  │   └── Pubsub (iroh-gossip in production, hub in tests)       │
//! │  ├── dispatch loop: inbound message → handler by case           │
//! │  │                                                              │
//! │  ├── LivenessProbe        Ping/Pong token challenges            │
//! │  ├── HandshakeController  AddedContactQuery/Ack + retry-on-alive│
//! │  ├── ContactListExchange  QueryContacts/ContactsReply           │
//! │  ├── DiscoveryController  add/remove/fan-out orchestration      │
//! │  └── ContactResolver      deduplicated pool fills, relay hints  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers authenticate senders by registry membership only: pings need a
//! pool entry, pongs/replies/acks a directory entry. Everything else is
//! dropped with a diagnostic, never an error.

pub mod discovery;
pub mod events;
pub mod exchange;
pub mod gossip;
pub mod handshake;
pub mod liveness;
pub mod protocol;
pub mod resolver;
pub mod service;
pub mod transport;

pub use discovery::{DiscoveryController, FanOutOutcome};
pub use events::ContactEvent;
pub use exchange::ContactListExchange;
pub use gossip::GossipPubsub;
pub use handshake::HandshakeController;
pub use liveness::LivenessProbe;
pub use protocol::{contacts_topic, is_well_formed_pubkey, ProtocolMessage, TopicId};
pub use resolver::{ContactResolver, ProfileResolver, RelayDialer};
pub use service::ContactSync;
pub use transport::{MessageTransport, Pubsub, Subscription};
