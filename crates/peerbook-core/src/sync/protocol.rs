//! Contact protocol wire messages and topic derivation
//!
//! This module defines the entire wire contract of the contact sync core:
//! six message cases exchanged over per-peer gossip topics. Each peer derives
//! a receive topic from its own pubkey and subscribes to it; to message peer
//! P, a sender publishes onto P's derived topic.
//!
//! ## Message Flow
//!
//! ```text
//! Alice                           Bob
//!   |                              |
//!   |--- Ping{token} ------------->|   liveness challenge
//!   |<-- Pong{token} --------------|   echoed unchanged
//!   |                              |
//!   |--- AddedContactQuery ------->|   "I added you as a contact"
//!   |<-- AddedContactAck ----------|   "noted, you are my follower"
//!   |                              |
//!   |--- QueryContacts ----------->|   directory list exchange
//!   |<-- ContactsReply{contacts} --|   transitive discovery input
//! ```
//!
//! Every case carries `from` as provenance; handlers authenticate by
//! registry membership, never cryptographically (trust derives from
//! transport authenticity, outside this core).

use serde::{Deserialize, Serialize};

/// Domain separator for contacts-topic derivation
const CONTACTS_TOPIC_DOMAIN: &[u8] = b"peerbook-contacts-topic";

/// Upper bound accepted for an inbound pubkey, in bytes
const MAX_PUBKEY_LEN: usize = 128;

/// A 32-byte transport topic identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicId(pub [u8; 32]);

impl TopicId {
    /// Raw topic bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TopicId({})", self)
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short hex form for logs
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Derive a peer's contacts topic from its pubkey (deterministic)
///
/// ```text
/// topic = BLAKE3("peerbook-contacts-topic" || pubkey)
/// ```
///
/// A pure function of the pubkey: every peer derives the same topic for P
/// without coordination, so the topic serves both as P's subscription and
/// as the address for messages to P.
pub fn contacts_topic(pubkey: &str) -> TopicId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONTACTS_TOPIC_DOMAIN);
    hasher.update(pubkey.as_bytes());
    TopicId(*hasher.finalize().as_bytes())
}

/// Contact protocol messages
///
/// The closed set of messages this core sends and receives. `from` is the
/// sender's pubkey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProtocolMessage {
    /// Ask a directory contact for its disclosed contact list
    QueryContacts { from: String },
    /// Answer to QueryContacts carrying the disclosed directory pubkeys
    ContactsReply { from: String, contacts: Vec<String> },
    /// Liveness challenge carrying a fresh token
    Ping { from: String, token: String },
    /// Liveness response echoing the challenge token unchanged
    Pong { from: String, token: String },
    /// "I have added you as a contact"
    AddedContactQuery { from: String },
    /// Acknowledgment that the sender registered us as a contact
    AddedContactAck { from: String },
}

impl ProtocolMessage {
    /// The sender pubkey carried by this message
    pub fn from(&self) -> &str {
        match self {
            Self::QueryContacts { from }
            | Self::ContactsReply { from, .. }
            | Self::Ping { from, .. }
            | Self::Pong { from, .. }
            | Self::AddedContactQuery { from }
            | Self::AddedContactAck { from } => from,
        }
    }

    /// Short case name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueryContacts { .. } => "QueryContacts",
            Self::ContactsReply { .. } => "ContactsReply",
            Self::Ping { .. } => "Ping",
            Self::Pong { .. } => "Pong",
            Self::AddedContactQuery { .. } => "AddedContactQuery",
            Self::AddedContactAck { .. } => "AddedContactAck",
        }
    }

    /// Encode message to bytes using postcard
    pub fn encode(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Decode message from bytes using postcard
    pub fn decode(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}

/// Minimal well-formedness check for an inbound pubkey
///
/// A syntax floor only: non-empty, at most 128 bytes, ASCII alphanumeric.
/// Entries failing this are dropped before being treated as resolvable
/// pubkeys; no semantic validation is attempted.
pub fn is_well_formed_pubkey(pubkey: &str) -> bool {
    !pubkey.is_empty()
        && pubkey.len() <= MAX_PUBKEY_LEN
        && pubkey.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contacts_topic_deterministic() {
        let topic_a = contacts_topic("z6MkAlice");
        let topic_b = contacts_topic("z6MkAlice");
        assert_eq!(topic_a, topic_b);
    }

    #[test]
    fn test_contacts_topic_distinct_per_pubkey() {
        assert_ne!(contacts_topic("z6MkAlice"), contacts_topic("z6MkBob"));
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = ProtocolMessage::ContactsReply {
            from: "z6MkAlice".to_string(),
            contacts: vec!["z6MkBob".to_string(), "z6MkCarol".to_string()],
        };

        let encoded = msg.encode().expect("Failed to encode");
        let decoded = ProtocolMessage::decode(&encoded).expect("Failed to decode");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_ping_roundtrip_preserves_token() {
        let msg = ProtocolMessage::Ping {
            from: "z6MkAlice".to_string(),
            token: "deadbeefcafe".to_string(),
        };

        let decoded = ProtocolMessage::decode(&msg.encode().unwrap()).unwrap();
        match decoded {
            ProtocolMessage::Ping { token, .. } => assert_eq!(token, "deadbeefcafe"),
            other => panic!("Decoded wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_from_accessor_covers_all_variants() {
        let variants = [
            ProtocolMessage::QueryContacts { from: "k1".into() },
            ProtocolMessage::ContactsReply { from: "k1".into(), contacts: vec![] },
            ProtocolMessage::Ping { from: "k1".into(), token: "t".into() },
            ProtocolMessage::Pong { from: "k1".into(), token: "t".into() },
            ProtocolMessage::AddedContactQuery { from: "k1".into() },
            ProtocolMessage::AddedContactAck { from: "k1".into() },
        ];

        for msg in &variants {
            assert_eq!(msg.from(), "k1");
        }
    }

    #[test]
    fn test_variants_encode_distinctly() {
        let query = ProtocolMessage::QueryContacts { from: "k1".into() };
        let ack = ProtocolMessage::AddedContactAck { from: "k1".into() };
        assert_ne!(query.encode().unwrap(), ack.encode().unwrap());
    }

    #[test]
    fn test_well_formed_pubkey() {
        assert!(is_well_formed_pubkey("z6MkhaXgBZDvotDkL5257faizti"));
        assert!(is_well_formed_pubkey("a"));

        assert!(!is_well_formed_pubkey(""));
        assert!(!is_well_formed_pubkey("has space"));
        assert!(!is_well_formed_pubkey("new\nline"));
        assert!(!is_well_formed_pubkey("dash-ed"));
        assert!(!is_well_formed_pubkey(&"x".repeat(129)));
        assert!(is_well_formed_pubkey(&"x".repeat(128)));
    }

    #[test]
    fn test_topic_display_is_short_hex() {
        let topic = contacts_topic("z6MkAlice");
        let shown = topic.to_string();
        assert_eq!(shown.len(), 16);
        assert!(shown.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
