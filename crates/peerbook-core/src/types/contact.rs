//! Contact types
//!
//! A [`Contact`] is a remote peer as known locally: its opaque pubkey, the
//! gossip topic derived from it, the state of the liveness and
//! added-as-contact protocols, and the contact list it last disclosed to us.

use serde::{Deserialize, Serialize};

use crate::sync::protocol::{contacts_topic, TopicId};

/// Number of leading pubkey characters used for display labels
const IDENTITY_LABEL_LEN: usize = 8;

/// A remote peer as known locally
///
/// Created by resolving a pubkey through the profile-resolution collaborator
/// and stored in the registry pool; promoted into the directory by an
/// explicit add. `ping_token` is mutated only by the liveness probe and
/// `added_ack` only by the handshake controller, both through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Opaque public-key identity of the peer (immutable)
    pub pubkey: String,
    /// Short display/debug label derived from the pubkey
    pub identity: String,
    /// Last liveness token issued to this contact; only the most recent is valid
    pub ping_token: Option<String>,
    /// True once the contact acknowledged registering us as a contact (monotonic)
    pub added_ack: bool,
    /// Transport topic derived from the pubkey, used to address this peer
    pub contacts_topic: TopicId,
    /// Directory pubkeys this contact disclosed in its last ContactsReply
    #[serde(default)]
    pub known_contacts: Vec<String>,
    /// When we last confirmed this contact alive (Unix timestamp, 0 = never)
    #[serde(default)]
    pub last_seen: u64,
    /// Current liveness status
    #[serde(default)]
    pub status: LivenessStatus,
}

impl Contact {
    /// Create a new contact record for a pubkey
    pub fn new(pubkey: impl Into<String>) -> Self {
        let pubkey = pubkey.into();
        Self {
            identity: short_identity(&pubkey),
            contacts_topic: contacts_topic(&pubkey),
            pubkey,
            ping_token: None,
            added_ack: false,
            known_contacts: Vec::new(),
            last_seen: 0,
            status: LivenessStatus::Unknown,
        }
    }

    /// Record a positive liveness confirmation
    pub fn mark_alive(&mut self) {
        self.last_seen = chrono::Utc::now().timestamp() as u64;
        self.status = LivenessStatus::Online;
    }
}

/// Derive the short display label for a pubkey (first 8 chars)
pub fn short_identity(pubkey: &str) -> String {
    pubkey.chars().take(IDENTITY_LABEL_LEN).collect()
}

/// Liveness status of a contact
///
/// Liveness is positively confirmed by a verified pong or protocol exchange;
/// absence of a reply never demotes a contact, so there is no offline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LivenessStatus {
    /// No liveness evidence yet
    Unknown,
    /// Confirmed reachable at `last_seen`
    Online,
}

impl Default for LivenessStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Online => write!(f, "Online"),
        }
    }
}

/// The local profile from this core's perspective
#[derive(Debug, Clone, PartialEq)]
pub struct OwnProfile {
    /// Our own pubkey
    pub pubkey: String,
    /// The topic we subscribe to for inbound contact messages
    pub contacts_topic: TopicId,
}

impl OwnProfile {
    /// Build the own profile for a pubkey
    pub fn new(pubkey: impl Into<String>) -> Self {
        let pubkey = pubkey.into();
        Self {
            contacts_topic: contacts_topic(&pubkey),
            pubkey,
        }
    }
}

/// Who may see our directory when answering a contacts query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactVisibility {
    /// Disclose the directory to any confirmed contact
    Everyone,
    /// Disclose the directory to confirmed contacts only
    ContactsOnly,
    /// Never disclose the directory
    Nobody,
}

/// Privacy settings consulted when answering a contacts query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    /// Disclosure policy for our directory
    pub contact_visibility: ContactVisibility,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            contact_visibility: ContactVisibility::ContactsOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contact_derives_identity_and_topic() {
        let contact = Contact::new("z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK");
        assert_eq!(contact.identity, "z6MkhaXg");
        assert_eq!(contact.contacts_topic, contacts_topic(&contact.pubkey));
        assert_eq!(contact.ping_token, None);
        assert!(!contact.added_ack);
        assert_eq!(contact.status, LivenessStatus::Unknown);
    }

    #[test]
    fn test_short_identity_of_short_pubkey() {
        assert_eq!(short_identity("abc"), "abc");
    }

    #[test]
    fn test_mark_alive_sets_status_and_timestamp() {
        let mut contact = Contact::new("peerkey1234567890");
        assert_eq!(contact.last_seen, 0);

        contact.mark_alive();
        assert_eq!(contact.status, LivenessStatus::Online);
        assert!(contact.last_seen > 0);
    }

    #[test]
    fn test_liveness_status_display() {
        assert_eq!(LivenessStatus::Unknown.to_string(), "Unknown");
        assert_eq!(LivenessStatus::Online.to_string(), "Online");
    }

    #[test]
    fn test_default_privacy_is_contacts_only() {
        let settings = PrivacySettings::default();
        assert_eq!(settings.contact_visibility, ContactVisibility::ContactsOnly);
    }
}
