//! Contact registry: pool, directory and follower collections
//!
//! The registry is the single owner of contact state. Three non-exclusive
//! collections, all keyed by pubkey:
//!
//! - `pool`: every peer this process has resolved, regardless of trust
//! - `directory`: peers explicitly added as contacts
//! - `followers`: peers known to have added us as their contact
//!
//! All mutation goes through registry methods; no other component touches
//! the collections directly. Reads and writes are synchronous behind one
//! lock and are never held across an await point.
//!
//! The own pubkey may never enter any collection.
//!
//! Pool eviction is an open extension point: entries leave the pool only by
//! explicit removal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ContactError, ContactResult};
use crate::types::{Contact, ContactVisibility, PrivacySettings};

#[derive(Default)]
struct RegistryInner {
    pool: HashMap<String, Contact>,
    directory: HashMap<String, Contact>,
    followers: HashSet<String>,
}

/// Registry of contacts known to the local peer
///
/// Cheap to clone; clones share the same underlying collections.
#[derive(Clone)]
pub struct ContactRegistry {
    own_pubkey: Arc<String>,
    inner: Arc<RwLock<RegistryInner>>,
}

impl ContactRegistry {
    /// Create an empty registry for the given local pubkey
    pub fn new(own_pubkey: impl Into<String>) -> Self {
        Self {
            own_pubkey: Arc::new(own_pubkey.into()),
            inner: Arc::new(RwLock::new(RegistryInner::default())),
        }
    }

    /// The local profile's pubkey
    pub fn own_pubkey(&self) -> &str {
        &self.own_pubkey
    }

    fn guard_own(&self, pubkey: &str) -> ContactResult<()> {
        if pubkey == self.own_pubkey.as_str() {
            return Err(ContactError::SelfReference(pubkey.to_string()));
        }
        Ok(())
    }

    /// Store a contact into the pool
    pub fn insert_pool(&self, contact: Contact) -> ContactResult<()> {
        self.guard_own(&contact.pubkey)?;
        self.inner.write().pool.insert(contact.pubkey.clone(), contact);
        Ok(())
    }

    /// Store a contact into the directory
    pub fn insert_directory(&self, contact: Contact) -> ContactResult<()> {
        self.guard_own(&contact.pubkey)?;
        self.inner
            .write()
            .directory
            .insert(contact.pubkey.clone(), contact);
        Ok(())
    }

    /// Record a peer as a follower
    ///
    /// Returns true if the pubkey was newly recorded. The own pubkey is
    /// refused.
    pub fn insert_follower(&self, pubkey: impl Into<String>) -> bool {
        let pubkey = pubkey.into();
        if pubkey == *self.own_pubkey {
            return false;
        }
        self.inner.write().followers.insert(pubkey)
    }

    /// Remove a contact from the pool
    pub fn remove_from_pool(&self, pubkey: &str) -> Option<Contact> {
        self.inner.write().pool.remove(pubkey)
    }

    /// Remove a contact from the directory
    pub fn remove_from_directory(&self, pubkey: &str) -> Option<Contact> {
        self.inner.write().directory.remove(pubkey)
    }

    /// Remove a follower record
    pub fn remove_follower(&self, pubkey: &str) -> bool {
        self.inner.write().followers.remove(pubkey)
    }

    /// Look up a contact in the pool
    pub fn find_in_pool(&self, pubkey: &str) -> Option<Contact> {
        self.inner.read().pool.get(pubkey).cloned()
    }

    /// Look up a contact in the directory
    pub fn find_in_directory(&self, pubkey: &str) -> Option<Contact> {
        self.inner.read().directory.get(pubkey).cloned()
    }

    /// Whether the pool contains a pubkey
    pub fn has_in_pool(&self, pubkey: &str) -> bool {
        self.inner.read().pool.contains_key(pubkey)
    }

    /// Whether the directory contains a pubkey
    pub fn has_in_directory(&self, pubkey: &str) -> bool {
        self.inner.read().directory.contains_key(pubkey)
    }

    /// Whether a pubkey is a known follower
    pub fn is_follower(&self, pubkey: &str) -> bool {
        self.inner.read().followers.contains(pubkey)
    }

    /// Snapshot of all directory contacts, used for fan-out operations
    pub fn directory_mapped(&self) -> Vec<Contact> {
        self.inner.read().directory.values().cloned().collect()
    }

    /// Number of contacts in the pool
    pub fn pool_len(&self) -> usize {
        self.inner.read().pool.len()
    }

    /// Number of contacts in the directory
    pub fn directory_len(&self) -> usize {
        self.inner.read().directory.len()
    }

    /// Referenced pubkeys absent from the pool
    ///
    /// Given collaborator collections that reference pubkeys (chat-room
    /// membership, share lists, inbound contact lists), returns the
    /// deduplicated set of referenced pubkeys not yet resolved into the
    /// pool. The own pubkey is never reported missing.
    pub fn missing_in_pool<I, S>(&self, refs: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inner = self.inner.read();
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for r in refs {
            let pubkey = r.as_ref();
            if pubkey == self.own_pubkey.as_str() || inner.pool.contains_key(pubkey) {
                continue;
            }
            if seen.insert(pubkey.to_string()) {
                missing.push(pubkey.to_string());
            }
        }
        missing
    }

    /// The directory pubkeys permitted to be disclosed under the settings
    ///
    /// Used only when answering a contacts query from a confirmed directory
    /// contact; never returns more than the directory.
    pub fn public_contacts(&self, settings: &PrivacySettings) -> Vec<String> {
        match settings.contact_visibility {
            ContactVisibility::Nobody => Vec::new(),
            ContactVisibility::Everyone | ContactVisibility::ContactsOnly => {
                self.inner.read().directory.keys().cloned().collect()
            }
        }
    }

    /// Apply a mutation to a contact wherever it is stored
    ///
    /// Pool and directory hold independent entries for the same pubkey;
    /// applying to both keeps the views coherent. Returns true if any entry
    /// was updated.
    fn with_contact_mut(&self, pubkey: &str, f: impl Fn(&mut Contact)) -> bool {
        let mut inner = self.inner.write();
        let mut updated = false;
        if let Some(contact) = inner.pool.get_mut(pubkey) {
            f(contact);
            updated = true;
        }
        if let Some(contact) = inner.directory.get_mut(pubkey) {
            f(contact);
            updated = true;
        }
        updated
    }

    /// Store the last issued liveness token for a contact
    pub fn set_ping_token(&self, pubkey: &str, token: &str) -> bool {
        self.with_contact_mut(pubkey, |c| c.ping_token = Some(token.to_string()))
    }

    /// Mark a contact as having acknowledged the added-as-contact handshake
    ///
    /// Monotonic: once true the flag never flips back.
    pub fn set_added_ack(&self, pubkey: &str) -> bool {
        self.with_contact_mut(pubkey, |c| c.added_ack = true)
    }

    /// Record a positive liveness confirmation for a contact
    pub fn mark_alive(&self, pubkey: &str) -> bool {
        self.with_contact_mut(pubkey, |c| c.mark_alive())
    }

    /// Persist the contact list a peer disclosed to us
    pub fn set_known_contacts(&self, pubkey: &str, contacts: &[String]) -> bool {
        self.with_contact_mut(pubkey, |c| c.known_contacts = contacts.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LivenessStatus;

    const OWN: &str = "z6MkOwnKey";

    fn registry() -> ContactRegistry {
        ContactRegistry::new(OWN)
    }

    #[test]
    fn test_own_pubkey_never_enters_any_collection() {
        let reg = registry();

        assert!(matches!(
            reg.insert_pool(Contact::new(OWN)),
            Err(ContactError::SelfReference(_))
        ));
        assert!(matches!(
            reg.insert_directory(Contact::new(OWN)),
            Err(ContactError::SelfReference(_))
        ));
        assert!(!reg.insert_follower(OWN));

        assert_eq!(reg.pool_len(), 0);
        assert_eq!(reg.directory_len(), 0);
        assert!(!reg.is_follower(OWN));
    }

    #[test]
    fn test_insert_and_find() {
        let reg = registry();
        reg.insert_pool(Contact::new("peerA")).unwrap();

        assert!(reg.has_in_pool("peerA"));
        assert!(!reg.has_in_directory("peerA"));
        assert_eq!(reg.find_in_pool("peerA").unwrap().pubkey, "peerA");
        assert!(reg.find_in_directory("peerA").is_none());
    }

    #[test]
    fn test_remove_is_explicit_and_returns_contact() {
        let reg = registry();
        reg.insert_pool(Contact::new("peerA")).unwrap();
        reg.insert_directory(Contact::new("peerA")).unwrap();

        let removed = reg.remove_from_directory("peerA").unwrap();
        assert_eq!(removed.pubkey, "peerA");
        // Directory removal leaves the pool untouched
        assert!(reg.has_in_pool("peerA"));
        assert!(reg.remove_from_pool("peerA").is_some());
        assert!(reg.remove_from_pool("peerA").is_none());
    }

    #[test]
    fn test_field_mutations_apply_to_both_copies() {
        let reg = registry();
        reg.insert_pool(Contact::new("peerA")).unwrap();
        reg.insert_directory(Contact::new("peerA")).unwrap();

        assert!(reg.set_ping_token("peerA", "tok1"));
        assert_eq!(
            reg.find_in_pool("peerA").unwrap().ping_token.as_deref(),
            Some("tok1")
        );
        assert_eq!(
            reg.find_in_directory("peerA").unwrap().ping_token.as_deref(),
            Some("tok1")
        );

        assert!(reg.mark_alive("peerA"));
        assert_eq!(
            reg.find_in_directory("peerA").unwrap().status,
            LivenessStatus::Online
        );
    }

    #[test]
    fn test_set_added_ack_is_monotonic() {
        let reg = registry();
        reg.insert_directory(Contact::new("peerA")).unwrap();

        assert!(reg.set_added_ack("peerA"));
        assert!(reg.find_in_directory("peerA").unwrap().added_ack);
        // A second ack leaves the flag true
        assert!(reg.set_added_ack("peerA"));
        assert!(reg.find_in_directory("peerA").unwrap().added_ack);
    }

    #[test]
    fn test_mutation_of_unknown_pubkey_reports_false() {
        let reg = registry();
        assert!(!reg.set_ping_token("ghost", "tok"));
        assert!(!reg.set_added_ack("ghost"));
        assert!(!reg.mark_alive("ghost"));
    }

    #[test]
    fn test_missing_in_pool_dedups_and_excludes_own() {
        let reg = registry();
        reg.insert_pool(Contact::new("peerA")).unwrap();

        let missing = reg.missing_in_pool(["peerA", "peerB", "peerB", OWN, "peerC"]);
        assert_eq!(missing, vec!["peerB".to_string(), "peerC".to_string()]);
    }

    #[test]
    fn test_public_contacts_honors_visibility() {
        let reg = registry();
        reg.insert_directory(Contact::new("peerA")).unwrap();
        reg.insert_directory(Contact::new("peerB")).unwrap();

        let mut disclosed = reg.public_contacts(&PrivacySettings {
            contact_visibility: ContactVisibility::Everyone,
        });
        disclosed.sort();
        assert_eq!(disclosed, vec!["peerA".to_string(), "peerB".to_string()]);

        let hidden = reg.public_contacts(&PrivacySettings {
            contact_visibility: ContactVisibility::Nobody,
        });
        assert!(hidden.is_empty());
    }

    #[test]
    fn test_directory_mapped_snapshot() {
        let reg = registry();
        reg.insert_directory(Contact::new("peerA")).unwrap();
        reg.insert_directory(Contact::new("peerB")).unwrap();

        let mapped = reg.directory_mapped();
        assert_eq!(mapped.len(), 2);
        let mut keys: Vec<_> = mapped.into_iter().map(|c| c.pubkey).collect();
        keys.sort();
        assert_eq!(keys, vec!["peerA".to_string(), "peerB".to_string()]);
    }

    #[test]
    fn test_followers_are_identity_only() {
        let reg = registry();
        assert!(reg.insert_follower("peerA"));
        assert!(!reg.insert_follower("peerA"));
        assert!(reg.is_follower("peerA"));
        assert!(reg.remove_follower("peerA"));
        assert!(!reg.is_follower("peerA"));
    }
}
