//! Core domain types for Peerbook

pub mod contact;

pub use contact::{
    Contact, ContactVisibility, LivenessStatus, OwnProfile, PrivacySettings,
};
