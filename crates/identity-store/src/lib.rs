//! identity-store: local persistence for an identity-management client.
//!
//! Holds a user's email identities and key material, per-site data,
//! cross-context login state, and a time-sensitive device trust signal,
//! all as JSON collections inside one host-provided key-value store.
//!
//! The layers, leaf first:
//!
//! - [`backend`]: the raw key-value capability and its implementations.
//! - [`namespace`]: typed collections with default seeding and
//!   self-healing reads.
//! - [`emails`], [`sites`], [`login`], [`identity_map`], [`trust`],
//!   [`return_to`], [`bag`]: the components.
//! - [`storage`]: [`LocalStorage`], which assembles them.

pub mod backend;
pub mod bag;
pub mod config;
pub mod emails;
pub mod error;
pub mod identity_map;
pub mod login;
pub mod namespace;
pub mod notify;
pub mod return_to;
pub mod sites;
pub mod storage;
pub mod time;
pub mod trust;

// Re-export primary types
pub use backend::{FileStore, KeyValueStore, MemoryBackend, MemoryStore};
pub use config::StoreConfig;
pub use emails::{EmailMap, EmailRegistry, KeyMaterial};
pub use error::{Result, StoreError};
pub use identity_map::{IdentityMap, IdentityRef};
pub use login::{LoginMap, LoginTracker};
pub use namespace::{decode_or_default, Decoded, Namespace, Namespaces};
pub use notify::{BroadcastChangeSource, ChangeSource, PollingChangeSource};
pub use return_to::ReturnTarget;
pub use sites::{SiteInfoMap, SiteRegistry};
pub use storage::LocalStorage;
pub use time::{Clock, ManualClock, SystemClock};
pub use trust::{DeviceTrust, TrustRecord, TrustState};
