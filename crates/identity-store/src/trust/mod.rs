//! Device trust: is this the user's own computer?
//!
//! Each numeric identity carries at most one [`TrustRecord`]: the last
//! answer (or sighting) and when it happened. Collaborators use the record
//! to pick a session length; this module only stores and ages it.
//!
//! - [`state`]: the persisted states and record format.
//! - [`engine`]: transition rules, expiry, and the "should we ask" query.

pub mod engine;
pub mod state;

pub use engine::{DeviceTrust, DENIAL_TTL, SEEN_GRACE};
pub use state::{TrustRecord, TrustState};
