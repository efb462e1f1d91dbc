//! Device trust states and the persisted record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// What is known about an identity on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustState {
    /// The user has used this device but was not asked yet.
    Seen,
    /// The user said this is their computer.
    Confirmed,
    /// The user said this is not their computer.
    Denied,
    /// Forced prompt, only set explicitly (testing and debugging).
    Ask,
}

impl TrustState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            TrustState::Seen => "seen",
            TrustState::Confirmed => "confirmed",
            TrustState::Denied => "denied",
            TrustState::Ask => "ask",
        }
    }

    /// `true` for states reachable through ordinary transitions.
    pub fn is_transition_target(self) -> bool {
        matches!(
            self,
            TrustState::Seen | TrustState::Confirmed | TrustState::Denied
        )
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustState {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seen" => Ok(TrustState::Seen),
            "confirmed" => Ok(TrustState::Confirmed),
            "denied" => Ok(TrustState::Denied),
            "ask" => Ok(TrustState::Ask),
            other => Err(StoreError::InvalidState(other.to_string())),
        }
    }
}

/// Persisted trust record for one identity.
///
/// ```json
/// { "state": "confirmed", "updated": "2026-10-19T08:30:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRecord {
    /// Current state.
    pub state: TrustState,
    /// When the state was last set.
    pub updated: DateTime<Utc>,
}

impl TrustRecord {
    /// A record entering `state` at `at`.
    pub fn new(state: TrustState, at: DateTime<Utc>) -> Self {
        Self { state, updated: at }
    }
}
