//! Device trust transitions and queries.
//!
//! Transition rules for [`DeviceTrust::set_confirmation_state`]:
//!
//! 1. The identity must resolve to a number, and the requested state must
//!    be `seen`, `confirmed` or `denied`.
//! 2. An unreadable current record resets the whole trust namespace.
//! 3. A `denied` answer older than [`DENIAL_TTL`] is forgotten.
//! 4. `seen` never overwrites an existing record.
//! 5. Otherwise the requested state is written with the current time.
//!
//! `ask` can only be entered through
//! [`DeviceTrust::set_user_must_confirm_computer`].

use std::sync::Arc;

use chrono::Duration;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::identity_map::{IdentityMap, IdentityRef};
use crate::namespace::{Namespace, Namespaces};
use crate::time::{parse_rfc3339, Clock};

use super::state::{TrustRecord, TrustState};

/// How long a "not my computer" answer stands before the user is re-asked.
pub const DENIAL_TTL: Duration = Duration::hours(24);

/// How long after a first sighting before the user is asked.
pub const SEEN_GRACE: Duration = Duration::seconds(60);

type TrustMap = Map<String, Value>;

/// Per-identity device trust on the `usersComputer` namespace.
#[derive(Clone)]
pub struct DeviceTrust {
    ns: Namespaces,
    identities: IdentityMap,
    clock: Arc<dyn Clock>,
}

impl DeviceTrust {
    /// Create the engine; emails are resolved through `identities`.
    pub fn new(ns: Namespaces, identities: IdentityMap, clock: Arc<dyn Clock>) -> Self {
        Self {
            ns,
            identities,
            clock,
        }
    }

    /// Apply a trust transition for `who`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidIdentity` if `who` does not resolve to a
    /// numeric identity, or `StoreError::InvalidState` for `ask`.
    pub fn set_confirmation_state(
        &self,
        who: impl Into<IdentityRef>,
        requested: TrustState,
    ) -> Result<()> {
        let who = who.into();
        let id = self
            .identities
            .map_email_to_user_id(&who)?
            .ok_or_else(|| StoreError::InvalidIdentity(who.to_string()))?;

        if !requested.is_transition_target() {
            return Err(StoreError::InvalidState(requested.to_string()));
        }

        let key = id.to_string();
        let now = self.clock.now();
        let (mut all, mut current) = self.load_for_transition(&key)?;

        if let Some(record) = &current {
            if record.state == TrustState::Denied && now - record.updated > DENIAL_TTL {
                log::debug!("denial for identity {id} expired, forgetting it");
                current = None;
            }
        }

        if requested == TrustState::Seen && current.is_some() {
            return Ok(());
        }

        all.insert(key, record_value(&TrustRecord::new(requested, now))?);
        self.ns.set(Namespace::UsersComputer, &all)
    }

    /// Record a sighting of `who` on this device. Never overrides an answer.
    pub fn set_user_seen_on_computer(&self, who: impl Into<IdentityRef>) -> Result<()> {
        self.set_confirmation_state(who, TrustState::Seen)
    }

    /// Record that `who` confirmed this is their computer.
    pub fn set_user_confirmed_on_computer(&self, who: impl Into<IdentityRef>) -> Result<()> {
        self.set_confirmation_state(who, TrustState::Confirmed)
    }

    /// Record that `who` said this is not their computer.
    pub fn set_not_my_computer(&self, who: impl Into<IdentityRef>) -> Result<()> {
        self.set_confirmation_state(who, TrustState::Denied)
    }

    /// Should `who` be asked whether this is their computer?
    ///
    /// Only numeric identities are considered; anything else gets `false`
    /// so unauthenticated callers fall back to short sessions. A missing or
    /// unreadable record gets `true`.
    pub fn should_ask_user_about_her_computer(&self, who: impl Into<IdentityRef>) -> bool {
        let Some(id) = who.into().as_id() else {
            return false;
        };

        let decoded = match self.ns.get::<TrustMap>(Namespace::UsersComputer) {
            Ok(decoded) if !decoded.was_corrupt => decoded.value,
            Ok(_) => return true,
            Err(e) => {
                log::warn!("cannot read device trust for identity {id}: {e}");
                return true;
            }
        };

        let Some(record) = decoded.get(&id.to_string()).and_then(Value::as_object) else {
            return true;
        };

        let state = record.get("state").and_then(Value::as_str);
        let age = record
            .get("updated")
            .and_then(Value::as_str)
            .and_then(parse_rfc3339)
            .map(|updated| self.clock.now() - updated);

        match (state, age) {
            (Some("ask"), _) => true,
            (Some("confirmed"), _) => false,
            (Some("denied"), Some(age)) => age > DENIAL_TTL,
            (Some("seen"), Some(age)) => age > SEEN_GRACE,
            (Some("denied" | "seen"), None) => true,
            _ => false,
        }
    }

    /// `true` if `who` resolves and has confirmed this device.
    pub fn user_confirmed_on_computer(&self, who: impl Into<IdentityRef>) -> bool {
        matches!(
            self.record(who),
            Ok(Some(TrustRecord {
                state: TrustState::Confirmed,
                ..
            }))
        )
    }

    /// Force `who` to be asked on the next check.
    ///
    /// Skips every transition rule. Failures are logged and swallowed.
    pub fn set_user_must_confirm_computer(&self, who: impl Into<IdentityRef>) {
        let who = who.into();
        if let Err(e) = self.force_ask(&who) {
            log::warn!("could not force device prompt for {who}: {e}");
        }
    }

    /// Forget any trust record stored under the raw key of `who`.
    ///
    /// Emails are not resolved. Failures are logged and swallowed.
    pub fn clear_users_computer_ownership_status(&self, who: impl Into<IdentityRef>) {
        let who = who.into();
        if let Err(e) = self.clear_record(&who.to_string()) {
            log::warn!("could not clear device trust for {who}: {e}");
        }
    }

    /// The stored record for `who`, if it resolves and is readable.
    pub fn record(&self, who: impl Into<IdentityRef>) -> Result<Option<TrustRecord>> {
        let Some(id) = self.identities.map_email_to_user_id(&who.into())? else {
            return Ok(None);
        };
        let all = self.ns.get::<TrustMap>(Namespace::UsersComputer)?.value;
        Ok(all
            .get(&id.to_string())
            .and_then(|v| serde_json::from_value::<TrustRecord>(v.clone()).ok()))
    }

    /// Load the trust map and the current record under `key`.
    ///
    /// Any unusable record discards the whole map.
    fn load_for_transition(&self, key: &str) -> Result<(TrustMap, Option<TrustRecord>)> {
        let decoded = self.ns.get::<TrustMap>(Namespace::UsersComputer)?;
        let all = decoded.value;

        let current = match all.get(key) {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<TrustRecord>(raw.clone()) {
                Ok(record) if record.state.is_transition_target() => Some(record),
                _ => {
                    log::debug!("device trust record {key} is corrupt, resetting");
                    return Ok((TrustMap::new(), None));
                }
            },
        };

        Ok((all, current))
    }

    fn force_ask(&self, who: &IdentityRef) -> Result<()> {
        let Some(id) = self.identities.map_email_to_user_id(who)? else {
            log::debug!("not forcing device prompt for unresolved {who}");
            return Ok(());
        };

        let mut all = self.ns.get::<TrustMap>(Namespace::UsersComputer)?.value;
        let record = TrustRecord::new(TrustState::Ask, self.clock.now());
        all.insert(id.to_string(), record_value(&record)?);
        self.ns.set(Namespace::UsersComputer, &all)
    }

    fn clear_record(&self, key: &str) -> Result<()> {
        let decoded = self.ns.get::<TrustMap>(Namespace::UsersComputer)?;
        if decoded.was_corrupt {
            return Ok(());
        }
        let mut all = decoded.value;
        if all.remove(key).is_some() {
            self.ns.set(Namespace::UsersComputer, &all)?;
        }
        Ok(())
    }
}

fn record_value(record: &TrustRecord) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
