//! Email-to-identity map.
//!
//! Device trust is keyed by the numeric identity an authentication flow
//! assigns to a user. This map lets callers that only know an email
//! address find that identity.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::namespace::{Namespace, Namespaces};

/// A user, named either by numeric identity or by email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityRef {
    /// Already-resolved numeric identity.
    Id(u64),
    /// Email address to resolve through the map.
    Email(String),
}

impl IdentityRef {
    /// The numeric identity, if this reference already is one.
    pub fn as_id(&self) -> Option<u64> {
        match self {
            IdentityRef::Id(id) => Some(*id),
            IdentityRef::Email(_) => None,
        }
    }
}

impl From<u64> for IdentityRef {
    fn from(id: u64) -> Self {
        IdentityRef::Id(id)
    }
}

impl From<&str> for IdentityRef {
    fn from(email: &str) -> Self {
        IdentityRef::Email(email.to_string())
    }
}

impl From<String> for IdentityRef {
    fn from(email: String) -> Self {
        IdentityRef::Email(email)
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRef::Id(id) => write!(f, "{id}"),
            IdentityRef::Email(email) => f.write_str(email),
        }
    }
}

/// Email to numeric identity cache on the `emailToUserID` namespace.
#[derive(Clone)]
pub struct IdentityMap {
    ns: Namespaces,
}

impl IdentityMap {
    /// Create a map over `ns`.
    pub fn new(ns: Namespaces) -> Self {
        Self { ns }
    }

    /// Map every address in `emails` to `user_id`.
    ///
    /// Existing mappings for other addresses are kept. A corrupt stored map
    /// is discarded and rebuilt from this call alone.
    pub fn update_email_to_user_id_mapping<S>(&self, user_id: u64, emails: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        let mut all = self.load()?;
        for email in emails {
            all.insert(email.as_ref().to_string(), Value::from(user_id));
        }
        self.ns.set(Namespace::EmailToUserId, &all)
    }

    /// Resolve `who` to a numeric identity.
    ///
    /// A numeric reference is returned unchanged. An email resolves only if
    /// it is mapped to a non-negative integer.
    pub fn map_email_to_user_id(&self, who: &IdentityRef) -> Result<Option<u64>> {
        match who {
            IdentityRef::Id(id) => Ok(Some(*id)),
            IdentityRef::Email(email) => {
                Ok(self.load()?.get(email.as_str()).and_then(Value::as_u64))
            }
        }
    }

    fn load(&self) -> Result<Map<String, Value>> {
        Ok(self
            .ns
            .get::<Map<String, Value>>(Namespace::EmailToUserId)?
            .value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
