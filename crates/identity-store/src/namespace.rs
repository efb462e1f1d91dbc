//! Namespaces: typed JSON collections under fixed keys of the raw store.
//!
//! Every logical collection lives under one top-level key and is stored as
//! JSON text. Readers go through [`decode_or_default`], which never fails:
//! absent data decodes to the default and corrupt data (unparsable, `null`,
//! or the wrong shape) decodes to the default with `was_corrupt` set, so
//! each caller can pick its own recovery.
//!
//! Defaults are seeded with [`Namespaces::set_default_values`] at start-up
//! and again after [`Namespaces::clear`], so another context reading the
//! same store only ever observes an empty collection, never a missing key.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::KeyValueStore;
use crate::error::{Result, StoreError};

/// Empty JSON object, the default for every collection namespace.
const EMPTY_OBJECT: &str = "{}";

/// A recognised top-level key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Email identities and their key material.
    Emails,
    /// Per-site key/value bags.
    SiteInfo,
    /// Flat key/value bag for the account management page.
    ManagePage,
    /// Main-site settings (the remembered sign-in email).
    MainSite,
    /// Site origin to logged-in email.
    LoggedIn,
    /// Numeric identity to device trust record.
    UsersComputer,
    /// Email to numeric identity.
    EmailToUserId,
    /// The staged return target. Not seeded.
    ReturnTo,
}

impl Namespace {
    /// Every recognised namespace.
    pub const ALL: [Namespace; 8] = [
        Namespace::Emails,
        Namespace::SiteInfo,
        Namespace::ManagePage,
        Namespace::MainSite,
        Namespace::LoggedIn,
        Namespace::UsersComputer,
        Namespace::EmailToUserId,
        Namespace::ReturnTo,
    ];

    /// Namespaces removed by a full [`Namespaces::clear`].
    pub const CLEARED: [Namespace; 3] = [
        Namespace::Emails,
        Namespace::SiteInfo,
        Namespace::ManagePage,
    ];

    /// The backing-store key.
    pub fn key(self) -> &'static str {
        match self {
            Namespace::Emails => "emails",
            Namespace::SiteInfo => "siteInfo",
            Namespace::ManagePage => "managePage",
            Namespace::MainSite => "main_site",
            Namespace::LoggedIn => "loggedIn",
            Namespace::UsersComputer => "usersComputer",
            Namespace::EmailToUserId => "emailToUserID",
            Namespace::ReturnTo => "returnTo",
        }
    }

    /// Encoded default seeded when the key is absent, if any.
    pub fn default_value(self) -> Option<&'static str> {
        match self {
            Namespace::ReturnTo => None,
            _ => Some(EMPTY_OBJECT),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Result of decoding a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The decoded value, or the default.
    pub value: T,
    /// `true` if stored data existed but could not be used.
    pub was_corrupt: bool,
}

impl<T> Decoded<T> {
    fn clean(value: T) -> Self {
        Self {
            value,
            was_corrupt: false,
        }
    }

    fn corrupt(value: T) -> Self {
        Self {
            value,
            was_corrupt: true,
        }
    }
}

/// Decode raw stored text, substituting `T::default()` when unusable.
///
/// Absent or empty text is treated as "nothing stored" and is not corrupt.
/// A JSON `null`, unparsable text, or a value of the wrong shape is corrupt.
pub fn decode_or_default<T>(raw: Option<&str>) -> Decoded<T>
where
    T: DeserializeOwned + Default,
{
    let text = match raw {
        Some(text) if !text.is_empty() => text,
        _ => return Decoded::clean(T::default()),
    };

    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Null) | Err(_) => Decoded::corrupt(T::default()),
        Ok(value) => match serde_json::from_value(value) {
            Ok(decoded) => Decoded::clean(decoded),
            Err(_) => Decoded::corrupt(T::default()),
        },
    }
}

/// Typed access to every namespace of one backing store.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Namespaces {
    store: Arc<dyn KeyValueStore>,
}

impl Namespaces {
    /// Wrap a backing store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Raw stored text for `ns`.
    pub fn raw(&self, ns: Namespace) -> Result<Option<String>> {
        self.store.get(ns.key())
    }

    /// Decode `ns`, falling back to the default on corruption.
    pub fn get<T>(&self, ns: Namespace) -> Result<Decoded<T>>
    where
        T: DeserializeOwned + Default,
    {
        let raw = self.raw(ns)?;
        let decoded = decode_or_default(raw.as_deref());
        if decoded.was_corrupt {
            log::debug!("namespace {ns} is corrupt, reading as empty");
        }
        Ok(decoded)
    }

    /// Encode `value` and store it under `ns`.
    pub fn set<T>(&self, ns: Namespace, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let text =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(ns.key(), &text)
    }

    /// Delete `ns` entirely.
    pub fn remove(&self, ns: Namespace) -> Result<()> {
        self.store.remove(ns.key())
    }

    /// Seed every namespace that is absent or empty with its default.
    ///
    /// Idempotent: present values, even corrupt ones, are left untouched.
    pub fn set_default_values(&self) -> Result<()> {
        for ns in Namespace::ALL {
            let Some(default) = ns.default_value() else {
                continue;
            };
            let present = self.raw(ns)?.is_some_and(|text| !text.is_empty());
            if !present {
                self.store.set(ns.key(), default)?;
            }
        }
        Ok(())
    }

    /// Forget emails, site info and the manage page, then re-seed defaults.
    ///
    /// Login state, device trust, the identity map and main-site settings
    /// are not removed.
    pub fn clear(&self) -> Result<()> {
        for ns in Namespace::CLEARED {
            self.remove(ns)?;
        }
        self.set_default_values()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
