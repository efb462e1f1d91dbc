//! Site registry: a key/value bag per site origin.
//!
//! The `email` field is special: it may only name an email present in the
//! [`EmailRegistry`], and it is detached automatically when that email is
//! removed. Bags that become empty through [`SiteRegistry::remove`] are
//! pruned.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::emails::EmailRegistry;
use crate::error::{Result, StoreError};
use crate::namespace::{Namespace, Namespaces};

/// Field linking a site to a registered email.
pub const EMAIL_FIELD: &str = "email";

/// Everything known about one site.
pub type SiteBag = Map<String, Value>;

/// All sites, keyed by origin.
pub type SiteInfoMap = BTreeMap<String, SiteBag>;

/// Per-site key/value storage on the `siteInfo` namespace.
#[derive(Clone)]
pub struct SiteRegistry {
    ns: Namespaces,
    emails: EmailRegistry,
}

impl SiteRegistry {
    /// Create a registry validating emails against `emails`.
    pub fn new(ns: Namespaces, emails: EmailRegistry) -> Self {
        Self { ns, emails }
    }

    /// Set `key` for `site`, creating the site's bag if needed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownEmail` if `key` is `email` and `value` is
    /// not a registered email address.
    pub fn set(&self, site: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if key == EMAIL_FIELD {
            let known = match value.as_str() {
                Some(email) => self.emails.contains(email)?,
                None => false,
            };
            if !known {
                return Err(StoreError::UnknownEmail(display_value(&value)));
            }
        }

        let mut all = self.load()?;
        all.entry(site.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.ns.set(Namespace::SiteInfo, &all)
    }

    /// Value of `key` for `site`, if set.
    pub fn get(&self, site: &str, key: &str) -> Result<Option<Value>> {
        let mut all = self.load()?;
        Ok(all.get_mut(site).and_then(|bag| bag.remove(key)))
    }

    /// Delete `key` for `site`. The site is dropped once its bag is empty.
    pub fn remove(&self, site: &str, key: &str) -> Result<()> {
        let mut all = self.load()?;
        let Some(bag) = all.get_mut(site) else {
            return Ok(());
        };
        bag.remove(key);
        if bag.is_empty() {
            all.remove(site);
        }
        self.ns.set(Namespace::SiteInfo, &all)
    }

    /// Number of sites with any stored info.
    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Every site and its bag.
    pub fn all(&self) -> Result<SiteInfoMap> {
        self.load()
    }

    fn load(&self) -> Result<SiteInfoMap> {
        Ok(self.ns.get::<SiteInfoMap>(Namespace::SiteInfo)?.value)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
