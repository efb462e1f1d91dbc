//! Email registry: known email identities and their key material.
//!
//! The registry is the root of the cross-namespace consistency rules:
//! sites may only reference registered emails, and removing an email
//! cascades into site info and login state before the call returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::login::LoginMap;
use crate::namespace::{Namespace, Namespaces};
use crate::sites::{SiteInfoMap, EMAIL_FIELD};

/// All registered emails, keyed by address.
pub type EmailMap = BTreeMap<String, KeyMaterial>;

/// Key material held for one email identity.
///
/// Only the three key fields are interpreted; anything else the caller
/// stores is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMaterial {
    /// Private key (`priv`).
    #[serde(rename = "priv", default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<Value>,
    /// Public key (`pub`).
    #[serde(rename = "pub", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Value>,
    /// Certificate issued for the public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<Value>,
    /// Any other fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyMaterial {
    /// Empty key material.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the private key.
    pub fn with_secret_key(mut self, key: impl Into<Value>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    /// Set the public key.
    pub fn with_public_key(mut self, key: impl Into<Value>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Set the certificate.
    pub fn with_cert(mut self, cert: impl Into<Value>) -> Self {
        self.cert = Some(cert.into());
        self
    }

    /// Set an arbitrary extra field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// `true` if any of the private key, public key or certificate is present.
    pub fn has_keys(&self) -> bool {
        self.secret_key.is_some() || self.public_key.is_some() || self.cert.is_some()
    }

    fn strip_keys(&mut self) {
        self.secret_key = None;
        self.public_key = None;
        self.cert = None;
    }
}

/// Registry of email identities on top of the `emails` namespace.
#[derive(Clone)]
pub struct EmailRegistry {
    ns: Namespaces,
}

impl EmailRegistry {
    /// Create a registry over `ns`.
    pub fn new(ns: Namespaces) -> Self {
        Self { ns }
    }

    /// Every registered email.
    ///
    /// If the stored collection is corrupt, the whole store is cleared
    /// (see [`Namespaces::clear`]) and an empty map is returned: with the
    /// email list gone, site and manage-page data cannot be trusted either.
    pub fn emails(&self) -> Result<EmailMap> {
        let decoded = self.ns.get::<EmailMap>(Namespace::Emails)?;
        if decoded.was_corrupt {
            log::warn!("email registry is corrupt, clearing stored identities");
            self.ns.clear()?;
            return Ok(EmailMap::new());
        }
        Ok(decoded.value)
    }

    /// Number of registered emails.
    pub fn email_count(&self) -> Result<usize> {
        Ok(self.emails()?.len())
    }

    /// Key material for `email`, or `None` if it is not registered.
    pub fn email(&self, email: &str) -> Result<Option<KeyMaterial>> {
        Ok(self.emails()?.remove(email))
    }

    /// `true` if `email` is registered.
    pub fn contains(&self, email: &str) -> Result<bool> {
        Ok(self.emails()?.contains_key(email))
    }

    /// Register `email`, replacing any existing key material.
    pub fn add_email(&self, email: &str, material: Option<KeyMaterial>) -> Result<()> {
        let mut emails = self.emails()?;
        emails.insert(email.to_string(), material.unwrap_or_default());
        self.store(&emails)
    }

    /// Remove `email` and every reference to it.
    ///
    /// Sites whose `email` field names the address lose that field (the
    /// site entry itself stays), and every login entry for the address is
    /// deleted. All three writes happen before this returns; they are not
    /// atomic with respect to other contexts sharing the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownEmail` if `email` is not registered.
    pub fn remove_email(&self, email: &str) -> Result<()> {
        let mut emails = self.emails()?;
        if emails.remove(email).is_none() {
            return Err(StoreError::UnknownEmail(email.to_string()));
        }
        self.store(&emails)?;

        let sites = self.ns.get::<SiteInfoMap>(Namespace::SiteInfo)?;
        let mut site_info = sites.value;
        let mut detached = 0usize;
        for bag in site_info.values_mut() {
            if bag.get(EMAIL_FIELD).and_then(Value::as_str) == Some(email) {
                bag.remove(EMAIL_FIELD);
                detached += 1;
            }
        }
        if detached > 0 || sites.was_corrupt {
            self.ns.set(Namespace::SiteInfo, &site_info)?;
        }

        let logins = self.ns.get::<LoginMap>(Namespace::LoggedIn)?;
        let mut logged_in = logins.value;
        let before = logged_in.len();
        logged_in.retain(|_, who| who != email);
        let logged_out = before - logged_in.len();
        if logged_out > 0 || logins.was_corrupt {
            self.ns.set(Namespace::LoggedIn, &logged_in)?;
        }

        log::debug!(
            "removed {email}: detached from {detached} sites, logged out of {logged_out}"
        );
        Ok(())
    }

    /// Drop the private key, public key and certificate for `email`,
    /// keeping the identity registered.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownEmail` if `email` is not registered.
    pub fn invalidate_email(&self, email: &str) -> Result<()> {
        let mut emails = self.emails()?;
        let material = emails
            .get_mut(email)
            .ok_or_else(|| StoreError::UnknownEmail(email.to_string()))?;
        material.strip_keys();
        self.store(&emails)
    }

    fn store(&self, emails: &EmailMap) -> Result<()> {
        self.ns.set(Namespace::Emails, emails)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
