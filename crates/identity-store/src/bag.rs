//! Flat key/value bags: the manage page and the main-site sign-in email.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::namespace::{Namespace, Namespaces};

/// Field of the `main_site` namespace holding the remembered sign-in email.
pub const SIGN_IN_EMAIL_FIELD: &str = "signInEmail";

/// A flat key/value map stored under one namespace.
///
/// Corrupt data reads as empty and is overwritten by the next write.
#[derive(Clone)]
pub struct KeyedBag {
    ns: Namespaces,
    namespace: Namespace,
}

impl KeyedBag {
    /// Bag stored under `namespace`.
    pub fn new(ns: Namespaces, namespace: Namespace) -> Self {
        Self { ns, namespace }
    }

    /// Set `key` to `value`.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut all = self.load()?;
        all.insert(key.to_string(), value.into());
        self.ns.set(self.namespace, &all)
    }

    /// Value of `key`, if set.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    /// Delete `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut all = self.load()?;
        all.remove(key);
        self.ns.set(self.namespace, &all)
    }

    fn load(&self) -> Result<Map<String, Value>> {
        Ok(self.ns.get::<Map<String, Value>>(self.namespace)?.value)
    }
}

/// The email pre-filled on the main site's sign-in form.
#[derive(Clone)]
pub struct SignInEmail {
    bag: KeyedBag,
}

impl SignInEmail {
    /// Sign-in email stored in the `main_site` namespace.
    pub fn new(ns: Namespaces) -> Self {
        Self {
            bag: KeyedBag::new(ns, Namespace::MainSite),
        }
    }

    /// Remember `email`.
    pub fn set(&self, email: &str) -> Result<()> {
        self.bag.set(SIGN_IN_EMAIL_FIELD, email)
    }

    /// The remembered email, if it is a string.
    pub fn get(&self) -> Result<Option<String>> {
        Ok(self
            .bag
            .get(SIGN_IN_EMAIL_FIELD)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Forget the remembered email.
    pub fn remove(&self) -> Result<()> {
        self.bag.remove(SIGN_IN_EMAIL_FIELD)
    }
}
