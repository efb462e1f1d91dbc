//! Login tracker: which email is logged in at which site origin.
//!
//! A present entry means "logged in"; logging out deletes the entry.
//! Other execution contexts sharing the store can be observed with
//! [`LoginTracker::watch_logged_in`].

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::namespace::{Namespace, Namespaces};
use crate::notify::ChangeSource;

/// Site origin to logged-in email.
pub type LoginMap = BTreeMap<String, String>;

/// Login state on the `loggedIn` namespace.
#[derive(Clone)]
pub struct LoginTracker {
    ns: Namespaces,
    changes: Arc<dyn ChangeSource>,
}

impl LoginTracker {
    /// Create a tracker that learns about external writes from `changes`.
    pub fn new(ns: Namespaces, changes: Arc<dyn ChangeSource>) -> Self {
        Self { ns, changes }
    }

    /// Record that `email` is logged in at `origin`.
    ///
    /// `None` or an empty email logs `origin` out.
    pub fn set_logged_in(&self, origin: &str, email: Option<&str>) -> Result<()> {
        let mut all = self.load()?;
        match email {
            Some(email) if !email.is_empty() => {
                all.insert(origin.to_string(), email.to_string());
            }
            _ => {
                all.remove(origin);
            }
        }
        self.ns.set(Namespace::LoggedIn, &all)
    }

    /// The email logged in at `origin`, if any.
    pub fn logged_in(&self, origin: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(origin))
    }

    /// Number of origins with a logged-in email.
    pub fn logged_in_count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Every origin and its logged-in email.
    pub fn all(&self) -> Result<LoginMap> {
        self.load()
    }

    /// Log out of every origin.
    pub fn logout_everywhere(&self) -> Result<()> {
        self.ns.set(Namespace::LoggedIn, &LoginMap::new())
    }

    /// Invoke `callback` whenever another context changes the login state
    /// of `origin`.
    ///
    /// The current value is captured as the baseline now. Each time the
    /// change source fires, the value is re-read; if it differs from the
    /// baseline the callback receives the new value once and the baseline
    /// moves. Writes made through this context are only seen if the change
    /// source reports them (native events do not; polling does).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoRuntime` outside a Tokio runtime, or any
    /// backend error from reading the baseline.
    pub fn watch_logged_in<F>(&self, origin: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<String>) + Send + 'static,
    {
        let mut last = self.logged_in(origin)?;
        let tracker = self.clone();
        let origin = origin.to_string();

        self.changes.subscribe(Box::new(move || {
            match tracker.logged_in(&origin) {
                Ok(current) if current != last => {
                    callback(current.clone());
                    last = current;
                }
                Ok(_) => {}
                Err(e) => log::warn!("cannot re-read login state for {origin}: {e}"),
            }
        }))
    }

    fn load(&self) -> Result<LoginMap> {
        Ok(self.ns.get::<LoginMap>(Namespace::LoggedIn)?.value)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
