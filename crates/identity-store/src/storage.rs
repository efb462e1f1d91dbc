//! The assembled store: every component over one backend.

use std::sync::Arc;

use crate::backend::{open_backend, KeyValueStore, MemoryBackend};
use crate::bag::{KeyedBag, SignInEmail};
use crate::config::StoreConfig;
use crate::emails::EmailRegistry;
use crate::error::Result;
use crate::identity_map::IdentityMap;
use crate::login::LoginTracker;
use crate::namespace::{Namespace, Namespaces};
use crate::notify::ChangeSource;
use crate::return_to::ReturnTarget;
use crate::sites::SiteRegistry;
use crate::time::{Clock, SystemClock};
use crate::trust::DeviceTrust;

/// Local identity storage for one execution context.
///
/// Construction seeds every namespace with its default, so readers in any
/// context sharing the backend see empty collections rather than missing
/// keys.
#[derive(Clone)]
pub struct LocalStorage {
    ns: Namespaces,
    emails: EmailRegistry,
    sites: SiteRegistry,
    logins: LoginTracker,
    identities: IdentityMap,
    trust: DeviceTrust,
    return_to: ReturnTarget,
    manage_page: KeyedBag,
    sign_in_email: SignInEmail,
}

impl LocalStorage {
    /// Assemble the store over `store`, observing other contexts through
    /// `changes` and telling time with `clock`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        changes: Arc<dyn ChangeSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let ns = Namespaces::new(store);
        ns.set_default_values()?;

        let emails = EmailRegistry::new(ns.clone());
        let identities = IdentityMap::new(ns.clone());

        Ok(Self {
            sites: SiteRegistry::new(ns.clone(), emails.clone()),
            logins: LoginTracker::new(ns.clone(), changes),
            trust: DeviceTrust::new(ns.clone(), identities.clone(), Arc::clone(&clock)),
            return_to: ReturnTarget::new(ns.clone(), clock),
            manage_page: KeyedBag::new(ns.clone(), Namespace::ManagePage),
            sign_in_email: SignInEmail::new(ns.clone()),
            emails,
            identities,
            ns,
        })
    }

    /// Open the backend selected by `config` with the system clock.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let opened = open_backend(config);
        Self::new(opened.store, opened.changes, Arc::new(SystemClock))
    }

    /// A new context on `backend`, with native change events.
    pub fn on_memory(backend: &MemoryBackend, clock: Arc<dyn Clock>) -> Result<Self> {
        let ctx = backend.context();
        let changes = Arc::new(ctx.change_source());
        Self::new(Arc::new(ctx), changes, clock)
    }

    /// A private in-memory store with the system clock.
    pub fn in_memory() -> Result<Self> {
        Self::on_memory(&MemoryBackend::new(), Arc::new(SystemClock))
    }

    /// Email identities and key material.
    pub fn emails(&self) -> &EmailRegistry {
        &self.emails
    }

    /// Per-site info.
    pub fn sites(&self) -> &SiteRegistry {
        &self.sites
    }

    /// Login state and its watch.
    pub fn logins(&self) -> &LoginTracker {
        &self.logins
    }

    /// Email to numeric identity map.
    pub fn identities(&self) -> &IdentityMap {
        &self.identities
    }

    /// Device trust engine.
    pub fn trust(&self) -> &DeviceTrust {
        &self.trust
    }

    /// Staged return target.
    pub fn return_to(&self) -> &ReturnTarget {
        &self.return_to
    }

    /// Manage-page settings.
    pub fn manage_page(&self) -> &KeyedBag {
        &self.manage_page
    }

    /// Remembered main-site sign-in email.
    pub fn sign_in_email(&self) -> &SignInEmail {
        &self.sign_in_email
    }

    /// Raw namespace access.
    pub fn namespaces(&self) -> &Namespaces {
        &self.ns
    }

    /// Seed any missing namespace with its default.
    pub fn set_default_values(&self) -> Result<()> {
        self.ns.set_default_values()
    }

    /// Forget emails, site info and manage-page data, then re-seed.
    ///
    /// Login state, device trust, the identity map and the sign-in email
    /// survive.
    pub fn clear(&self) -> Result<()> {
        self.ns.clear()
    }
}
