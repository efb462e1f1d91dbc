//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle on a persistent file store:
//! 1. Register emails with key material
//! 2. Associate sites with emails
//! 3. Log in to sites
//! 4. Record device trust through the email-to-identity map
//! 5. Remove an email and check every reference is gone
//! 6. Reopen the store and check what persisted

use std::sync::Arc;

use chrono::Duration;
use identity_store::backend::FileStore;
use identity_store::notify::PollingChangeSource;
use identity_store::{
    KeyMaterial, LocalStorage, ManualClock, MemoryBackend, StoreConfig, StoreError, TrustState,
};
use serde_json::Value;

fn open_file_store(dir: &std::path::Path, clock: Arc<ManualClock>) -> LocalStorage {
    LocalStorage::new(
        Arc::new(FileStore::new(dir).expect("file store")),
        Arc::new(PollingChangeSource::default()),
        clock,
    )
    .expect("storage should open")
}

#[test]
fn site_email_association_end_to_end() {
    let storage =
        LocalStorage::on_memory(&MemoryBackend::new(), Arc::new(ManualClock::starting_now()))
            .unwrap();

    storage
        .emails()
        .add_email("a@x.com", Some(KeyMaterial::new().with_public_key("k")))
        .unwrap();

    storage
        .sites()
        .set("example.com", "email", "a@x.com")
        .expect("registered email is accepted");

    let err = storage
        .sites()
        .set("example.com", "email", "b@x.com")
        .expect_err("unregistered email is rejected");
    assert!(matches!(err, StoreError::UnknownEmail(_)));

    storage.emails().remove_email("a@x.com").unwrap();
    assert_eq!(storage.sites().get("example.com", "email").unwrap(), None);
}

#[test]
fn full_workflow_on_file_store() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    let storage = open_file_store(tmp.path(), clock.clone());

    // ── Step 1: Register emails ─────────────────────────────────────────
    let material = KeyMaterial::new()
        .with_public_key(serde_json::json!({"alg": "DS", "y": "abc"}))
        .with_secret_key(serde_json::json!({"alg": "DS", "x": "def"}))
        .with_cert("eyJhbGciOi...");
    storage
        .emails()
        .add_email("alice@example.com", Some(material))
        .unwrap();
    storage.emails().add_email("alice@work.com", None).unwrap();
    assert_eq!(storage.emails().email_count().unwrap(), 2);

    // ── Step 2: Associate sites ─────────────────────────────────────────
    storage
        .sites()
        .set("https://shop.com", "email", "alice@example.com")
        .unwrap();
    storage
        .sites()
        .set("https://shop.com", "remember", true)
        .unwrap();
    storage
        .sites()
        .set("https://intranet.com", "email", "alice@work.com")
        .unwrap();
    assert_eq!(storage.sites().count().unwrap(), 2);

    // ── Step 3: Log in ──────────────────────────────────────────────────
    storage
        .logins()
        .set_logged_in("https://shop.com", Some("alice@example.com"))
        .unwrap();
    storage
        .logins()
        .set_logged_in("https://intranet.com", Some("alice@work.com"))
        .unwrap();
    assert_eq!(storage.logins().logged_in_count().unwrap(), 2);

    // ── Step 4: Device trust via the identity map ───────────────────────
    storage
        .identities()
        .update_email_to_user_id_mapping(42, &["alice@example.com", "alice@work.com"])
        .unwrap();
    storage
        .trust()
        .set_user_seen_on_computer("alice@example.com")
        .unwrap();
    assert!(!storage.trust().should_ask_user_about_her_computer(42_u64));

    clock.advance(Duration::seconds(90));
    assert!(storage.trust().should_ask_user_about_her_computer(42_u64));

    storage
        .trust()
        .set_user_confirmed_on_computer("alice@work.com")
        .unwrap();
    assert!(storage.trust().user_confirmed_on_computer("alice@example.com"));
    assert!(!storage.trust().should_ask_user_about_her_computer(42_u64));

    // ── Step 5: Remove an email ─────────────────────────────────────────
    storage.emails().remove_email("alice@example.com").unwrap();

    assert_eq!(storage.emails().email("alice@example.com").unwrap(), None);
    assert_eq!(
        storage.sites().get("https://shop.com", "email").unwrap(),
        None
    );
    assert_eq!(
        storage.sites().get("https://shop.com", "remember").unwrap(),
        Some(Value::Bool(true))
    );
    assert_eq!(
        storage.logins().logged_in("https://shop.com").unwrap(),
        None
    );
    assert_eq!(
        storage
            .logins()
            .logged_in("https://intranet.com")
            .unwrap()
            .as_deref(),
        Some("alice@work.com")
    );

    // ── Step 6: Reopen ──────────────────────────────────────────────────
    drop(storage);
    let reopened = open_file_store(tmp.path(), clock);
    assert_eq!(reopened.emails().email_count().unwrap(), 1);
    assert_eq!(
        reopened.trust().record(42_u64).unwrap().map(|r| r.state),
        Some(TrustState::Confirmed)
    );
    assert_eq!(reopened.logins().logged_in_count().unwrap(), 1);
}

#[test]
fn invalidate_keeps_identity_across_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    let storage = open_file_store(tmp.path(), clock.clone());

    storage
        .emails()
        .add_email(
            "a@x.com",
            Some(
                KeyMaterial::new()
                    .with_public_key("pub")
                    .with_secret_key("priv")
                    .with_cert("cert"),
            ),
        )
        .unwrap();
    storage.emails().invalidate_email("a@x.com").unwrap();

    let reopened = open_file_store(tmp.path(), clock);
    let material = reopened
        .emails()
        .email("a@x.com")
        .unwrap()
        .expect("identity survives invalidation");
    assert!(!material.has_keys());
}

#[test]
fn return_target_window() {
    let clock = Arc::new(ManualClock::starting_now());
    let storage = LocalStorage::on_memory(&MemoryBackend::new(), clock.clone()).unwrap();

    storage
        .return_to()
        .set_return_to("https://rp.com/landing")
        .unwrap();
    clock.advance(Duration::minutes(4) + Duration::seconds(59));
    assert_eq!(
        storage.return_to().get_return_to().unwrap().as_deref(),
        Some("https://rp.com/landing")
    );

    clock.advance(Duration::seconds(2));
    assert_eq!(storage.return_to().get_return_to().unwrap(), None);
}

#[test]
fn open_from_config_uses_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let config = StoreConfig::default().with_dir(tmp.path());

    let storage = LocalStorage::open(&config).unwrap();
    storage.emails().add_email("a@x.com", None).unwrap();

    let again = LocalStorage::open(&config).unwrap();
    assert!(again.emails().contains("a@x.com").unwrap());
}
