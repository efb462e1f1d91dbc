//! Return-target staging: one redirect URL with a short shelf life.
//!
//! Stored under `returnTo` as:
//!
//! ```json
//! { "at": "2026-10-19T08:30:00Z", "url": "https://example.com/after" }
//! ```
//!
//! A staged value is only good for [`RETURN_TO_TTL`]. Reading a stale or
//! malformed value deletes it.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::namespace::{Namespace, Namespaces};
use crate::time::{parse_rfc3339, to_rfc3339, Clock};

/// How long a staged return target stays valid.
pub const RETURN_TO_TTL: Duration = Duration::minutes(5);

#[derive(Debug, Serialize)]
struct StagedReturn<'a> {
    at: String,
    url: &'a str,
}

/// Why a staged value was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    Unreadable,
    Stale,
    Malformed,
}

/// The staged return target on the `returnTo` namespace.
#[derive(Clone)]
pub struct ReturnTarget {
    ns: Namespaces,
    clock: Arc<dyn Clock>,
}

impl ReturnTarget {
    /// Create the stager.
    pub fn new(ns: Namespaces, clock: Arc<dyn Clock>) -> Self {
        Self { ns, clock }
    }

    /// Stage `url`, replacing anything staged before.
    pub fn set_return_to(&self, url: &str) -> Result<()> {
        let staged = StagedReturn {
            at: to_rfc3339(self.clock.now()),
            url,
        };
        self.ns.set(Namespace::ReturnTo, &staged)
    }

    /// The staged URL, if one is present and still fresh.
    ///
    /// Unreadable, stale (older than five minutes) and non-string values
    /// are removed and reported as `None`. A stored `null` means nothing is
    /// staged and is left alone.
    pub fn get_return_to(&self) -> Result<Option<String>> {
        let Some(raw) = self.ns.raw(Namespace::ReturnTo)? else {
            return Ok(None);
        };

        match self.inspect(&raw) {
            Ok(url) => Ok(url),
            Err(reason) => {
                log::debug!("discarding staged return target: {reason:?}");
                self.ns.remove(Namespace::ReturnTo)?;
                Ok(None)
            }
        }
    }

    fn inspect(&self, raw: &str) -> std::result::Result<Option<String>, Discard> {
        let staged: Value = serde_json::from_str(raw).map_err(|_| Discard::Unreadable)?;
        if staged.is_null() {
            return Ok(None);
        }

        let at = staged
            .get("at")
            .and_then(Value::as_str)
            .and_then(parse_rfc3339)
            .ok_or(Discard::Unreadable)?;
        if self.clock.now() - at > RETURN_TO_TTL {
            return Err(Discard::Stale);
        }

        staged
            .get("url")
            .and_then(Value::as_str)
            .map(|url| Some(url.to_string()))
            .ok_or(Discard::Malformed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
