//! Update reconciler
//!
//! The reconciler owns the whole update flow for one request:
//!
//! 1. Hostname scoping (before any external call)
//! 2. Authentication against the credential cache, constant-time
//! 3. Per-family read-then-conditional-write against the zone authority
//!
//! ```text
//! UpdateRequest ──▶ Reconciler ──▶ ReconcileOutcome
//!                      │
//!        ┌─────────────┴─────────────┐
//!        ▼                           ▼
//! ┌────────────────┐        ┌───────────────┐
//! │ CredentialCache│        │ ZoneAuthority │
//! │ (authenticate) │        │ (read/upsert) │
//! └────────────────┘        └───────────────┘
//! ```
//!
//! A and AAAA are reconciled independently: updating one family never
//! requires or clobbers the other. Every reconciliation re-reads current
//! state from the authority, so repeating an identical request issues no
//! duplicate writes.
//!
//! Retry policy is owned here, never by authority implementations:
//! transient failures are re-attempted with doubled, jittered backoff, and
//! the whole reconciliation runs under a request-level time budget.

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::request::{
    Credentials, RecordKind, RecordSet, ReconcileOutcome, UpdateRequest,
};
use crate::traits::{CredentialCache, ZoneAuthority};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

/// Action for one record family, decided from current state and target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Submit an upsert; the family counts as changed
    Upsert,
    /// Current value already matches; no write
    Keep,
}

/// Decide what to do for one record family.
///
/// Pure function of (current record set, target value): upsert when the
/// record is absent or its value differs, keep otherwise. TTL drift alone
/// does not trigger a write.
pub fn plan(current: Option<&RecordSet>, target: IpAddr) -> RecordAction {
    match current {
        Some(record) if record.value == target => RecordAction::Keep,
        _ => RecordAction::Upsert,
    }
}

/// The update reconciler
pub struct Reconciler {
    authority: Arc<dyn ZoneAuthority>,
    credentials: CredentialCache,
    config: ServiceConfig,
}

impl Reconciler {
    /// Create a reconciler over the given collaborators
    pub fn new(
        authority: Arc<dyn ZoneAuthority>,
        credentials: CredentialCache,
        config: ServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            authority,
            credentials,
            config,
        })
    }

    /// Reconcile one update request against the managed zone.
    ///
    /// Never returns an error: every failure mode maps to a protocol
    /// outcome, and internal detail is logged server-side only.
    pub async fn reconcile(&self, request: &UpdateRequest) -> ReconcileOutcome {
        // Scoping gate runs before any external call.
        if !crate::request::is_valid_fqdn(&request.hostname)
            || !crate::request::in_zone(&request.hostname, &self.config.zone_name)
        {
            debug!(hostname = %request.hostname, "Hostname outside managed zone");
            return ReconcileOutcome::InvalidHostname;
        }

        if request.targets.is_empty() {
            return ReconcileOutcome::InvalidHostname;
        }

        // Authentication gate runs before any zone authority call.
        let expected = match self.credentials.current().await {
            Ok(creds) => creds,
            Err(e) => {
                error!("Failed to read expected credentials: {e}");
                return ReconcileOutcome::AuthorityError;
            }
        };
        if !credentials_match(&request.credentials, &expected) {
            warn!(
                hostname = %request.hostname,
                username = %request.credentials.username,
                "Rejected update with bad credentials"
            );
            return ReconcileOutcome::AuthFailure;
        }

        let budget = Duration::from_millis(self.config.retry.total_budget_ms);
        match tokio::time::timeout(budget, self.reconcile_families(request)).await {
            Ok(Ok(changed_any)) => {
                if changed_any {
                    info!(hostname = %request.hostname, targets = %request.targets, "Zone updated");
                    ReconcileOutcome::Good {
                        targets: request.targets,
                    }
                } else {
                    debug!(hostname = %request.hostname, "Zone already current");
                    ReconcileOutcome::NoChange {
                        targets: request.targets,
                    }
                }
            }
            Ok(Err(e)) => {
                error!(hostname = %request.hostname, "Zone authority failure: {e}");
                ReconcileOutcome::AuthorityError
            }
            Err(_) => {
                error!(
                    hostname = %request.hostname,
                    budget_ms = self.config.retry.total_budget_ms,
                    "Reconciliation exceeded request budget"
                );
                ReconcileOutcome::AuthorityError
            }
        }
    }

    /// Reconcile each family present in the targets; returns whether any
    /// family changed
    async fn reconcile_families(&self, request: &UpdateRequest) -> Result<bool> {
        let mut changed_any = false;
        for kind in [RecordKind::A, RecordKind::Aaaa] {
            let Some(target) = request.targets.for_kind(kind) else {
                continue;
            };
            changed_any |= self
                .reconcile_family(&request.hostname, kind, target)
                .await?;
        }
        Ok(changed_any)
    }

    /// Read-then-conditional-write for one record family
    async fn reconcile_family(
        &self,
        hostname: &str,
        kind: RecordKind,
        target: IpAddr,
    ) -> Result<bool> {
        let current = self
            .with_retry("get_record", || self.authority.get_record(hostname, kind))
            .await?;

        match plan(current.as_ref(), target) {
            RecordAction::Keep => {
                debug!(hostname, %kind, %target, "Record already correct");
                Ok(false)
            }
            RecordAction::Upsert => {
                let submission = self
                    .with_retry("upsert_record", || {
                        self.authority
                            .upsert_record(hostname, kind, target, self.config.record_ttl)
                    })
                    .await?;
                info!(
                    hostname,
                    %kind,
                    %target,
                    change_id = %submission.id,
                    "Submitted record change"
                );
                Ok(true)
            }
        }
    }

    /// Run one authority operation under the retry policy.
    ///
    /// Transient failures are re-attempted up to `max_attempts` with
    /// exponential backoff (doubling, jittered by up to half the delay);
    /// fatal failures return immediately.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_millis(self.config.retry.base_delay_ms);
        for attempt in 1..=self.config.retry.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.retry.max_attempts => {
                    let jitter = Duration::from_millis(fastrand::u64(0..=delay.as_millis() as u64 / 2));
                    warn!(
                        operation,
                        attempt,
                        authority = self.authority.authority_name(),
                        backoff_ms = (delay + jitter).as_millis() as u64,
                        "Transient authority failure, retrying: {e}"
                    );
                    tokio::time::sleep(delay + jitter).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Other(format!("{operation}: retry attempts exhausted")))
    }
}

/// Constant-time comparison of supplied against expected credentials.
///
/// Both fields are always compared so a username mismatch costs the same
/// as a password mismatch. Length is not hidden; values are.
fn credentials_match(supplied: &Credentials, expected: &Credentials) -> bool {
    ct_str_eq(&supplied.username, &expected.username)
        & ct_str_eq(&supplied.password, &expected.password)
}

fn ct_str_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> RecordSet {
        RecordSet {
            name: "host.example.com".to_string(),
            kind: RecordKind::A,
            value: value.parse().unwrap(),
            ttl: 300,
        }
    }

    #[test]
    fn plan_upserts_absent_record() {
        let target: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(plan(None, target), RecordAction::Upsert);
    }

    #[test]
    fn plan_upserts_differing_value() {
        let target: IpAddr = "203.0.113.9".parse().unwrap();
        let current = record("198.51.100.7");
        assert_eq!(plan(Some(&current), target), RecordAction::Upsert);
    }

    #[test]
    fn plan_keeps_matching_value() {
        let target: IpAddr = "203.0.113.9".parse().unwrap();
        let current = record("203.0.113.9");
        assert_eq!(plan(Some(&current), target), RecordAction::Keep);
    }

    #[test]
    fn plan_ignores_ttl_drift() {
        let target: IpAddr = "203.0.113.9".parse().unwrap();
        let mut current = record("203.0.113.9");
        current.ttl = 60;
        assert_eq!(plan(Some(&current), target), RecordAction::Keep);
    }

    #[test]
    fn credential_comparison() {
        let expected = Credentials {
            username: "superg".to_string(),
            password: "hunter2".to_string(),
        };
        let good = expected.clone();
        assert!(credentials_match(&good, &expected));

        let bad_password = Credentials {
            username: "superg".to_string(),
            password: "hunter3".to_string(),
        };
        assert!(!credentials_match(&bad_password, &expected));

        let bad_username = Credentials {
            username: "superb".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!credentials_match(&bad_username, &expected));

        let wrong_length = Credentials {
            username: "superg".to_string(),
            password: "hunter".to_string(),
        };
        assert!(!credentials_match(&wrong_length, &expected));
    }
}
