//! Test doubles and common utilities for reconciler contract tests
//!
//! The mocks count every call so tests can assert not just outcomes but
//! which external calls were (or were not) made.

#![allow(dead_code)]

use async_trait::async_trait;
use dynup_core::config::{RetryConfig, ServiceConfig};
use dynup_core::error::{Error, Result};
use dynup_core::request::{
    ChangeStatus, ChangeSubmission, Credentials, RecordKind, RecordSet, TargetAddresses,
    UpdateRequest,
};
use dynup_core::traits::{CredentialCache, CredentialStore, ZoneAuthority};
use dynup_core::Reconciler;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// A mock zone authority with an in-memory zone and programmable failures
pub struct MockZoneAuthority {
    records: Mutex<HashMap<(String, RecordKind), RecordSet>>,
    get_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    upserts: Mutex<Vec<(String, RecordKind, IpAddr)>>,
    /// Milliseconds each get call sleeps before answering
    get_delay_ms: AtomicU64,
    /// Number of upcoming calls (get or upsert) that fail transiently
    fail_transient: AtomicUsize,
    /// Number of upcoming upsert calls that fail transiently
    fail_upsert_transient: AtomicUsize,
    /// When set, every call fails transiently
    always_fail_transient: std::sync::atomic::AtomicBool,
    /// When set, every call fails fatally
    always_fail_fatal: std::sync::atomic::AtomicBool,
}

impl MockZoneAuthority {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            get_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            upserts: Mutex::new(Vec::new()),
            get_delay_ms: AtomicU64::new(0),
            fail_transient: AtomicUsize::new(0),
            fail_upsert_transient: AtomicUsize::new(0),
            always_fail_transient: std::sync::atomic::AtomicBool::new(false),
            always_fail_fatal: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Seed the zone with an existing record set
    pub fn with_record(self, name: &str, kind: RecordKind, value: &str, ttl: u32) -> Self {
        self.records.lock().unwrap().insert(
            (name.to_string(), kind),
            RecordSet {
                name: name.to_string(),
                kind,
                value: value.parse().unwrap(),
                ttl,
            },
        );
        self
    }

    /// Make every get call sleep before answering
    pub fn delay_gets(&self, ms: u64) {
        self.get_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Make the next `n` calls fail with a transient error
    pub fn fail_next_transient(&self, n: usize) {
        self.fail_transient.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` upsert calls fail with a transient error
    pub fn fail_next_upsert_transient(&self, n: usize) {
        self.fail_upsert_transient.store(n, Ordering::SeqCst);
    }

    /// Make every call fail with a transient error
    pub fn always_fail_transient(&self) {
        self.always_fail_transient.store(true, Ordering::SeqCst);
    }

    /// Make every call fail with a fatal error
    pub fn always_fail_fatal(&self) {
        self.always_fail_fatal.store(true, Ordering::SeqCst);
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_call_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Every upsert recorded as (name, kind, value)
    pub fn recorded_upserts(&self) -> Vec<(String, RecordKind, IpAddr)> {
        self.upserts.lock().unwrap().clone()
    }

    /// Total calls of any kind reaching the authority
    pub fn total_call_count(&self) -> usize {
        self.get_call_count() + self.upsert_call_count()
    }

    fn maybe_fail(&self) -> Result<()> {
        if self.always_fail_fatal.load(Ordering::SeqCst) {
            return Err(Error::authority_fatal("mock", "permission denied"));
        }
        if self.always_fail_transient.load(Ordering::SeqCst) {
            return Err(Error::authority_transient("mock", "throttled"));
        }
        let remaining = self.fail_transient.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_transient.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::authority_transient("mock", "throttled"));
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneAuthority for MockZoneAuthority {
    async fn get_record(&self, name: &str, kind: RecordKind) -> Result<Option<RecordSet>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.get_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.maybe_fail()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(name.to_string(), kind))
            .cloned())
    }

    async fn upsert_record(
        &self,
        name: &str,
        kind: RecordKind,
        value: IpAddr,
        ttl: u32,
    ) -> Result<ChangeSubmission> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        let remaining = self.fail_upsert_transient.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_upsert_transient.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::authority_transient("mock", "PriorRequestNotComplete"));
        }
        self.upserts
            .lock()
            .unwrap()
            .push((name.to_string(), kind, value));
        self.records.lock().unwrap().insert(
            (name.to_string(), kind),
            RecordSet {
                name: name.to_string(),
                kind,
                value,
                ttl,
            },
        );
        Ok(ChangeSubmission {
            id: format!("change-{}", self.upsert_calls.load(Ordering::SeqCst)),
            status: ChangeStatus::Pending,
        })
    }

    async fn change_status(&self, _change_id: &str) -> Result<ChangeStatus> {
        Ok(ChangeStatus::InSync)
    }

    fn authority_name(&self) -> &'static str {
        "mock"
    }
}

/// A credential store with fixed secrets and a read counter
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
    get_calls: AtomicUsize,
}

impl StaticSecretStore {
    pub fn new(username: &str, password: &str) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert("dynup/username".to_string(), username.to_string());
        secrets.insert("dynup/password".to_string(), password.to_string());
        Self {
            secrets,
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for StaticSecretStore {
    async fn get(&self, name: &str) -> Result<String> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SecretNotFound(name.to_string()))
    }
}

/// Service configuration with fast retries for tests
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        zone_name: "example.com".to_string(),
        record_ttl: 300,
        username_secret: "dynup/username".to_string(),
        password_secret: "dynup/password".to_string(),
        credential_cache_ttl_secs: 300,
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            total_budget_ms: 5_000,
        },
    }
}

/// Build a reconciler over the given mocks with the test configuration
pub fn reconciler(
    authority: Arc<MockZoneAuthority>,
    store: Arc<StaticSecretStore>,
) -> Reconciler {
    reconciler_with_config(authority, store, test_config())
}

/// Build a reconciler over the given mocks with a caller-supplied
/// configuration
pub fn reconciler_with_config(
    authority: Arc<MockZoneAuthority>,
    store: Arc<StaticSecretStore>,
    config: ServiceConfig,
) -> Reconciler {
    let cache = CredentialCache::new(
        store as Arc<dyn CredentialStore>,
        config.username_secret.clone(),
        config.password_secret.clone(),
        Duration::from_secs(config.credential_cache_ttl_secs),
    );
    Reconciler::new(authority as Arc<dyn ZoneAuthority>, cache, config)
        .expect("reconciler construction succeeds")
}

/// An update request for `hostname` with the given credentials and targets
pub fn request(
    hostname: &str,
    username: &str,
    password: &str,
    v4: Option<&str>,
    v6: Option<&str>,
) -> UpdateRequest {
    UpdateRequest {
        hostname: hostname.to_string(),
        targets: TargetAddresses {
            v4: v4.map(|s| s.parse().unwrap()),
            v6: v6.map(|s| s.parse().unwrap()),
        },
        credentials: Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
    }
}
