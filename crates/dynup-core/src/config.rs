//! Configuration types for the dynup service
//!
//! This module defines the request-handling configuration. How the values
//! are sourced (environment variables) is the daemon's concern.

use serde::{Deserialize, Serialize};

/// Service configuration for the update reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// The managed zone (e.g., "example.com"). Update requests must name
    /// this zone or a subdomain of it.
    pub zone_name: String,

    /// TTL applied to upserted record sets (seconds)
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,

    /// Secret name holding the expected username
    pub username_secret: String,

    /// Secret name holding the expected password
    pub password_secret: String,

    /// Maximum credential staleness (seconds). Bounds how long a rotated
    /// credential can keep authenticating.
    #[serde(default = "default_credential_cache_ttl_secs")]
    pub credential_cache_ttl_secs: u64,

    /// Retry policy for zone authority calls
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ServiceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_name.is_empty() {
            return Err(crate::Error::config("zone_name cannot be empty"));
        }
        if self.zone_name.starts_with('.') || self.zone_name.ends_with('.') {
            return Err(crate::Error::config(
                "zone_name must not have leading or trailing dots",
            ));
        }
        if self.username_secret.is_empty() || self.password_secret.is_empty() {
            return Err(crate::Error::config(
                "username_secret and password_secret cannot be empty",
            ));
        }
        if self.record_ttl == 0 {
            return Err(crate::Error::config("record_ttl must be > 0"));
        }
        self.retry.validate()?;
        Ok(())
    }
}

/// Retry policy for zone authority calls
///
/// Transient authority failures are retried with exponential backoff
/// (base delay, doubling, jittered by up to half the delay). The whole
/// reconciliation is bounded by `total_budget_ms`; on expiry the request
/// maps to the generic authority-error outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per authority operation (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Base backoff delay in milliseconds, doubled after each failure
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Request-level time budget in milliseconds
    #[serde(default = "default_total_budget_ms")]
    pub total_budget_ms: u64,
}

impl RetryConfig {
    /// Validate the retry policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("retry.max_attempts must be > 0"));
        }
        if self.total_budget_ms == 0 {
            return Err(crate::Error::config("retry.total_budget_ms must be > 0"));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            total_budget_ms: default_total_budget_ms(),
        }
    }
}

fn default_record_ttl() -> u32 {
    300
}

fn default_credential_cache_ttl_secs() -> u64 {
    300
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_total_budget_ms() -> u64 {
    8_000
}
