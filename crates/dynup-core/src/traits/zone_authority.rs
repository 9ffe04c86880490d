//! Zone authority trait
//!
//! Wraps the external authoritative DNS API: read the current record set
//! for a (name, kind), submit an atomic upsert, and poll change
//! propagation. The external API is assumed strongly consistent per zone
//! but may reject concurrent conflicting changes for the same name; such
//! rejections surface as transient errors and the reconciler retries with
//! a fresh read.
//!
//! ## Constraints on implementations
//!
//! - One API call per method invocation; no retry, backoff, or caching.
//!   Retry policy is owned by the [`Reconciler`](crate::Reconciler).
//! - Errors must be classified: [`Error::AuthorityTransient`] for
//!   throttling/transient network failure, [`Error::AuthorityFatal`] for
//!   validation and permission errors.
//! - Implementations must be thread-safe and usable across async tasks.
//!
//! [`Error::AuthorityTransient`]: crate::Error::AuthorityTransient
//! [`Error::AuthorityFatal`]: crate::Error::AuthorityFatal

use crate::error::Result;
use crate::request::{ChangeStatus, ChangeSubmission, RecordKind, RecordSet};
use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for authoritative DNS API implementations
#[async_trait]
pub trait ZoneAuthority: Send + Sync {
    /// Read the current record set for `(name, kind)`.
    ///
    /// Returns `Ok(None)` when no such record set exists. The reconciler
    /// calls this before every write; results must reflect the authority's
    /// current state, never a cache.
    async fn get_record(&self, name: &str, kind: RecordKind) -> Result<Option<RecordSet>>;

    /// Submit an atomic upsert for `(name, kind)` to `value` with `ttl`.
    ///
    /// Creates the record set if absent, replaces its value otherwise.
    async fn upsert_record(
        &self,
        name: &str,
        kind: RecordKind,
        value: IpAddr,
        ttl: u32,
    ) -> Result<ChangeSubmission>;

    /// Poll the propagation status of a previously submitted change
    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus>;

    /// Name of the authority (for logging)
    fn authority_name(&self) -> &'static str;
}
