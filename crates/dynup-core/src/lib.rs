// # dynup-core
//
// Core library for the dynup dynamic-DNS update service.
//
// dynup speaks the legacy Dyn/ddclient update protocol (`GET /nic/update`):
// a client authenticates with HTTP Basic credentials, names a hostname and
// optionally its new address(es), and the service reconciles the managed
// zone so the hostname resolves to those addresses.
//
// ## Architecture Overview
//
// - **ZoneAuthority**: Trait wrapping the authoritative DNS API (read a
//   record set, submit an upsert, poll change propagation)
// - **CredentialStore**: Trait for reading named secrets; wrapped by a
//   bounded-TTL cache so credential rotation needs no redeploy
// - **Reconciler**: Orchestrates authentication, current-state lookup,
//   per-family diffing, and conditional write-back with retry/backoff
// - **protocol**: Maps between the Dyn text wire format and
//   `ReconcileOutcome`
// - **extract**: Derives target addresses from query parameters and the
//   observed connection address
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The reconciler owns orchestration; zone
//    authorities and credential stores are single-shot leaf adapters
// 2. **Reconciler-Owned Retry**: Authority implementations never retry;
//    backoff, jitter, and the request budget live here
// 3. **Dual-Stack Independence**: A and AAAA are planned and written
//    independently; updating one family never touches the other
// 4. **Library-First**: Every request-handling decision is testable without
//    a network

pub mod config;
pub mod error;
pub mod extract;
pub mod protocol;
pub mod reconciler;
pub mod request;
pub mod traits;

// Re-export core types for convenience
pub use config::{RetryConfig, ServiceConfig};
pub use error::{Error, Result};
pub use reconciler::Reconciler;
pub use request::{
    ChangeStatus, ChangeSubmission, Credentials, RecordKind, RecordSet, ReconcileOutcome,
    TargetAddresses, UpdateRequest,
};
pub use traits::{CredentialCache, CredentialStore, ZoneAuthority};
