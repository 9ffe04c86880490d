//! Capability traits at the seams of the service
//!
//! Each external collaborator (authoritative DNS API, secret service) is
//! expressed as an object-safe async trait so it can be replaced by a
//! counting mock in contract tests.

mod credential_store;
mod zone_authority;

pub use credential_store::{CredentialCache, CredentialStore};
pub use zone_authority::ZoneAuthority;
