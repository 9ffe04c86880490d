//! Dyn wire-protocol adapter
//!
//! The legacy update protocol answers every request with a single text
//! line. The mapping from [`ReconcileOutcome`] to that line is a fixed,
//! exhaustively-checked table:
//!
//! | Outcome          | Body             | HTTP status |
//! |------------------|------------------|-------------|
//! | `Good`           | `good <address>` | 200         |
//! | `NoChange`       | `nochg <address>`| 200         |
//! | `AuthFailure`    | `badauth`        | 401         |
//! | `InvalidHostname`| `notfqdn`        | 404         |
//! | `AuthorityError` | `911`            | 502         |
//!
//! Unrecognized paths answer `badagent` / 404. No internal error detail
//! ever reaches a response body.

use crate::request::{Credentials, ReconcileOutcome};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Legacy Dyn parameters that clients still send and the service accepts
/// without acting on (the original Dyn service interpreted them)
pub const IGNORED_LEGACY_PARAMS: &[&str] = &["wildcard", "mx", "backmx", "offline", "system"];

/// A rendered protocol response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code
    pub status: u16,
    /// Single-line response body
    pub body: String,
}

impl WireResponse {
    fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Whether `path` is one of the recognized update endpoints.
///
/// `/v3/update` is the same call under ddclient's alternate path.
pub fn is_update_path(path: &str) -> bool {
    matches!(path, "/nic/update" | "/v3/update")
}

/// Decode an HTTP Basic `Authorization` header value into credentials.
///
/// Returns `None` for any shape other than `Basic <base64(user:pass)>`
/// with valid UTF-8 inside; the caller answers `badauth`.
pub fn parse_basic_auth(header_value: &str) -> Option<Credentials> {
    let encoded = header_value.strip_prefix("Basic ")?.trim();
    let decoded = BASE64.decode(encoded).ok()?;
    let pair = String::from_utf8(decoded).ok()?;
    let (username, password) = pair.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Render a reconciliation outcome as its protocol response
pub fn render(outcome: &ReconcileOutcome) -> WireResponse {
    match outcome {
        ReconcileOutcome::Good { targets } => WireResponse::new(200, format!("good {targets}")),
        ReconcileOutcome::NoChange { targets } => {
            WireResponse::new(200, format!("nochg {targets}"))
        }
        ReconcileOutcome::AuthFailure => WireResponse::new(401, "badauth"),
        ReconcileOutcome::InvalidHostname => WireResponse::new(404, "notfqdn"),
        ReconcileOutcome::AuthorityError => WireResponse::new(502, "911"),
    }
}

/// Response for a missing or undecodable authorization header
pub fn bad_auth() -> WireResponse {
    render(&ReconcileOutcome::AuthFailure)
}

/// Response for a malformed hostname or undeterminable target address
pub fn not_fqdn() -> WireResponse {
    render(&ReconcileOutcome::InvalidHostname)
}

/// Response for any path other than the update endpoints
pub fn bad_agent() -> WireResponse {
    WireResponse::new(404, "badagent")
}
