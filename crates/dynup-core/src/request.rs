//! Domain types for the update flow
//!
//! Everything here is request-scoped: a parsed update request, the target
//! addresses it asks for, and the outcome the reconciler hands back to the
//! protocol adapter. Record sets are owned by the external zone authority
//! and are never cached across requests.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A parsed Dyn-protocol update request
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// Fully qualified hostname to update
    pub hostname: String,
    /// Requested target addresses, per family
    pub targets: TargetAddresses,
    /// Credentials supplied by the client
    pub credentials: Credentials,
}

/// Target addresses for an update, one optional slot per family
///
/// A and AAAA are reconciled independently; there is deliberately no single
/// "the IP" field anywhere in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetAddresses {
    /// IPv4 target (A record)
    pub v4: Option<Ipv4Addr>,
    /// IPv6 target (AAAA record)
    pub v6: Option<Ipv6Addr>,
}

impl TargetAddresses {
    /// Whether at least one family has a target
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }

    /// The target for a given record kind, as a generic address
    pub fn for_kind(&self, kind: RecordKind) -> Option<IpAddr> {
        match kind {
            RecordKind::A => self.v4.map(IpAddr::V4),
            RecordKind::Aaaa => self.v6.map(IpAddr::V6),
        }
    }
}

impl fmt::Display for TargetAddresses {
    /// Renders the present addresses comma-separated, IPv4 first.
    ///
    /// This matches the list form ddclient itself uses in `myip=` and is
    /// what gets echoed in `good`/`nochg` bodies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.v4, self.v6) {
            (Some(v4), Some(v6)) => write!(f, "{v4},{v6}"),
            (Some(v4), None) => write!(f, "{v4}"),
            (None, Some(v6)) => write!(f, "{v6}"),
            (None, None) => Ok(()),
        }
    }
}

/// A username/password pair
///
/// The Debug implementation intentionally does NOT expose the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// DNS record kind handled by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordKind {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
        }
    }

    /// The record kind an address belongs to
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => RecordKind::A,
            IpAddr::V6(_) => RecordKind::Aaaa,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as reported by the zone authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Record name (fully qualified, no trailing dot)
    pub name: String,
    /// Record kind
    pub kind: RecordKind,
    /// Record value
    pub value: IpAddr,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// Outcome of submitting a change to the zone authority
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSubmission {
    /// Authority-assigned change identifier
    pub id: String,
    /// Propagation status at submission time
    pub status: ChangeStatus,
}

/// Propagation status of a submitted change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Change accepted but not yet visible on all authority servers
    Pending,
    /// Change visible on all authority servers
    InSync,
}

/// Result of one reconciliation, the contract between the reconciler and
/// the protocol adapter
///
/// This carries no wire-format knowledge; the protocol adapter maps each
/// variant to its Dyn status line exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// At least one record family was changed
    Good {
        /// The addresses the zone now points at
        targets: TargetAddresses,
    },
    /// All requested families already matched
    NoChange {
        /// The (unchanged) target addresses
        targets: TargetAddresses,
    },
    /// Credentials missing or wrong
    AuthFailure,
    /// Hostname malformed, outside the managed zone, or no target address
    /// could be determined
    InvalidHostname,
    /// The zone authority failed after the retry policy was exhausted
    AuthorityError,
}

/// Whether `hostname` is a syntactically valid fully qualified domain name.
///
/// Labels are 1-63 characters of `[A-Za-z0-9-]`, no leading/trailing
/// hyphen, total length at most 253, at least two labels.
pub fn is_valid_fqdn(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// Whether `hostname` names the managed zone or a subdomain of it.
///
/// Comparison is case-insensitive, as DNS names are.
pub fn in_zone(hostname: &str, zone: &str) -> bool {
    let hostname = hostname.to_ascii_lowercase();
    let zone = zone.to_ascii_lowercase();
    hostname == zone || hostname.ends_with(&format!(".{zone}"))
}
