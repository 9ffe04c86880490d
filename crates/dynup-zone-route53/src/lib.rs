// # Route 53 zone authority
//
// `ZoneAuthority` implementation over the Route 53 REST API:
//
// - List record set: GET `/2013-04-01/hostedzone/:id/rrset?name=&type=&maxitems=1`
// - Atomic upsert:   POST `/2013-04-01/hostedzone/:id/rrset/` (ChangeBatch XML)
// - Change status:   GET `/2013-04-01/change/:id`
//
// Requests are SigV4-signed (Route 53 is a global service signed against
// us-east-1). One HTTP call per method, full error propagation to the
// reconciler, which owns retry and backoff. Errors are classified:
// throttling, `PriorRequestNotComplete` (a concurrent change for the same
// name still in flight), 5xx, and network failures are transient;
// validation and permission errors are fatal.

mod xml;

use async_trait::async_trait;
use chrono::Utc;
use dynup_aws_sign::{AwsCredentials, SigV4Signer, canonical_query_string};
use dynup_core::request::{ChangeStatus, ChangeSubmission, RecordKind, RecordSet};
use dynup_core::traits::ZoneAuthority;
use dynup_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Route 53 API endpoint
const ROUTE53_ENDPOINT: &str = "https://route53.amazonaws.com";

/// Route 53 is global; SigV4 scope is always us-east-1
const ROUTE53_REGION: &str = "us-east-1";

/// Per-request HTTP timeout; the reconciler's budget bounds the whole
/// reconciliation separately
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Zone authority backed by a Route 53 hosted zone
pub struct Route53ZoneAuthority {
    client: reqwest::Client,
    signer: SigV4Signer,
    endpoint: String,
    host: String,
    hosted_zone_id: String,
}

impl Route53ZoneAuthority {
    /// Create an authority for one hosted zone
    pub fn new(credentials: AwsCredentials, hosted_zone_id: impl Into<String>) -> Self {
        Self::with_endpoint(credentials, hosted_zone_id, ROUTE53_ENDPOINT)
    }

    /// Create an authority against a non-default endpoint (tests, local
    /// API emulators)
    pub fn with_endpoint(
        credentials: AwsCredentials,
        hosted_zone_id: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            signer: SigV4Signer::new(credentials, ROUTE53_REGION, "route53"),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
            hosted_zone_id: hosted_zone_id.into(),
        }
    }

    /// Execute one signed request and return the response body, with
    /// HTTP-level errors classified
    async fn send(
        &self,
        method: reqwest::Method,
        uri: &str,
        query: &[(String, String)],
        payload: &str,
    ) -> Result<String> {
        let mut url = format!("{}{uri}", self.endpoint);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&canonical_query_string(query));
        }

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in self.signer.signed_headers(
            method.as_str(),
            &self.host,
            uri,
            query,
            payload.as_bytes(),
            Utc::now(),
        ) {
            request = request.header(name, value);
        }
        if !payload.is_empty() {
            request = request
                .header("content-type", "application/xml")
                .body(payload.to_string());
        }

        let response = request.send().await.map_err(|e| {
            // Timeouts and connection failures are worth another attempt
            Error::authority_transient("route53", format!("HTTP request failed: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::authority_transient("route53", format!("Failed to read response: {e}"))
        })?;

        if status.is_success() {
            return Ok(body);
        }
        Err(classify_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl ZoneAuthority for Route53ZoneAuthority {
    async fn get_record(&self, name: &str, kind: RecordKind) -> Result<Option<RecordSet>> {
        let uri = format!("/2013-04-01/hostedzone/{}/rrset", self.hosted_zone_id);
        let query = vec![
            ("name".to_string(), format!("{name}.")),
            ("type".to_string(), kind.as_str().to_string()),
            ("maxitems".to_string(), "1".to_string()),
        ];

        let body = self.send(reqwest::Method::GET, &uri, &query, "").await?;
        parse_record_set(&body, name, kind)
    }

    async fn upsert_record(
        &self,
        name: &str,
        kind: RecordKind,
        value: IpAddr,
        ttl: u32,
    ) -> Result<ChangeSubmission> {
        let uri = format!("/2013-04-01/hostedzone/{}/rrset/", self.hosted_zone_id);
        let payload = change_batch_xml(name, kind, value, ttl);

        tracing::debug!(name, kind = %kind, %value, "Submitting UPSERT change batch");
        let body = self.send(reqwest::Method::POST, &uri, &[], &payload).await?;
        parse_change_info(&body)
    }

    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus> {
        let uri = format!("/2013-04-01/change/{change_id}");
        let body = self.send(reqwest::Method::GET, &uri, &[], "").await?;
        let submission = parse_change_info(&body)?;
        Ok(submission.status)
    }

    fn authority_name(&self) -> &'static str {
        "route53"
    }
}

/// Build the ChangeResourceRecordSets request body for one UPSERT
fn change_batch_xml(name: &str, kind: RecordKind, value: IpAddr, ttl: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ChangeResourceRecordSetsRequest xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ChangeBatch>
    <Changes>
      <Change>
        <Action>UPSERT</Action>
        <ResourceRecordSet>
          <Name>{}.</Name>
          <Type>{}</Type>
          <TTL>{ttl}</TTL>
          <ResourceRecords>
            <ResourceRecord>
              <Value>{value}</Value>
            </ResourceRecord>
          </ResourceRecords>
        </ResourceRecordSet>
      </Change>
    </Changes>
  </ChangeBatch>
</ChangeResourceRecordSetsRequest>"#,
        xml::escape_text(name),
        kind.as_str(),
    )
}

/// Extract the record set matching `(name, kind)` from a
/// ListResourceRecordSets response.
///
/// Route 53 lists from `name` in lexicographic order, so the first entry
/// may be a different name entirely; a non-matching entry means the
/// requested record set does not exist.
fn parse_record_set(body: &str, name: &str, kind: RecordKind) -> Result<Option<RecordSet>> {
    let wanted = format!("{}.", name.to_ascii_lowercase());

    for block in xml::tag_blocks(body, "ResourceRecordSet") {
        let Some(entry_name) = xml::first_tag_text(block, "Name") else {
            continue;
        };
        let entry_type = xml::first_tag_text(block, "Type").unwrap_or_default();
        if entry_name.to_ascii_lowercase() != wanted || entry_type != kind.as_str() {
            return Ok(None);
        }

        let ttl: u32 = xml::first_tag_text(block, "TTL")
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| Error::authority_fatal("route53", "record set without a TTL"))?;
        let value_text = xml::first_tag_text(block, "Value").ok_or_else(|| {
            Error::authority_fatal("route53", "record set without a resource record value")
        })?;
        let value: IpAddr = value_text.trim().parse().map_err(|_| {
            Error::authority_fatal(
                "route53",
                format!("unparseable {} record value: {value_text:?}", kind.as_str()),
            )
        })?;

        return Ok(Some(RecordSet {
            name: name.to_string(),
            kind,
            value,
            ttl,
        }));
    }

    Ok(None)
}

/// Extract change id and status from a ChangeInfo response
fn parse_change_info(body: &str) -> Result<ChangeSubmission> {
    let id = xml::first_tag_text(body, "Id")
        .ok_or_else(|| Error::authority_fatal("route53", "change response without an Id"))?
        .trim_start_matches("/change/")
        .to_string();
    let status = match xml::first_tag_text(body, "Status") {
        Some("INSYNC") => ChangeStatus::InSync,
        Some("PENDING") | None => ChangeStatus::Pending,
        Some(other) => {
            tracing::warn!(status = other, "Unknown change status, treating as pending");
            ChangeStatus::Pending
        }
    };
    Ok(ChangeSubmission { id, status })
}

/// Map an HTTP error status plus ErrorResponse body onto the transient /
/// fatal taxonomy
fn classify_error(status: u16, body: &str) -> Error {
    let code = xml::first_tag_text(body, "Code").unwrap_or_default();
    let message = xml::first_tag_text(body, "Message").unwrap_or("no message");

    match (status, code) {
        (_, "Throttling") | (_, "PriorRequestNotComplete") | (429, _) => {
            Error::authority_transient("route53", format!("{code}: {message} (status {status})"))
        }
        (500..=599, _) => Error::authority_transient(
            "route53",
            format!("server error {status}: {code}: {message}"),
        ),
        _ => Error::authority_fatal("route53", format!("{code}: {message} (status {status})")),
    }
}
