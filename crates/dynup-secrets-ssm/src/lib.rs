// # SSM Parameter Store credential store
//
// `CredentialStore` implementation over the Systems Manager `GetParameter`
// action. Parameters hold the service username and password; SecureString
// values are decrypted server-side (`WithDecryption: true`).
//
// SSM speaks the AWS JSON 1.1 protocol: every call is a POST to the
// regional endpoint with an `X-Amz-Target` header naming the action.
// Requests are SigV4-signed. One call per lookup; caching lives in
// `CredentialCache`, not here.

use async_trait::async_trait;
use chrono::Utc;
use dynup_aws_sign::{AwsCredentials, SigV4Signer};
use dynup_core::traits::CredentialStore;
use dynup_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const API_TARGET: &str = "AmazonSSM.GetParameter";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Per-request HTTP timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Credential store backed by SSM Parameter Store
pub struct SsmParameterStore {
    client: reqwest::Client,
    signer: SigV4Signer,
    endpoint: String,
    host: String,
}

impl SsmParameterStore {
    /// Create a store against the regional SSM endpoint
    pub fn new(credentials: AwsCredentials, region: &str) -> Self {
        Self::with_endpoint(credentials, region, format!("https://ssm.{region}.amazonaws.com"))
    }

    /// Create a store against a non-default endpoint (tests, local API
    /// emulators)
    pub fn with_endpoint(
        credentials: AwsCredentials,
        region: &str,
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
            signer: SigV4Signer::new(credentials, region, "ssm"),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
        }
    }
}

#[async_trait]
impl CredentialStore for SsmParameterStore {
    async fn get(&self, name: &str) -> Result<String> {
        let payload = serde_json::json!({
            "Name": name,
            "WithDecryption": true,
        })
        .to_string();

        let mut request = self.client.post(&self.endpoint);
        for (header, value) in self.signer.signed_headers(
            "POST",
            &self.host,
            "/",
            &[],
            payload.as_bytes(),
            Utc::now(),
        ) {
            request = request.header(header, value);
        }
        request = request
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", API_TARGET)
            .body(payload);

        tracing::debug!(parameter = name, "Fetching SSM parameter");
        let response = request.send().await.map_err(|e| {
            Error::secret_store(format!("SSM request failed: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::secret_store(format!("Failed to read SSM response: {e}"))
        })?;

        if status.is_success() {
            return parse_parameter(&body);
        }
        Err(classify_error(name, status.as_u16(), &body))
    }
}

#[derive(Deserialize)]
struct GetParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: Parameter,
}

#[derive(Deserialize)]
struct Parameter {
    #[serde(rename = "Value")]
    value: String,
}

fn parse_parameter(body: &str) -> Result<String> {
    let response: GetParameterResponse = serde_json::from_str(body)
        .map_err(|e| Error::secret_store(format!("Malformed GetParameter response: {e}")))?;
    Ok(response.parameter.value)
}

#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(rename = "message", alias = "Message", default)]
    message: String,
}

/// Map an SSM error response onto the store error taxonomy. The `__type`
/// field carries a namespaced code such as
/// `com.amazonaws.ssm#ParameterNotFound`.
fn classify_error(name: &str, status: u16, body: &str) -> Error {
    let api_error: ApiError = serde_json::from_str(body).unwrap_or_default();
    let code = api_error.kind.rsplit(['#', '.']).next().unwrap_or_default();

    if code == "ParameterNotFound" {
        return Error::SecretNotFound(name.to_string());
    }
    Error::secret_store(format!(
        "GetParameter {name} failed with status {status}: {code}: {}",
        if api_error.message.is_empty() {
            "no message"
        } else {
            &api_error.message
        }
    ))
}
