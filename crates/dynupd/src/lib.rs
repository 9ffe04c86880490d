// # dynupd HTTP surface
//
// Thin protocol adapter between axum and the reconciler:
//
// 1. Recognize the update endpoints (`/nic/update`, `/v3/update`)
// 2. Decode Basic credentials and the query parameters
// 3. Resolve the target addresses (explicit params or the observed
//    client address)
// 4. Hand one `UpdateRequest` to the reconciler, render the outcome
//    as the single-line wire response
//
// No DNS or retry logic lives here; that is dynup-core's job.

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use dynup_core::protocol::{self, IGNORED_LEGACY_PARAMS, WireResponse};
use dynup_core::{Reconciler, UpdateRequest, extract};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared request-handling state
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    /// Honor `X-Forwarded-For` for the observed client address. Enable
    /// only behind a proxy that sets the header itself.
    pub trust_forwarded: bool,
}

/// Build the service router. Both update paths run the same handler;
/// everything else answers `badagent`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nic/update", get(handle_update))
        .route("/v3/update", get(handle_update))
        .fallback(unknown_path)
        .with_state(state)
}

async fn handle_update(State(state): State<AppState>, request: Request<Body>) -> Response {
    let credentials = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(protocol::parse_basic_auth)
    {
        Some(creds) => creds,
        None => {
            debug!("Missing or undecodable authorization header");
            return wire_response(protocol::bad_auth());
        }
    };

    let params: Vec<(String, String)> = request
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    for (name, value) in &params {
        if IGNORED_LEGACY_PARAMS.contains(&name.as_str()) {
            debug!(param = %name, value = %value, "Ignoring legacy protocol parameter");
        }
    }

    let Some(hostname) = param(&params, "hostname") else {
        debug!("Update request without a hostname parameter");
        return wire_response(protocol::not_fqdn());
    };

    let observed = observed_address(&state, &request);
    let targets = match extract::resolve_targets(
        param(&params, "myip"),
        param(&params, "myipv6"),
        observed,
    ) {
        Ok(targets) => targets,
        Err(e) => {
            debug!(hostname, "Unresolvable target address: {e}");
            return wire_response(protocol::not_fqdn());
        }
    };

    let update = UpdateRequest {
        hostname: hostname.to_string(),
        targets,
        credentials,
    };
    let outcome = state.reconciler.reconcile(&update).await;
    info!(hostname, outcome = ?outcome, "Update handled");
    wire_response(protocol::render(&outcome))
}

async fn unknown_path(request: Request<Body>) -> Response {
    debug!(path = %request.uri().path(), "Unrecognized request path");
    wire_response(protocol::bad_agent())
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// The client address as observed by the server: the first
/// `X-Forwarded-For` entry when forwarding is trusted, the peer address
/// otherwise.
fn observed_address(state: &AppState, request: &Request<Body>) -> Option<IpAddr> {
    if state.trust_forwarded {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
        warn!("Forwarding trusted but no parseable X-Forwarded-For header");
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn wire_response(wire: WireResponse) -> Response {
    let status = StatusCode::from_u16(wire.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "text/plain")], wire.body).into_response()
}
