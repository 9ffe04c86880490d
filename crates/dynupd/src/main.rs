// # dynupd - Dyn-compatible dynamic DNS update daemon
//
// The daemon is a thin integration layer:
//
// 1. Read configuration from environment variables
// 2. Initialize the runtime and tracing
// 3. Wire the Route 53 zone authority and SSM credential store into
//    the reconciler
// 4. Serve the update endpoints until shutdown
//
// All update, retry, and protocol logic lives in dynup-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Service
// - `DYNUP_LISTEN_ADDR`: Listen address (default 0.0.0.0:8080)
// - `DYNUP_ZONE_NAME`: Managed zone, e.g. example.com
// - `DYNUP_RECORD_TTL`: TTL for upserted records in seconds (default 300)
// - `DYNUP_TRUST_FORWARDED`: Honor X-Forwarded-For (true/false, default false)
//
// ### Zone authority
// - `DYNUP_ZONE_ID`: Route 53 hosted zone id
// - `AWS_REGION`: Region for SSM (default us-east-1)
// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`: Signing credentials
// - `AWS_SESSION_TOKEN`: Optional session token
//
// ### Credentials
// - `DYNUP_USERNAME_PARAM`: SSM parameter holding the expected username
// - `DYNUP_PASSWORD_PARAM`: SSM parameter holding the expected password
// - `DYNUP_CREDENTIAL_CACHE_TTL_SECS`: Credential staleness bound (default 300)
//
// ### Retry
// - `DYNUP_MAX_ATTEMPTS`: Attempts per zone authority call
// - `DYNUP_RETRY_BASE_DELAY_MS`: First backoff delay
// - `DYNUP_RETRY_BUDGET_MS`: Total reconciliation budget
//
// ## Example
//
// ```bash
// export DYNUP_ZONE_NAME=example.com
// export DYNUP_ZONE_ID=Z0123456789ABCDEFGHIJ
// export DYNUP_USERNAME_PARAM=/dynup/username
// export DYNUP_PASSWORD_PARAM=/dynup/password
// export AWS_ACCESS_KEY_ID=AKIA...
// export AWS_SECRET_ACCESS_KEY=...
//
// dynupd
// ```

use anyhow::Result;
use dynup_aws_sign::AwsCredentials;
use dynup_core::config::{RetryConfig, ServiceConfig};
use dynup_core::traits::CredentialCache;
use dynup_core::{Reconciler, request};
use dynup_secrets_ssm::SsmParameterStore;
use dynup_zone_route53::Route53ZoneAuthority;
use dynupd::AppState;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DynupExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DynupExitCode> for ExitCode {
    fn from(code: DynupExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_addr: String,
    zone_name: String,
    hosted_zone_id: String,
    record_ttl: u32,
    username_param: String,
    password_param: String,
    credential_cache_ttl_secs: u64,
    max_attempts: Option<usize>,
    retry_base_delay_ms: Option<u64>,
    retry_budget_ms: Option<u64>,
    trust_forwarded: bool,
    aws_region: String,
    aws_access_key_id: String,
    aws_secret_access_key: String,
    aws_session_token: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env::var("DYNUP_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            zone_name: env::var("DYNUP_ZONE_NAME").unwrap_or_default(),
            hosted_zone_id: env::var("DYNUP_ZONE_ID").unwrap_or_default(),
            record_ttl: env::var("DYNUP_RECORD_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            username_param: env::var("DYNUP_USERNAME_PARAM").unwrap_or_default(),
            password_param: env::var("DYNUP_PASSWORD_PARAM").unwrap_or_default(),
            credential_cache_ttl_secs: env::var("DYNUP_CREDENTIAL_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            max_attempts: env::var("DYNUP_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok()),
            retry_base_delay_ms: env::var("DYNUP_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            retry_budget_ms: env::var("DYNUP_RETRY_BUDGET_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            trust_forwarded: env::var("DYNUP_TRUST_FORWARDED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            aws_session_token: env::var("AWS_SESSION_TOKEN").ok(),
            log_level: env::var("DYNUP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!(
                "DYNUP_LISTEN_ADDR '{}' is not a valid socket address. \
                Example: export DYNUP_LISTEN_ADDR=0.0.0.0:8080",
                self.listen_addr
            );
        }

        if self.zone_name.is_empty() {
            anyhow::bail!(
                "DYNUP_ZONE_NAME is required. \
                Set it via: export DYNUP_ZONE_NAME=example.com"
            );
        }
        if !request::is_valid_fqdn(&self.zone_name) {
            anyhow::bail!(
                "DYNUP_ZONE_NAME '{}' is not a valid domain name",
                self.zone_name
            );
        }

        if self.hosted_zone_id.is_empty() {
            anyhow::bail!(
                "DYNUP_ZONE_ID is required. \
                Set it via: export DYNUP_ZONE_ID=Z0123456789ABCDEFGHIJ"
            );
        }

        if self.username_param.is_empty() || self.password_param.is_empty() {
            anyhow::bail!(
                "DYNUP_USERNAME_PARAM and DYNUP_PASSWORD_PARAM are required. \
                Set them via: export DYNUP_USERNAME_PARAM=/dynup/username"
            );
        }

        if self.aws_access_key_id.is_empty() || self.aws_secret_access_key.is_empty() {
            anyhow::bail!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required \
                to sign Route 53 and SSM requests"
            );
        }

        if self.record_ttl == 0 {
            anyhow::bail!("DYNUP_RECORD_TTL must be > 0");
        }

        if let Some(attempts) = self.max_attempts
            && (attempts == 0 || attempts > 10)
        {
            anyhow::bail!("DYNUP_MAX_ATTEMPTS must be between 1 and 10. Got: {attempts}");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DYNUP_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// The reconciler configuration portion
    fn service_config(&self) -> ServiceConfig {
        let defaults = RetryConfig::default();
        ServiceConfig {
            zone_name: self.zone_name.clone(),
            record_ttl: self.record_ttl,
            username_secret: self.username_param.clone(),
            password_secret: self.password_param.clone(),
            credential_cache_ttl_secs: self.credential_cache_ttl_secs,
            retry: RetryConfig {
                max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
                base_delay_ms: self.retry_base_delay_ms.unwrap_or(defaults.base_delay_ms),
                total_budget_ms: self.retry_budget_ms.unwrap_or(defaults.total_budget_ms),
            },
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DynupExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DynupExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DynupExitCode::ConfigError.into();
    }

    info!("Starting dynupd");
    info!(
        "Managing zone {} (hosted zone {})",
        config.zone_name, config.hosted_zone_id
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DynupExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            DynupExitCode::RuntimeError
        } else {
            DynupExitCode::CleanShutdown
        }
    })
    .into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let aws_credentials = AwsCredentials {
        access_key_id: config.aws_access_key_id.clone(),
        secret_access_key: config.aws_secret_access_key.clone(),
        session_token: config.aws_session_token.clone(),
    };

    let authority = Arc::new(Route53ZoneAuthority::new(
        aws_credentials.clone(),
        config.hosted_zone_id.clone(),
    ));
    let store = Arc::new(SsmParameterStore::new(aws_credentials, &config.aws_region));
    let credentials = CredentialCache::new(
        store,
        config.username_param.clone(),
        config.password_param.clone(),
        Duration::from_secs(config.credential_cache_ttl_secs),
    );

    let reconciler = Reconciler::new(authority, credentials, config.service_config())?;
    let state = AppState {
        reconciler: Arc::new(reconciler),
        trust_forwarded: config.trust_forwarded,
    };

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    axum::serve(
        listener,
        dynupd::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown())
    .await?;

    info!("Shutting down");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGINT handler: {}", e);
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", received);
}

/// Wait for CTRL-C. Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for CTRL-C: {}", e);
    }
}
