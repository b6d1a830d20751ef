use std::{io::ErrorKind, sync::Arc};

use anyhow::Result;
use aws_config::BehaviorVersion;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod gate;
mod handlers;
mod models;
mod routes;
mod services;

use gate::AccessGate;
use services::backend_service::{GatewayState, S3Backend};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting object-gateway with config: {:?}", cfg);

    // Construct the gate before touching the network so a bad secret or
    // unreadable certificate fails fast.
    let access_gate = AccessGate::from_config(&cfg.gate)?;

    // --- Initialize the S3 client ---
    // Credentials come from the SDK's default chain (env vars, profile);
    // endpoint and region are ours to override.
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = cfg.region.clone() {
        loader = loader.region(aws_sdk_s3::config::Region::new(region));
    }
    if let Some(endpoint) = cfg.endpoint_url.clone() {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    let client = aws_sdk_s3::Client::new(&sdk_config);

    // --- Initialize core state ---
    let state = GatewayState {
        backend: Arc::new(S3Backend::new(client, cfg.bucket_name.clone())),
        article_prefix: Arc::from(cfg.article_prefix.as_str()),
        started: Arc::from(handlers::http_time_string(&chrono::Utc::now()).as_str()),
    };

    // --- Build router ---
    let app = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on {}", listener.local_addr()?);

    match access_gate {
        AccessGate::SharedSecret(secret) => {
            gate::serve_shared_secret(listener, secret, app).await?;
        }
        AccessGate::MutualTls(acceptor) => {
            gate::serve_mutual_tls(listener, acceptor, app).await?;
        }
    }

    Ok(())
}
