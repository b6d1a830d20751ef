//! Access gate wrapping the HTTP surface.
//!
//! Exactly one strategy is active per deployment, chosen once at startup:
//! mutual TLS verified at the transport layer, or a shared-secret header
//! check in front of the router. Rejected requests never reach a handler.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::{
    Json,
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::service::TowerToHyperService;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{RootCertStore, ServerConfig};
use serde_json::json;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::GateConfig;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "x-gateway-secret";

/// Shared secrets shorter than this are refused at startup.
pub const MIN_SECRET_LEN: usize = 128;

/// The constructed gate. No per-request branching on configuration happens
/// beyond this one value.
pub enum AccessGate {
    MutualTls(TlsAcceptor),
    SharedSecret(Arc<str>),
}

impl AccessGate {
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        match config {
            GateConfig::SharedSecret { secret } => {
                if secret.len() < MIN_SECRET_LEN {
                    bail!(
                        "shared secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                        secret.len()
                    );
                }
                Ok(Self::SharedSecret(Arc::from(secret.as_str())))
            }
            GateConfig::MutualTls {
                ca_cert,
                server_cert,
                server_key,
            } => {
                let tls = build_tls_config(ca_cert, server_cert, server_key)?;
                Ok(Self::MutualTls(TlsAcceptor::from(Arc::new(tls))))
            }
        }
    }
}

/// Wrap the router with the shared-secret check.
pub fn apply_shared_secret(router: Router, secret: Arc<str>) -> Router {
    router.layer(middleware::from_fn_with_state(secret, require_shared_secret))
}

async fn require_shared_secret(
    State(secret): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if bool::from(presented.as_bytes().ct_eq(secret.as_bytes())) {
        next.run(request).await
    } else {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "status": 403, "message": "forbidden" })),
        )
            .into_response()
    }
}

/// Resolves when the process is asked to stop. Both serve paths drain
/// through this same signal.
pub async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, draining connections");
}

/// Serve the router behind the shared-secret check, draining open
/// connections on shutdown.
pub async fn serve_shared_secret(
    listener: TcpListener,
    secret: Arc<str>,
    app: Router,
) -> Result<()> {
    serve_shared_secret_until(listener, secret, app, shutdown_signal()).await
}

async fn serve_shared_secret_until(
    listener: TcpListener,
    secret: Arc<str>,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = apply_shared_secret(app, secret);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serve the router over mutual TLS with graceful shutdown.
///
/// Handshakes happen inside the per-connection task so a slow client cannot
/// stall the accept loop.
pub async fn serve_mutual_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let http = http.clone();
                let service = TowerToHyperService::new(app.clone());
                let watcher = graceful.watcher();

                tokio::spawn(async move {
                    let tls_stream = match acceptor.accept(stream).await {
                        Ok(tls) => tls,
                        Err(err) => {
                            // Includes clients that fail certificate
                            // verification.
                            debug!(peer_addr = %peer_addr, error = %err, "TLS handshake failed");
                            return;
                        }
                    };

                    let conn = http.serve_connection_with_upgrades(TokioIo::new(tls_stream), service);
                    let conn = watcher.watch(conn.into_owned());
                    if let Err(err) = conn.await {
                        error!(peer_addr = %peer_addr, error = %err, "connection error");
                    }
                });
            }

            () = &mut shutdown => break,
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");
    Ok(())
}

fn build_tls_config(ca_cert: &str, server_cert: &str, server_key: &str) -> Result<ServerConfig> {
    let ca_certs = certificates(decode_env_blob("CA_CERT", ca_cert)?)?;
    let mut roots = RootCertStore::empty();
    for cert in &ca_certs {
        roots
            .add(cert.clone())
            .context("CA certificate rejected by the root store")?;
    }

    let verifier = rustls::server::WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .context("building client certificate verifier")?;

    let mut chain = certificates(decode_env_blob("SERVER_CERT", server_cert)?)?;
    chain.extend(ca_certs);
    let key = private_key(decode_env_blob("SERVER_KEY", server_key)?)?;

    ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .context("invalid server certificate/key pair")
}

fn decode_env_blob(name: &str, value: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(value.trim())
        .with_context(|| format!("{name} is not valid base64"))
}

/// Accept either PEM or raw DER certificate material.
fn certificates(raw: Vec<u8>) -> Result<Vec<CertificateDer<'static>>> {
    if raw.starts_with(b"-----BEGIN") {
        rustls_pemfile::certs(&mut raw.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid PEM certificate")
    } else {
        Ok(vec![CertificateDer::from(raw)])
    }
}

fn private_key(raw: Vec<u8>) -> Result<PrivateKeyDer<'static>> {
    if raw.starts_with(b"-----BEGIN") {
        rustls_pemfile::private_key(&mut raw.as_slice())
            .context("unreadable PEM private key")?
            .context("no private key found in PEM data")
    } else {
        PrivateKeyDer::try_from(raw).map_err(|err| anyhow::anyhow!("invalid DER private key: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    fn long_secret() -> String {
        "s".repeat(MIN_SECRET_LEN)
    }

    fn gated_router(secret: &str) -> Router {
        let app = Router::new().route("/", get(|| async { "ok" }));
        apply_shared_secret(app, Arc::from(secret))
    }

    #[test]
    fn short_shared_secrets_are_refused() {
        let config = GateConfig::SharedSecret {
            secret: "too-short".into(),
        };
        assert!(AccessGate::from_config(&config).is_err());
    }

    #[test]
    fn garbage_certificates_are_refused() {
        let config = GateConfig::MutualTls {
            ca_cert: "not base64 at all!!".into(),
            server_cert: String::new(),
            server_key: String::new(),
        };
        assert!(AccessGate::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn matching_secret_passes_through() {
        let secret = long_secret();
        let request = HttpRequest::builder()
            .uri("/")
            .header(SECRET_HEADER, &secret)
            .body(Body::empty())
            .unwrap();

        let response = gated_router(&secret).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn shared_secret_server_drains_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let app = Router::new().route("/", get(|| async { "ok" }));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve_shared_secret_until(
            listener,
            Arc::from(long_secret().as_str()),
            app,
            async move {
                stop_rx.await.ok();
            },
        ));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn wrong_or_absent_secret_is_forbidden() {
        let secret = long_secret();

        let wrong = HttpRequest::builder()
            .uri("/")
            .header(SECRET_HEADER, "nope")
            .body(Body::empty())
            .unwrap();
        let response = gated_router(&secret).oneshot(wrong).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let absent = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        let response = gated_router(&secret).oneshot(absent).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
