use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt};

/// Centralized application configuration.
/// Read once at process start and treated as immutable from then on; the
/// backend client and the access gate are constructed from it and injected
/// explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket_name: String,
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub article_prefix: String,
    pub gate: GateConfig,
}

/// Which access gate to construct. Selected by the `USE_SHARED_SECRET`
/// flag; exactly one strategy is active per deployment.
#[derive(Clone)]
pub enum GateConfig {
    /// Base64-encoded certificate material from the environment.
    MutualTls {
        ca_cert: String,
        server_cert: String,
        server_key: String,
    },
    SharedSecret {
        secret: String,
    },
}

// Keep secrets and key material out of startup logs.
impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateConfig::MutualTls { .. } => f.write_str("MutualTls"),
            GateConfig::SharedSecret { secret } => {
                write!(f, "SharedSecret(length={})", secret.len())
            }
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP gateway for an S3-compatible bucket")]
pub struct Args {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into an AppConfig.
    ///
    /// AWS credentials are deliberately not read here; the SDK's default
    /// credential chain picks them up from the same environment.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_env(args)
    }

    fn from_env(args: Args) -> Result<Self> {
        let env_host = env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("GATEWAY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GATEWAY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading GATEWAY_PORT"),
        };

        let bucket_name = env::var("BUCKET_NAME").context("BUCKET_NAME must be set")?;
        let endpoint_url = env::var("AWS_ENDPOINT_URL_S3").ok();
        let region = env::var("AWS_REGION").ok();
        let article_prefix = env::var("ARTICLE_PREFIX").unwrap_or_else(|_| "/Articles".into());

        let use_shared_secret = env::var("USE_SHARED_SECRET")
            .map(|value| value == "true")
            .unwrap_or(false);
        let gate = if use_shared_secret {
            GateConfig::SharedSecret {
                secret: env::var("SHARED_SECRET")
                    .context("SHARED_SECRET must be set when USE_SHARED_SECRET=true")?,
            }
        } else {
            GateConfig::MutualTls {
                ca_cert: env::var("CA_CERT").context("CA_CERT must be set for mutual TLS")?,
                server_cert: env::var("SERVER_CERT")
                    .context("SERVER_CERT must be set for mutual TLS")?,
                server_key: env::var("SERVER_KEY")
                    .context("SERVER_KEY must be set for mutual TLS")?,
            }
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            bucket_name,
            endpoint_url,
            region,
            article_prefix,
            gate,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
