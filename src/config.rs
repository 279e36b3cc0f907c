use crate::services::{
    gcs_source::{GcsAuth, METADATA_TOKEN_URL},
    object_transfer::DEFAULT_CHUNK_SIZE,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};

const DEFAULT_API_SERVER_URL: &str = "http://my-release-openrelik-api:8710";
const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api_server_url: String,
    pub api_version: String,
    pub api_key: String,
    pub storage_endpoint: String,
    pub gcs_auth: GcsAuth,
    pub chunk_size: u64,
    pub connect_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cloud Storage notification bridge to OpenRelik")]
pub struct Args {
    /// Port to bind to (overrides PORT)
    pub port: Option<u16>,

    /// Host to bind to (overrides EVENTARC_GW_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// OpenRelik API server URL (overrides OPENRELIK_API_URL)
    #[arg(long)]
    pub api_server_url: Option<String>,

    /// OpenRelik API version (overrides OPENRELIK_API_VERSION)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Cloud Storage endpoint (overrides STORAGE_EMULATOR_HOST)
    #[arg(long)]
    pub storage_endpoint: Option<String>,

    /// Upload chunk size in bytes (overrides UPLOAD_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Outbound connect timeout in seconds (overrides OUTBOUND_CONNECT_TIMEOUT_SECS)
    #[arg(long)]
    pub connect_timeout: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_parts(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args` over the variables visible through `env`.
    pub fn from_parts(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_port = parse_env(&env, "PORT")?.unwrap_or(8080);
        let env_chunk = parse_env(&env, "UPLOAD_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        let env_timeout = parse_env(&env, "OUTBOUND_CONNECT_TIMEOUT_SECS")?.unwrap_or(10);

        let api_key = env("OPENRELIK_API_KEY")
            .filter(|key| !key.is_empty())
            .context("OPENRELIK_API_KEY must be set to a non-empty API key")?;

        let storage_endpoint = args
            .storage_endpoint
            .or_else(|| env("STORAGE_EMULATOR_HOST"))
            .unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.into());
        let gcs_auth = match env("GCS_ACCESS_TOKEN").filter(|token| !token.is_empty()) {
            Some(token) => GcsAuth::Static(token),
            None if storage_endpoint.trim_end_matches('/') != DEFAULT_STORAGE_ENDPOINT => {
                GcsAuth::Anonymous
            }
            None => GcsAuth::MetadataServer(METADATA_TOKEN_URL.into()),
        };

        let chunk_size = args.chunk_size.unwrap_or(env_chunk);
        if chunk_size == 0 {
            bail!("upload chunk size must be greater than zero");
        }

        Ok(Self {
            host: args
                .host
                .or_else(|| env("EVENTARC_GW_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.unwrap_or(env_port),
            api_server_url: args
                .api_server_url
                .or_else(|| env("OPENRELIK_API_URL"))
                .unwrap_or_else(|| DEFAULT_API_SERVER_URL.into()),
            api_version: args
                .api_version
                .or_else(|| env("OPENRELIK_API_VERSION"))
                .unwrap_or_else(|| "v1".into()),
            api_key,
            storage_endpoint,
            gcs_auth,
            chunk_size,
            connect_timeout: Duration::from_secs(args.connect_timeout.unwrap_or(env_timeout)),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_server_url", &self.api_server_url)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .field("storage_endpoint", &self.storage_endpoint)
            .field("gcs_auth", &self.gcs_auth)
            .field("chunk_size", &self.chunk_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}
