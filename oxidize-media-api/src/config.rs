//! Server configuration from flags and environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use oxidize_media::params::DEFAULT_MAX_DIMENSION;
use oxidize_media::TempConfig;

/// Default request body limit: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Command-line arguments for the API server
#[derive(Debug, Parser)]
#[command(name = "oxidize-media-api")]
#[command(about = "HTTP API for image and PDF transformations", long_about = None)]
#[command(version)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "OXIDIZE_MEDIA_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Shared secret expected in the x-api-key header
    #[arg(long, env = "API_SECRET_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory used to stage temporary files
    #[arg(long, env = "OXIDIZE_MEDIA_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, env = "OXIDIZE_MEDIA_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Largest width or height accepted by resize
    #[arg(long, env = "OXIDIZE_MEDIA_MAX_DIMENSION", default_value_t = DEFAULT_MAX_DIMENSION)]
    pub max_dimension: u32,

    /// Seconds between temp directory sweeps (0 disables the sweeper)
    #[arg(long, env = "OXIDIZE_MEDIA_SWEEP_INTERVAL_SECS", default_value_t = 600)]
    pub sweep_interval_secs: u64,

    /// Age in seconds after which a staged file is swept
    #[arg(long, env = "OXIDIZE_MEDIA_SWEEP_MAX_AGE_SECS", default_value_t = 3600)]
    pub sweep_max_age_secs: u64,
}

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// `None` rejects every `/api` request.
    pub api_key: Option<String>,
    pub temp: TempConfig,
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
    /// `None` disables the background sweeper.
    pub sweep_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            api_key: None,
            temp: TempConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            sweep_interval: Some(Duration::from_secs(600)),
        }
    }
}

impl ServerConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_temp_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.temp.directory = directory.into();
        self
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        let mut temp = TempConfig::default();
        if let Some(directory) = args.temp_dir {
            temp.directory = directory;
        }
        temp.max_age = Duration::from_secs(args.sweep_max_age_secs);

        Self {
            bind: args.bind,
            api_key: args.api_key.filter(|key| !key.trim().is_empty()),
            temp,
            max_upload_bytes: args.max_upload_bytes,
            max_dimension: args.max_dimension,
            sweep_interval: (args.sweep_interval_secs > 0)
                .then(|| Duration::from_secs(args.sweep_interval_secs)),
        }
    }
}
