//! Server configuration, read from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use tasky_core::task::TASKS_FILE_NAME;

const DEFAULT_DATA_DIR: &str = "_data";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";

/// Origins allowed to call the API from a browser
#[derive(Debug, Clone, PartialEq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Result<Self> {
        if raw.trim() == "*" {
            return Ok(Self::Any);
        }
        let origins = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin: {:?}", origin))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::List(origins))
    }

    pub fn layer(&self) -> CorsLayer {
        let allow_origin = match self {
            Self::Any => AllowOrigin::any(),
            Self::List(origins) => AllowOrigin::list(origins.iter().cloned()),
        };
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origins: CorsOrigins,
}

impl Config {
    /// Build the configuration from the process environment
    ///
    /// - `TASKY_DATA_DIR`: directory holding the task file (default `_data`)
    /// - `TASKY_HOST` / `TASKY_PORT`: listen address (default `0.0.0.0:8000`)
    /// - `TASKY_CORS_ORIGINS`: comma separated origins, or `*`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = lookup("TASKY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let host = match lookup("TASKY_HOST") {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid TASKY_HOST: {:?}", raw))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match lookup("TASKY_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid TASKY_PORT: {:?}", raw))?,
            None => DEFAULT_PORT,
        };

        let cors_origins = CorsOrigins::parse(
            &lookup("TASKY_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        )?;

        Ok(Self {
            data_dir,
            host,
            port,
            cors_origins,
        })
    }

    /// Path of the task file inside the data directory
    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE_NAME)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
