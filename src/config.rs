//! Process configuration, from command-line flags or environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::connection::ConnectionDescriptor;
use crate::error::ImportResult;

/// Upload server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "tabular-uploader")]
#[command(about = "Load uploaded CSV, JSON, and spreadsheet files into PostgreSQL tables")]
#[command(version)]
pub struct ServerConfig {
    /// Host address to bind to
    #[arg(long, env = "UPLOADER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number to bind to
    #[arg(long, env = "UPLOADER_PORT", default_value = "8000")]
    pub port: u16,

    /// Base database URI; per-request `database`, `user`, and `password` override its fields
    #[arg(long, env = "DATABASE_URI", hide_env_values = true)]
    pub database_uri: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "UPLOADER_POOL_SIZE", default_value = "10")]
    pub pool_size: usize,

    /// Pooled connections idle longer than this many seconds are closed
    #[arg(long, env = "UPLOADER_POOL_IDLE_SECS", default_value = "300")]
    pub pool_idle_secs: u64,

    /// Maximum upload size in megabytes
    #[arg(long, env = "UPLOADER_UPLOAD_LIMIT_MB", default_value = "50")]
    pub upload_limit_mb: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "UPLOADER_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn base_descriptor(&self) -> ImportResult<ConnectionDescriptor> {
        let descriptor = ConnectionDescriptor::parse(&self.database_uri)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn pool_idle(&self) -> Duration {
        Duration::from_secs(self.pool_idle_secs)
    }

    pub fn upload_limit_bytes(&self) -> usize {
        self.upload_limit_mb * 1024 * 1024
    }
}
