//! Service configuration
//!
//! Flags fall back to environment variables, so a bare `PORT=8080` is enough
//! in a container. Every default reproduces the documented service contract.

use crate::{EngineConfig, Error, Provisioning, Result};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProvisioningKind {
    /// Locally installed Chrome/Chromium
    System,
    /// Executable given by --chrome-path
    Path,
    /// Downloaded Chromium revision (needs the `fetch` feature)
    Managed,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "pdf-render-service", version, about = "Render HTML to PDF over HTTP")]
pub struct ServiceConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// How the browser executable is found
    #[arg(long, env = "BROWSER_PROVISIONING", value_enum, default_value_t = ProvisioningKind::System)]
    pub provisioning: ProvisioningKind,

    /// Browser executable; required with `--provisioning path`
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Seconds to wait for the page to reach network idle
    #[arg(long, env = "LOAD_TIMEOUT_SECS", default_value_t = 30)]
    pub load_timeout_secs: u64,

    /// Largest accepted request body, in MiB
    #[arg(long, env = "BODY_LIMIT_MB", default_value_t = 50)]
    pub body_limit_mb: usize,

    /// Queue renders beyond this many concurrent browsers (unbounded if unset)
    #[arg(long, env = "MAX_CONCURRENT_RENDERS")]
    pub max_concurrent_renders: Option<usize>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            provisioning: ProvisioningKind::System,
            chrome_path: None,
            load_timeout_secs: 30,
            body_limit_mb: 50,
            max_concurrent_renders: None,
        }
    }
}

impl ServiceConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb.saturating_mul(1024 * 1024)
    }

    pub fn provisioning(&self) -> Result<Provisioning> {
        match (self.provisioning, &self.chrome_path) {
            (ProvisioningKind::Path, None) => Err(Error::Config(
                "--provisioning path requires --chrome-path (or CHROME_PATH)".into(),
            )),
            // An explicit path also wins over auto-detection
            (ProvisioningKind::Path | ProvisioningKind::System, Some(path)) => {
                Ok(Provisioning::Path(path.clone()))
            }
            (ProvisioningKind::System, None) => Ok(Provisioning::System),
            (ProvisioningKind::Managed, _) => Ok(Provisioning::Managed),
        }
    }

    /// Build the per-process engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        if self.load_timeout_secs == 0 {
            return Err(Error::Config("load timeout must be at least one second".into()));
        }
        if self.max_concurrent_renders == Some(0) {
            return Err(Error::Config("max concurrent renders must be positive".into()));
        }
        if self.body_limit_mb == 0 {
            return Err(Error::Config("body limit must be positive".into()));
        }
        let load_timeout_ms = self
            .load_timeout_secs
            .checked_mul(1000)
            .ok_or_else(|| Error::Config(format!("load timeout of {}s is too large", self.load_timeout_secs)))?;

        Ok(EngineConfig {
            provisioning: self.provisioning()?,
            load_timeout_ms,
            ..Default::default()
        })
    }
}
