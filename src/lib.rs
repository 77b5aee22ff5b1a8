//! PDF Render Service
//!
//! An HTTP microservice that accepts an HTML document and returns it rendered
//! as a PDF, using headless Chrome as the rendering backend.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives Chrome over the DevTools protocol
//! - **One process per request**: every render launches, uses and tears down
//!   its own browser, on success and on every failure path
//! - **Swappable provisioning**: system install, explicit path, or a managed
//!   download (`fetch` feature)
//!
//! # Example
//!
//! ```no_run
//! use pdf_render_service::{new_launcher, EngineConfig, Renderer};
//!
//! # async fn run() -> pdf_render_service::Result<()> {
//! let config = EngineConfig::default();
//! let renderer = Renderer::new(new_launcher(&config.provisioning)?, config);
//! let pdf = renderer.render("<html><body>hello</body></html>").await?;
//! assert!(pdf.starts_with(b"%PDF-"));
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
#[cfg(feature = "cdp")]
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod config;
pub mod idle;
pub mod render;
pub mod request;
pub mod routes;
pub mod server;
pub mod session;

pub use render::{RenderStage, Renderer};
pub use request::{GeneratePdfBody, RenderRequest, DEFAULT_FILENAME};
pub use session::RenderSession;

/// Chrome flags for restricted/containerized hosts: no OS sandbox, no GPU.
pub const DEFAULT_CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

/// How the browser executable is located
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Provisioning {
    /// Auto-detect a locally installed Chrome/Chromium
    #[default]
    System,
    /// Use the executable at this path
    Path(PathBuf),
    /// Download and cache a pinned Chromium revision (requires the `fetch` feature)
    Managed,
}

/// Configuration for one browser process
///
/// The defaults match the service contract: headless, sandboxless and a 30
/// second load timeout.
///
/// # Examples
///
/// ```
/// let cfg = pdf_render_service::EngineConfig::default();
/// assert_eq!(cfg.load_timeout_ms, 30000);
/// assert!(!cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where the browser executable comes from
    pub provisioning: Provisioning,
    /// Run without a visible window
    pub headless: bool,
    /// Keep Chrome's OS-level sandbox enabled
    pub sandbox: bool,
    /// Extra command-line flags passed to the browser
    pub args: Vec<String>,
    /// Window dimensions (affects layout width before printing)
    pub window_size: (u32, u32),
    /// Maximum time to wait for network idle after loading content
    pub load_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provisioning: Provisioning::default(),
            headless: true,
            sandbox: false,
            args: DEFAULT_CHROME_ARGS.iter().map(|s| s.to_string()).collect(),
            window_size: (1280, 720),
            load_timeout_ms: 30000,
        }
    }
}

impl EngineConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

/// Paper size for the printed document, in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaperFormat {
    A4,
}

impl PaperFormat {
    /// `(width, height)` in inches
    pub fn dimensions(&self) -> (f64, f64) {
        match *self {
            PaperFormat::A4 => (210.0 / 25.4, 297.0 / 25.4),
        }
    }
}

/// Page margins in CSS pixels (96 per inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub const PX_PER_INCH: f64 = 96.0;

    pub fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }

    /// `(top, right, bottom, left)` in inches
    pub fn to_inches(&self) -> (f64, f64, f64, f64) {
        (
            self.top / Self::PX_PER_INCH,
            self.right / Self::PX_PER_INCH,
            self.bottom / Self::PX_PER_INCH,
            self.left / Self::PX_PER_INCH,
        )
    }
}

/// Print settings passed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub format: PaperFormat,
    pub landscape: bool,
    pub print_background: bool,
    pub margins: Margins,
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            landscape: false,
            print_background: true,
            margins: Margins::uniform(20.0),
            prefer_css_page_size: false,
        }
    }
}

/// One running browser process with a single page
///
/// Implementations are created by a [`Launcher`] and live on the thread that
/// launched them; see [`RenderSession`] for the async wrapper.
pub trait Engine {
    /// Replace the page document with `html` and wait for network idle
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Print the current page to PDF bytes
    fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>>;

    /// Close the page and terminate the browser process
    fn close(self: Box<Self>) -> Result<()>;
}

/// Starts browser processes; shared by all requests
pub trait Launcher: Send + Sync {
    /// Start a new browser process with one open page
    fn launch(&self, config: &EngineConfig) -> Result<Box<dyn Engine>>;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "browser"
    }
}

/// Create the launcher for the given provisioning strategy
///
/// Resolution of the executable happens on each launch so a browser that is
/// installed after startup is still picked up.
#[cfg(feature = "cdp")]
pub fn new_launcher(provisioning: &Provisioning) -> Result<Arc<dyn Launcher>> {
    #[cfg(not(feature = "fetch"))]
    if *provisioning == Provisioning::Managed {
        return Err(Error::Config(
            "managed provisioning requires the `fetch` feature".into(),
        ));
    }
    if let Provisioning::Path(path) = provisioning {
        if !path.exists() {
            return Err(Error::Config(format!(
                "browser executable not found at {}",
                path.display()
            )));
        }
    }
    Ok(Arc::new(cdp::CdpLauncher::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.load_timeout(), Duration::from_secs(30));
        assert!(config.args.iter().any(|a| a == "--no-sandbox"));
        assert!(config.args.iter().any(|a| a == "--disable-gpu"));
        assert_eq!(config.provisioning, Provisioning::System);
    }

    #[test]
    fn test_a4_dimensions() {
        let (w, h) = PaperFormat::A4.dimensions();
        assert!((w - 8.27).abs() < 0.01);
        assert!((h - 11.69).abs() < 0.01);
    }

    #[test]
    fn test_default_pdf_options() {
        let opts = PdfOptions::default();
        assert_eq!(opts.format, PaperFormat::A4);
        assert!(opts.print_background);
        assert!(!opts.landscape);

        let (top, right, bottom, left) = opts.margins.to_inches();
        for m in [top, right, bottom, left] {
            assert!((m - 20.0 / 96.0).abs() < f64::EPSILON);
        }
    }

    #[cfg(all(feature = "cdp", not(feature = "fetch")))]
    #[test]
    fn test_managed_requires_fetch_feature() {
        let err = new_launcher(&Provisioning::Managed).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[cfg(feature = "cdp")]
    #[test]
    fn test_missing_explicit_path_is_config_error() {
        let path = PathBuf::from("/definitely/not/a/chrome");
        let err = new_launcher(&Provisioning::Path(path)).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
