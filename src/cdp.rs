//! Chrome DevTools Protocol adapter implementation

use crate::idle::{IdleWatcher, LifecycleEvent};
use crate::{Engine, EngineConfig, Error, Launcher, PdfOptions, Provisioning, Result};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision, Tab};
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::{FulfillRequest, HeaderEntry};
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Synthetic address the document is served from. Requests to it never reach
/// the network; they are fulfilled from memory by the request interceptor.
pub const DOCUMENT_URL: &str = "http://document.pdf-render.invalid/";

// Chrome drops the DevTools connection after this much silence; it must
// outlast the longest load wait.
const IDLE_BROWSER_MARGIN: Duration = Duration::from_secs(30);

/// Launches one headless Chrome per call
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpLauncher;

impl CdpLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for CdpLauncher {
    fn launch(&self, config: &EngineConfig) -> Result<Box<dyn Engine>> {
        Ok(Box::new(CdpEngine::new(config.clone())?))
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

/// Locate the browser executable for a provisioning strategy.
///
/// `None` leaves the choice to `headless_chrome`, which downloads a managed
/// revision when the `fetch` feature is enabled.
pub fn resolve_executable(provisioning: &Provisioning) -> Result<Option<PathBuf>> {
    match provisioning {
        Provisioning::System => headless_chrome::browser::default_executable()
            .map(Some)
            .map_err(|e| Error::ProcessAcquisition(format!("No local Chrome installation found: {}", e))),
        Provisioning::Path(path) => Ok(Some(path.clone())),
        Provisioning::Managed => Ok(None),
    }
}

/// CDP-based engine (uses the `headless_chrome` crate)
///
/// Owns one Chrome process and a single tab. Dropping the engine kills the
/// process.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    frame_id: String,
    config: EngineConfig,
}

impl CdpEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let path = resolve_executable(&config.provisioning)?;
        let args: Vec<&OsStr> = config.args.iter().map(OsStr::new).collect();

        let mut builder = LaunchOptions::default_builder();
        builder
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some(config.window_size))
            .path(path)
            .args(args)
            .idle_browser_timeout(config.load_timeout().saturating_add(IDLE_BROWSER_MARGIN));

        #[cfg(feature = "fetch")]
        if config.provisioning == Provisioning::Managed {
            builder.fetcher_options(headless_chrome::browser::FetcherOptions::default());
        }

        let launch_options = builder
            .build()
            .map_err(|e| Error::ProcessAcquisition(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::ProcessAcquisition(format!("Failed to launch browser: {}", e)))?;

        // Reuse the page Chrome starts with so the process holds a single tab
        let tab = browser
            .wait_for_initial_tab()
            .map_err(|e| Error::ProcessAcquisition(format!("Failed to open tab: {}", e)))?;

        // The main frame shares its id with the page target
        let frame_id = tab.get_target_id().clone();
        debug!("chrome launched, pid {:?}, frame {}", browser.get_process_id(), frame_id);

        Ok(Self {
            browser,
            tab,
            frame_id,
            config,
        })
    }

    fn document_interceptor(html: &str) -> Arc<dyn RequestInterceptor + Send + Sync> {
        let body = base64::engine::general_purpose::STANDARD.encode(html.as_bytes());

        Arc::new(move |_transport, _session_id, event: RequestPausedEvent| {
            if event.params.request.url != DOCUMENT_URL {
                return RequestPausedDecision::Continue(None);
            }

            RequestPausedDecision::Fulfill(FulfillRequest {
                request_id: event.params.request_id.clone(),
                response_code: 200,
                response_headers: Some(vec![HeaderEntry {
                    name: "Content-Type".to_string(),
                    value: "text/html; charset=utf-8".to_string(),
                }]),
                binary_response_headers: None,
                body: Some(body.clone()),
                response_phrase: None,
            })
        })
    }
}

impl Engine for CdpEngine {
    fn load_html(&mut self, html: &str) -> Result<()> {
        self.tab
            .enable_fetch(None, Some(false))
            .map_err(|e| Error::Load(format!("Failed to enable fetch domain: {}", e)))?;
        self.tab
            .enable_request_interception(Self::document_interceptor(html))
            .map_err(|e| Error::Load(format!("Failed to enable request interception: {}", e)))?;

        // Subscribe before navigating so the new document's `init` is not missed
        let (tx, rx) = mpsc::channel();
        let listener = self
            .tab
            .add_event_listener(Arc::new(move |event: &Event| {
                if let Event::PageLifecycleEvent(lifecycle) = event {
                    let _ = tx.send(LifecycleEvent::new(
                        lifecycle.params.frame_id.clone(),
                        lifecycle.params.name.clone(),
                    ));
                }
            }))
            .map_err(|e| Error::Load(format!("Failed to subscribe to lifecycle events: {}", e)))?;

        let result = self
            .tab
            .navigate_to(DOCUMENT_URL)
            .map(|_| ())
            .map_err(|e| Error::Load(format!("Navigation failed: {}", e)))
            .and_then(|_| IdleWatcher::new(self.frame_id.clone()).wait(&rx, self.config.load_timeout()));

        if let Err(e) = self.tab.remove_event_listener(&listener) {
            warn!("Failed to remove lifecycle listener: {}", e);
        }

        result
    }

    fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>> {
        let (paper_width, paper_height) = options.format.dimensions();
        let (top, right, bottom, left) = options.margins.to_inches();

        let print_options = PrintToPdfOptions {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            paper_width: Some(paper_width),
            paper_height: Some(paper_height),
            margin_top: Some(top),
            margin_right: Some(right),
            margin_bottom: Some(bottom),
            margin_left: Some(left),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            ..Default::default()
        };

        let pdf = self
            .tab
            .print_to_pdf(Some(print_options))
            .map_err(|e| Error::Capture(format!("Print to PDF failed: {}", e)))?;

        if pdf.is_empty() {
            return Err(Error::Capture("Browser returned an empty document".into()));
        }
        Ok(pdf)
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the browser terminates the child process; drop the tab
        // first so no handle to the transport outlives it.
        let CdpEngine { browser, tab, .. } = *self;
        drop(tab);
        drop(browser);
        Ok(())
    }
}
