//! Instrumented launcher shared by the HTTP tests

#![allow(dead_code)]

use pdf_render_service::server::{self, AppState};
use pdf_render_service::{Engine, EngineConfig, Error, Launcher, PdfOptions, Renderer, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the fake browser should do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    FailLaunch,
    HangOnLoad,
    FailCapture,
    PanicOnCapture,
    FailClose,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counters {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MockLauncher {
    pub behavior: Behavior,
    pub counters: Arc<Counters>,
}

impl MockLauncher {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            counters: Arc::new(Counters::default()),
        }
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, config: &EngineConfig) -> Result<Box<dyn Engine>> {
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailLaunch {
            return Err(Error::ProcessAcquisition("Failed to launch browser: chrome not found".into()));
        }
        Ok(Box::new(MockEngine {
            behavior: self.behavior,
            counters: self.counters.clone(),
            load_timeout: config.load_timeout(),
            html: None,
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

struct MockEngine {
    behavior: Behavior,
    counters: Arc<Counters>,
    load_timeout: Duration,
    html: Option<String>,
}

impl Engine for MockEngine {
    fn load_html(&mut self, html: &str) -> Result<()> {
        if self.behavior == Behavior::HangOnLoad {
            std::thread::sleep(self.load_timeout);
            return Err(Error::LoadTimeout(self.load_timeout.as_millis() as u64));
        }
        self.html = Some(html.to_string());
        Ok(())
    }

    fn print_pdf(&mut self, _options: &PdfOptions) -> Result<Vec<u8>> {
        match self.behavior {
            Behavior::FailCapture => Err(Error::Capture("Print to PDF failed: target crashed".into())),
            Behavior::PanicOnCapture => panic!("renderer crashed"),
            _ => {
                // Echo the document so callers can tell responses apart
                let mut pdf = b"%PDF-1.7\n".to_vec();
                pdf.extend_from_slice(self.html.as_deref().unwrap_or_default().as_bytes());
                pdf.extend_from_slice(b"\n%%EOF\n");
                Ok(pdf)
            }
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailClose {
            return Err(Error::Cleanup("process already exited".into()));
        }
        Ok(())
    }
}

pub const TEST_BODY_LIMIT: usize = 64 * 1024;

/// Router wired to a mock launcher; returns the counters to assert on
pub fn app_with(behavior: Behavior) -> (axum::Router, Arc<Counters>) {
    let launcher = MockLauncher::new(behavior);
    let counters = launcher.counters.clone();
    let config = EngineConfig {
        load_timeout_ms: 100,
        ..Default::default()
    };
    let renderer = Renderer::new(Arc::new(launcher), config);
    (server::app(AppState::new(renderer), TEST_BODY_LIMIT), counters)
}
