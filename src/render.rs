//! Per-request browser lifecycle
//!
//! Every render walks `Idle → Acquiring → Loading → Capturing → Releasing →
//! Done`. A failure in acquiring, loading or capturing moves to `Error`, and
//! from there through `Releasing` when a process was started. The outcome
//! of the render is decided before release; a failing release is logged and
//! never replaces it.

use crate::session::RenderSession;
use crate::{EngineConfig, Error, Launcher, PdfOptions, Result};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Stage of a single render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Idle,
    Acquiring,
    Loading,
    Capturing,
    Releasing,
    Done,
    Error,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Idle => "idle",
            RenderStage::Acquiring => "acquiring",
            RenderStage::Loading => "loading",
            RenderStage::Capturing => "capturing",
            RenderStage::Releasing => "releasing",
            RenderStage::Done => "done",
            RenderStage::Error => "error",
        };
        f.write_str(name)
    }
}

struct StageLog {
    stage: RenderStage,
}

impl StageLog {
    fn new() -> Self {
        Self {
            stage: RenderStage::Idle,
        }
    }

    fn enter(&mut self, next: RenderStage) {
        debug!("render stage {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// Renders HTML to PDF with one fresh browser process per call
pub struct Renderer {
    launcher: Arc<dyn Launcher>,
    config: EngineConfig,
    pdf_options: PdfOptions,
    // None means unbounded
    admission: Option<Arc<Semaphore>>,
}

impl Renderer {
    pub fn new(launcher: Arc<dyn Launcher>, config: EngineConfig) -> Self {
        Self {
            launcher,
            config,
            pdf_options: PdfOptions::default(),
            admission: None,
        }
    }

    /// Queue renders beyond `limit` concurrent browser processes.
    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.admission = limit.map(|n| Arc::new(Semaphore::new(n)));
        self
    }

    /// Render `html` to PDF bytes.
    ///
    /// Empty input is rejected before any process is started.
    pub async fn render(&self, html: &str) -> Result<Vec<u8>> {
        if html.is_empty() {
            return Err(Error::InvalidInput("html must not be empty".into()));
        }

        let _permit = match &self.admission {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("Admission closed: {}", e)))?,
            ),
            None => None,
        };

        let started = Instant::now();
        let mut stages = StageLog::new();

        stages.enter(RenderStage::Acquiring);
        let session = match RenderSession::acquire(self.launcher.clone(), self.config.clone()).await {
            Ok(session) => session,
            Err(e) => {
                stages.enter(RenderStage::Error);
                error!("{} launch failed: {}", self.launcher.name(), e);
                stages.enter(RenderStage::Done);
                return Err(e);
            }
        };
        let id = session.id();

        let outcome = self.load_and_capture(&session, html, &mut stages).await;
        if let Err(e) = &outcome {
            stages.enter(RenderStage::Error);
            error!("session {}: render failed: {}", id, e);
        }

        stages.enter(RenderStage::Releasing);
        if let Err(e) = session.release().await {
            let e = match e {
                Error::Cleanup(_) => e,
                other => Error::Cleanup(other.to_string()),
            };
            warn!("session {}: {}", id, e);
        }
        stages.enter(RenderStage::Done);

        if let Ok(pdf) = &outcome {
            info!(
                "session {}: rendered {} bytes in {}ms",
                id,
                pdf.len(),
                started.elapsed().as_millis()
            );
        }
        outcome
    }

    async fn load_and_capture(
        &self,
        session: &RenderSession,
        html: &str,
        stages: &mut StageLog,
    ) -> Result<Vec<u8>> {
        stages.enter(RenderStage::Loading);
        session.load_html(html).await?;

        stages.enter(RenderStage::Capturing);
        session.print_pdf(&self.pdf_options).await
    }
}
