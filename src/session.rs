use crate::{EngineConfig, Error, Launcher, PdfOptions, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

// Slack on top of the engine's own load timeout before the async side gives up
const LOAD_GRACE: Duration = Duration::from_secs(5);

// Longest a release waits for the worker to confirm the browser closed
const RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

enum Command {
    LoadHtml(String, oneshot::Sender<Result<()>>),
    PrintPdf(PdfOptions, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle to one browser process and its page, backed by a
/// dedicated worker thread.
///
/// The worker thread launches and owns the engine and executes commands sent
/// from async tasks, so request handlers suspend instead of blocking the
/// runtime while Chrome works. The process is terminated when [`release`]
/// is called, or when the handle is dropped without it: closing the command
/// channel makes the worker close the engine on its way out.
///
/// [`release`]: RenderSession::release
pub struct RenderSession {
    id: u64,
    cmd_tx: Option<Sender<Command>>,
    load_timeout: Duration,
    // Set when the async side gave up on a load the worker is still running
    abandoned: AtomicBool,
}

impl RenderSession {
    /// Launch a browser on a new worker thread.
    pub async fn acquire(launcher: Arc<dyn Launcher>, config: EngineConfig) -> Result<Self> {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let load_timeout = config.load_timeout();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name(format!("render-session-{}", id))
            .spawn(move || {
                // Initialize engine on the worker thread
                let mut engine = match launcher.launch(&config) {
                    Ok(e) => e,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };

                // The receiver is gone if the acquiring task was cancelled;
                // fall through and close right away in that case.
                if init_tx.send(Ok(())).is_err() {
                    if let Err(e) = engine.close() {
                        log::warn!("session {}: close after cancelled acquire failed: {}", id, e);
                    }
                    return;
                }

                // Command loop
                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::LoadHtml(html, resp) => {
                            let res = engine.load_html(&html);
                            let _ = resp.send(res);
                        }
                        Command::PrintPdf(options, resp) => {
                            let res = engine.print_pdf(&options);
                            let _ = resp.send(res);
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(engine.close());
                            return;
                        }
                    }
                }

                // Handle dropped without an explicit release
                log::debug!("session {}: handle dropped, closing browser", id);
                if let Err(e) = engine.close() {
                    log::warn!("session {}: close on drop failed: {}", id, e);
                }
            })
            .map_err(|e| Error::ProcessAcquisition(format!("Failed to spawn session worker: {}", e)))?;

        // Wait for the worker to report initialization success or failure
        init_rx
            .await
            .map_err(|_| Error::ProcessAcquisition("Session worker exited during launch".into()))??;

        Ok(Self {
            id,
            cmd_tx: Some(cmd_tx),
            load_timeout,
            abandoned: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Load `html` as the page document and wait for network idle.
    pub async fn load_html(&self, html: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::LoadHtml(html.to_string(), tx))?;

        let budget = self.load_timeout.saturating_add(LOAD_GRACE);
        match tokio::time::timeout(budget, rx).await {
            Ok(reply) => reply.map_err(|_| Error::Load("Session worker exited during load".into()))?,
            Err(_) => {
                self.abandoned.store(true, Ordering::SeqCst);
                Err(Error::LoadTimeout(self.load_timeout.as_millis() as u64))
            }
        }
    }

    /// Print the loaded page.
    pub async fn print_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::PrintPdf(options.clone(), tx))?;
        rx.await
            .map_err(|_| Error::Capture("Session worker exited during capture".into()))?
    }

    /// Close the page and terminate the browser process.
    ///
    /// Waits at most a few seconds for the worker. If it is still stuck in
    /// the engine, the command channel is dropped and the worker closes the
    /// browser as soon as the engine call returns.
    pub async fn release(mut self) -> Result<()> {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return Ok(());
        };
        if self.abandoned.load(Ordering::SeqCst) {
            drop(cmd_tx);
            return Err(Error::Cleanup(
                "Session worker still loading; browser closes when the load returns".into(),
            ));
        }

        let (tx, rx) = oneshot::channel();
        cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Cleanup("Session worker already exited".into()))?;
        drop(cmd_tx);

        match tokio::time::timeout(RELEASE_TIMEOUT, rx).await {
            Ok(reply) => reply
                .map_err(|_| Error::Cleanup("Session worker exited before confirming close".into()))?,
            Err(_) => Err(Error::Cleanup(format!(
                "Browser close not confirmed within {}s",
                RELEASE_TIMEOUT.as_secs()
            ))),
        }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .as_ref()
            .ok_or_else(|| Error::Other("Session already released".into()))?
            .send(cmd)
            .map_err(|_| Error::Other("Session worker is not running".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        closed: AtomicUsize,
    }

    struct FakeEngine(Arc<Counters>);

    impl Engine for FakeEngine {
        fn load_html(&mut self, _html: &str) -> Result<()> {
            Ok(())
        }

        fn print_pdf(&mut self, _options: &PdfOptions) -> Result<Vec<u8>> {
            Ok(b"%PDF-1.4 fake".to_vec())
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeLauncher(Arc<Counters>);

    impl Launcher for FakeLauncher {
        fn launch(&self, _config: &EngineConfig) -> Result<Box<dyn Engine>> {
            self.0.launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeEngine(self.0.clone())))
        }
    }

    async fn wait_for_close(counters: &Counters) {
        for _ in 0..100 {
            if counters.closed.load(Ordering::SeqCst) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_release_closes_engine_once() {
        let counters = Arc::new(Counters::default());
        let launcher = Arc::new(FakeLauncher(counters.clone()));

        let session = RenderSession::acquire(launcher, EngineConfig::default())
            .await
            .unwrap();
        session.load_html("<p>hi</p>").await.unwrap();
        let pdf = session.print_pdf(&PdfOptions::default()).await.unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        session.release().await.unwrap();

        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_without_release_still_closes() {
        let counters = Arc::new(Counters::default());
        let launcher = Arc::new(FakeLauncher(counters.clone()));

        let session = RenderSession::acquire(launcher, EngineConfig::default())
            .await
            .unwrap();
        drop(session);

        wait_for_close(&counters).await;
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    struct SlowCloseEngine;

    impl Engine for SlowCloseEngine {
        fn load_html(&mut self, _html: &str) -> Result<()> {
            Ok(())
        }

        fn print_pdf(&mut self, _options: &PdfOptions) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn close(self: Box<Self>) -> Result<()> {
            thread::sleep(Duration::from_secs(8));
            Ok(())
        }
    }

    struct SlowCloseLauncher;

    impl Launcher for SlowCloseLauncher {
        fn launch(&self, _config: &EngineConfig) -> Result<Box<dyn Engine>> {
            Ok(Box::new(SlowCloseEngine))
        }
    }

    #[tokio::test]
    async fn test_release_gives_up_on_slow_close() {
        let session = RenderSession::acquire(Arc::new(SlowCloseLauncher), EngineConfig::default())
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let err = session.release().await.unwrap_err();

        assert!(matches!(err, Error::Cleanup(_)));
        assert!(started.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_ids() {
        let counters = Arc::new(Counters::default());
        let launcher: Arc<dyn Launcher> = Arc::new(FakeLauncher(counters.clone()));

        let a = RenderSession::acquire(launcher.clone(), EngineConfig::default())
            .await
            .unwrap();
        let b = RenderSession::acquire(launcher, EngineConfig::default())
            .await
            .unwrap();
        assert_ne!(a.id(), b.id());

        a.release().await.unwrap();
        b.release().await.unwrap();
        assert_eq!(counters.closed.load(Ordering::SeqCst), 2);
    }
}
