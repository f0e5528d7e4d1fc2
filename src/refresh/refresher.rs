//! Timer-driven background refresher
//!
//! A [`Refresher`] periodically pulls a bulk dataset from a [`Source`],
//! passes it through the configured middleware chain and applies it to a
//! [`Sink`]. The loop serializes work: shutdown is checked before, not
//! during, a fetch+apply cycle, so an in-flight cycle always finishes but no
//! further cycle starts once stopped.

use crate::error::{FlowError, Result};
use crate::refresh::middleware::{compose, Middleware};
use crate::refresh::source::{source_fetch, Dataset, FetchFn, Sink, Source};
use chrono::{DateTime, Utc};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Callback invoked with the fetched dataset after a successful cycle
pub type SuccessHandler<K, V> = Arc<dyn Fn(&Dataset<K, V>) + Send + Sync>;

/// Callback invoked with the error after a failed cycle
pub type ErrorHandler = Arc<dyn Fn(&FlowError) + Send + Sync>;

/// Observability snapshot of the refresher
#[derive(Debug, Clone, Default)]
pub struct RefreshStatus {
    /// Time of the last successful cycle
    pub last_success: Option<DateTime<Utc>>,

    /// Error of the most recent failed cycle; cleared by the next success
    pub last_error: Option<FlowError>,
}

/// Handle to the running loop task
struct LoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Periodic source-to-sink refresher with middleware and lifecycle control
pub struct Refresher<K, V> {
    source: Arc<dyn Source<Dataset<K, V>>>,
    sink: Arc<dyn Sink<K, V>>,
    interval: Duration,
    middlewares: Vec<Middleware<Dataset<K, V>>>,
    on_success: Option<SuccessHandler<K, V>>,
    on_error: Option<ErrorHandler>,
    status: Arc<RwLock<RefreshStatus>>,
    runtime: Option<LoopHandle>,
}

impl<K, V> Refresher<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an idle refresher
    pub fn new<S, D>(source: S, sink: D, interval: Duration) -> Self
    where
        S: Source<Dataset<K, V>> + 'static,
        D: Sink<K, V> + 'static,
    {
        Self {
            source: Arc::new(source),
            sink: Arc::new(sink),
            interval,
            middlewares: Vec::new(),
            on_success: None,
            on_error: None,
            status: Arc::new(RwLock::new(RefreshStatus::default())),
            runtime: None,
        }
    }

    /// Append fetch middleware
    ///
    /// Middlewares wrap the fetch in registration order: the first one added
    /// is the outermost call.
    pub fn with_middleware(mut self, middleware: Middleware<Dataset<K, V>>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Set the success callback
    ///
    /// Callback failures are terminal side effects; they never feed back
    /// into the refresher's error state.
    pub fn with_success_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Dataset<K, V>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(handler));
        self
    }

    /// Set the error callback
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&FlowError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Start the background loop
    ///
    /// Returns immediately; the first refresh fires only after one full
    /// interval has elapsed. Starting an already-running refresher is a
    /// no-op.
    pub fn start(&mut self) {
        if self.runtime.is_some() {
            warn!("refresher already running, start ignored");
            return;
        }

        let worker = self.worker();
        self.spawn_loop(worker);
    }

    /// Perform one synchronous cycle, then start the background loop
    ///
    /// On failure the error is returned and the loop is never started.
    pub async fn start_sync(&mut self) -> Result<()> {
        if self.runtime.is_some() {
            warn!("refresher already running, start_sync ignored");
            return Ok(());
        }

        let worker = self.worker();
        worker.run_cycle().await?;

        self.spawn_loop(worker);
        Ok(())
    }

    /// Stop the background loop
    ///
    /// Blocks until the loop task has fully exited: after this returns no
    /// refresh is mid-flight and no further cycle will start.
    pub async fn stop(&mut self) {
        let Some(handle) = self.runtime.take() else {
            return;
        };

        let _ = handle.shutdown.send(true);
        if let Err(err) = handle.task.await {
            warn!(error = %err, "refresh loop task terminated abnormally");
        }
        info!("refresher stopped");
    }

    /// Whether the background loop is currently running
    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Time of the last successful cycle
    pub async fn last_success(&self) -> Option<DateTime<Utc>> {
        self.status.read().await.last_success
    }

    /// Error of the most recent failed cycle, if the latest cycle failed
    pub async fn last_error(&self) -> Option<FlowError> {
        self.status.read().await.last_error.clone()
    }

    /// Full observability snapshot
    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    /// Build the per-cycle worker, composing the middleware chain around the
    /// source fetch
    fn worker(&self) -> CycleWorker<K, V> {
        let base = source_fetch(Arc::clone(&self.source));
        let fetch = compose(base, &self.middlewares);

        CycleWorker {
            fetch,
            sink: Arc::clone(&self.sink),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            status: Arc::clone(&self.status),
        }
    }

    fn spawn_loop(&mut self, worker: CycleWorker<K, V>) {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(worker, rx, self.interval));

        info!(interval = ?self.interval, "refresher started");
        self.runtime = Some(LoopHandle { shutdown, task });
    }
}

/// The main refresh loop
///
/// Ticks are serialized; a tick that falls due while a cycle is still
/// running is delayed, never run concurrently. The shutdown arm also fires
/// when the sender is dropped, so an abandoned refresher cleans up its own
/// loop task.
async fn run_loop<K, V>(
    worker: CycleWorker<K, V>,
    mut shutdown: watch::Receiver<bool>,
    interval: Duration,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                debug!("refresh loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                // Cycle outcome is recorded in status; the loop itself
                // continues regardless.
                let _ = worker.run_cycle().await;
            }
        }
    }
}

/// Everything one fetch+apply cycle needs, shared with the loop task
struct CycleWorker<K, V> {
    fetch: FetchFn<Dataset<K, V>>,
    sink: Arc<dyn Sink<K, V>>,
    on_success: Option<SuccessHandler<K, V>>,
    on_error: Option<ErrorHandler>,
    status: Arc<RwLock<RefreshStatus>>,
}

impl<K, V> CycleWorker<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Run one fetch+apply cycle
    ///
    /// Exactly one of "last success updated, last error cleared" or "last
    /// error recorded" happens per cycle, and the corresponding callback
    /// (if configured) is invoked.
    async fn run_cycle(&self) -> Result<()> {
        let data = match (self.fetch)().await {
            Ok(data) => data,
            Err(err) => {
                self.record_error(&err).await;
                return Err(err);
            }
        };

        if let Err(err) = self.sink.apply(data.clone()).await {
            self.record_error(&err).await;
            return Err(err);
        }

        self.record_success().await;
        if let Some(on_success) = &self.on_success {
            on_success(&data);
        }
        Ok(())
    }

    async fn record_success(&self) {
        let mut status = self.status.write().await;
        status.last_success = Some(Utc::now());
        status.last_error = None;
        debug!("refresh cycle succeeded");
    }

    async fn record_error(&self, err: &FlowError) {
        {
            let mut status = self.status.write().await;
            status.last_error = Some(err.clone());
        }
        warn!(error = %err, "refresh cycle failed");

        if let Some(on_error) = &self.on_error {
            on_error(err);
        }
    }
}
