//! Sniper Controller
//!
//! Owns the pipeline: stream connection, classifier, candidate cache, filter
//! config, hourly quota and metrics. Classification runs on the connection
//! task in arrival order; each new candidate is enriched on its own task with
//! the metadata and safety lookups running concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock as StdRwLock};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::adapters::stream::{
    ConnectionState, StreamConnectionManager, StreamHandler, StreamManagerConfig,
};
use crate::domain::candidate::{Candidate, SafetyFlags, TokenMetadata};
use crate::domain::candidate_cache::CandidateCache;
use crate::domain::classifier::TransactionClassifier;
use crate::domain::filter::FilterPipeline;
use crate::domain::metrics::{MetricsRecorder, PerformanceMetrics};
use crate::domain::quota::HourlyQuotaCounter;
use crate::domain::sniper_config::{SniperConfig, SniperConfigError, SniperConfigUpdate};
use crate::ports::observer::SniperObserver;
use crate::ports::stream::{StreamConnector, StreamError};
use crate::ports::token_data::{Timed, TokenDataPort};

#[derive(Debug, Error)]
pub enum SniperError {
    #[error("Invalid sniper configuration: {0}")]
    InvalidConfig(#[from] SniperConfigError),

    #[error("No stream connector installed, call init() first")]
    NotInitialized,

    #[error("Operation not allowed while running")]
    AlreadyRunning,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Stopping,
}

/// Everything the controller needs besides its collaborators
#[derive(Debug, Clone, Default)]
pub struct SniperSettings {
    pub stream: StreamManagerConfig,
    pub sniper: SniperConfig,
    /// Restrict pool-creation detection to these program ids
    pub pool_programs: Option<Vec<String>>,
}

/// Shared pipeline state, reachable from the connection task and from
/// enrichment tasks.
struct Pipeline {
    classifier: TransactionClassifier,
    cache: CandidateCache,
    metrics: MetricsRecorder,
    filter: FilterPipeline,
    config: StdRwLock<SniperConfig>,
    quota: AsyncMutex<HourlyQuotaCounter>,
    token_data: Arc<dyn TokenDataPort>,
    observer: Arc<dyn SniperObserver>,
    tasks: Mutex<JoinSet<()>>,
    active: AtomicBool,
}

impl Pipeline {
    fn config_snapshot(&self) -> SniperConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_config(&self, next: SniperConfig) {
        match self.config.write() {
            Ok(mut config) => *config = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    fn record_exchange_time<T>(&self, timed: Timed<T>) -> T {
        if let Some(elapsed) = timed.exchange_time {
            self.metrics.record_api_response_time(elapsed);
        }
        timed.value
    }

    async fn timed_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        let timed = self.token_data.fetch_metadata_timed(mint).await;
        self.record_exchange_time(timed)
    }

    async fn timed_safety(&self, mint: &str) -> SafetyFlags {
        let timed = self.token_data.verify_safety_timed(mint).await;
        self.record_exchange_time(timed)
    }

    /// Enrich, filter and report one candidate
    async fn process_candidate(&self, mut candidate: Candidate, detected_at: Instant) {
        let mint = candidate.mint_address.clone();

        let (metadata, safety) = tokio::join!(self.timed_metadata(&mint), self.timed_safety(&mint));

        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        let Some(metadata) = metadata else {
            self.metrics.record_failure();
            debug!(mint = %mint, "Dropping candidate without metadata");
            return;
        };

        if let Err(e) = candidate.enrich(Some(metadata), safety) {
            error!(error = %e, "Candidate enrichment rejected");
            return;
        }

        let decision = {
            let mut quota = self.quota.lock().await;
            if !self.active.load(Ordering::SeqCst) {
                return;
            }
            // Snapshot taken under the quota lock: the config in effect now
            let config = self.config_snapshot();
            self.filter.evaluate(&candidate, &config, &mut quota)
        };

        if let Err(e) = decision.apply(&mut candidate) {
            error!(error = %e, "Candidate verdict rejected");
            return;
        }

        let elapsed = detected_at.elapsed();
        if decision.pass() {
            self.metrics.record_success(elapsed);
            info!(
                mint = %candidate.mint_address,
                source = %candidate.source_type,
                symbol = candidate.symbol().unwrap_or_default(),
                elapsed_ms = elapsed.as_millis() as u64,
                "New token detected"
            );
            self.observer.on_new_token_detected(&candidate);
        } else {
            self.metrics.record_filtered(elapsed);
            debug!(
                mint = %candidate.mint_address,
                reason = candidate.filter_reason().unwrap_or_default(),
                "Candidate filtered"
            );
            self.observer.on_candidate_filtered(&candidate);
        }
    }

    /// Abort every in-flight enrichment and wait for the tasks to finish
    async fn abandon_in_flight(&self) {
        self.active.store(false, Ordering::SeqCst);

        let mut tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let in_flight = tasks.len();
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        if in_flight > 0 {
            info!(in_flight, "Abandoned in-flight enrichment");
        }
    }
}

/// Stream callbacks bound to the pipeline
struct PipelineHandler {
    pipeline: Arc<Pipeline>,
}

impl StreamHandler for PipelineHandler {
    fn on_transaction(&self, payload: &str) {
        let classification = self.pipeline.classifier.classify_encoded(payload);
        let Some((mint, source)) = classification.candidate() else {
            return;
        };

        let detected_at = Instant::now();
        self.pipeline.metrics.record_detection(source);

        if !self.pipeline.cache.mark_seen(&mint) {
            self.pipeline.metrics.record_duplicate();
            debug!(mint = %mint, "Duplicate candidate dropped");
            return;
        }

        self.pipeline.metrics.record_attempt();
        debug!(mint = %mint, source = %source, "New candidate");

        let candidate = Candidate::new(mint, source);
        let pipeline = Arc::clone(&self.pipeline);

        let mut tasks = match self.pipeline.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Reap finished tasks so the set only holds in-flight work
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            pipeline.process_candidate(candidate, detected_at).await;
        });
    }

    fn on_connected(&self) {
        self.pipeline.observer.on_connected();
    }

    fn on_disconnected(&self) {
        self.pipeline.observer.on_disconnected();
    }

    fn on_fatal(&self, error: &StreamError) {
        self.pipeline.observer.on_error(&error.to_string());
    }
}

struct RunningStream {
    manager: Arc<StreamConnectionManager>,
    task: JoinHandle<()>,
}

/// Token launch sniper: lifecycle, live config and metrics
pub struct SniperController {
    stream_config: StreamManagerConfig,
    pipeline: Arc<Pipeline>,
    connector: Mutex<Option<Arc<dyn StreamConnector>>>,
    state: Arc<RwLock<ControllerState>>,
    running: AsyncMutex<Option<RunningStream>>,
}

impl SniperController {
    /// Create a controller. The stream connector is installed with `init`.
    pub fn new(
        settings: SniperSettings,
        token_data: Arc<dyn TokenDataPort>,
        observer: Arc<dyn SniperObserver>,
    ) -> Result<Self, SniperError> {
        settings.sniper.validate()?;

        let classifier = match &settings.pool_programs {
            Some(programs) => TransactionClassifier::with_pool_programs(programs),
            None => TransactionClassifier::new(),
        };
        debug!(pool_programs = ?classifier.pool_program_names(), "Classifier configured");

        let pipeline = Pipeline {
            classifier,
            cache: CandidateCache::new(),
            metrics: MetricsRecorder::new(),
            filter: FilterPipeline::new(),
            config: StdRwLock::new(settings.sniper),
            quota: AsyncMutex::new(HourlyQuotaCounter::new()),
            token_data,
            observer,
            tasks: Mutex::new(JoinSet::new()),
            active: AtomicBool::new(false),
        };

        Ok(Self {
            stream_config: settings.stream,
            pipeline: Arc::new(pipeline),
            connector: Mutex::new(None),
            state: Arc::new(RwLock::new(ControllerState::Idle)),
            running: AsyncMutex::new(None),
        })
    }

    /// Install the stream connector. Rejected while running.
    pub async fn init(&self, connector: Arc<dyn StreamConnector>) -> Result<(), SniperError> {
        if *self.state.read().await != ControllerState::Idle {
            return Err(SniperError::AlreadyRunning);
        }

        match self.connector.lock() {
            Ok(mut slot) => *slot = Some(connector),
            Err(poisoned) => *poisoned.into_inner() = Some(connector),
        }
        debug!("Stream connector installed");
        Ok(())
    }

    /// Start the pipeline. No-op when already running.
    pub async fn start(&self) -> Result<(), SniperError> {
        let mut running = self.running.lock().await;
        {
            let mut state = self.state.write().await;
            if *state != ControllerState::Idle {
                debug!(state = ?*state, "start() ignored");
                return Ok(());
            }

            let connector = match self.connector.lock() {
                Ok(slot) => slot.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            }
            .ok_or(SniperError::NotInitialized)?;

            let handler = Arc::new(PipelineHandler {
                pipeline: Arc::clone(&self.pipeline),
            });
            let manager = Arc::new(StreamConnectionManager::new(
                self.stream_config.clone(),
                connector,
                handler,
            ));

            self.pipeline.active.store(true, Ordering::SeqCst);

            let task = tokio::spawn({
                let manager = Arc::clone(&manager);
                let state = Arc::clone(&self.state);
                async move {
                    if let Err(e) = manager.run().await {
                        error!(error = %e, "Stream manager terminated");
                        let mut state = state.write().await;
                        if *state == ControllerState::Running {
                            *state = ControllerState::Idle;
                        }
                    }
                }
            });

            *running = Some(RunningStream { manager, task });
            *state = ControllerState::Running;
        }

        info!(
            url = %self.stream_config.ws_url,
            config = ?self.config(),
            "Sniper started"
        );
        Ok(())
    }

    /// Stop the pipeline. Idempotent; in-flight candidates are abandoned.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(stream) = running.take() else {
            *self.state.write().await = ControllerState::Idle;
            return;
        };

        *self.state.write().await = ControllerState::Stopping;
        info!("Stopping sniper");

        stream.manager.stop();
        if let Err(e) = stream.task.await {
            warn!(error = %e, "Stream task ended abnormally");
        }
        self.pipeline.abandon_in_flight().await;

        *self.state.write().await = ControllerState::Idle;
        info!("Sniper stopped");
    }

    /// Merge a partial update into the live config.
    ///
    /// Invalid values are rejected and the previous config stays in effect.
    pub fn update_config(&self, update: SniperConfigUpdate) -> Result<SniperConfig, SniperError> {
        let current = self.pipeline.config_snapshot();
        let next = current.merged(&update)?;
        self.pipeline.replace_config(next.clone());
        info!(config = ?next, "Sniper config updated");
        Ok(next)
    }

    /// Current filter config
    pub fn config(&self) -> SniperConfig {
        self.pipeline.config_snapshot()
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.pipeline.metrics.snapshot()
    }

    pub async fn state(&self) -> ControllerState {
        *self.state.read().await
    }

    /// State of the stream connection, `Disconnected` when not started
    pub async fn connection_state(&self) -> ConnectionState {
        match self.running.lock().await.as_ref() {
            Some(stream) => stream.manager.state(),
            None => ConnectionState::Disconnected,
        }
    }

    /// Number of distinct mints seen so far
    pub fn seen_candidates(&self) -> usize {
        self.pipeline.cache.len()
    }
}
