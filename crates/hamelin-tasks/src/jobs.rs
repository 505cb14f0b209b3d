//! The two background jobs a study session launches.
//!
//! - [`ConfigurationJob`]: asks the engine for an [`AutoConfig`]
//! - [`TrainingJob`]: trains, evaluates and renders results, checking for
//!   cancellation between engine calls
//!
//! The engine is opaque: a call in progress cannot be interrupted, so a
//! cancelled [`TrainingJob`] additionally shuts down the distributed runtime
//! and reaps its worker processes (see [`TrainingEscalation`]).

use std::sync::Arc;
use std::time::{Duration, Instant};

use hamelin_criteria::Dataset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{RuntimeConfig, TaskConfig};
use crate::engine::{AutoConfig, AutoMlEngine, Chart, ConfusionMatrix, Metrics, ResultPlotter, TrainedModel};
use crate::error::{Result, TaskError};
use crate::progress::{Checkpoint, ProgressUpdate, TaskStage};
use crate::reaper::{NoopReaper, WorkerProcessReaper};
use crate::runtime::{DistributedRuntime, LocalRuntime};
use crate::state::TaskKind;
use crate::task::{CancelEscalation, TaskContext, TaskJob};

fn ensure_target(dataset: &Dataset, target: &str) -> Result<()> {
    if dataset.has_column(target) {
        Ok(())
    } else {
        Err(TaskError::TargetNotFound(target.to_string()))
    }
}

/// Automatic configuration of a training run.
pub struct ConfigurationJob {
    engine: Arc<dyn AutoMlEngine>,
    dataset: Dataset,
    target: String,
}

impl ConfigurationJob {
    pub fn new(engine: Arc<dyn AutoMlEngine>, dataset: Dataset, target: impl Into<String>) -> Self {
        Self {
            engine,
            dataset,
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl TaskJob for ConfigurationJob {
    type Output = AutoConfig;

    fn kind(&self) -> TaskKind {
        TaskKind::Configuration
    }

    fn run(self, ctx: &TaskContext) -> Result<AutoConfig> {
        ctx.report(TaskStage::Initializing, 0.0, "Preparing configuration");
        ensure_target(&self.dataset, &self.target)?;

        ctx.checkpoint(Checkpoint::PreConfigure)?;
        ctx.report(
            TaskStage::Configuring,
            0.2,
            format!("Detecting settings for '{}'", self.target),
        );
        let config = self.engine.auto_configure(&self.dataset, &self.target)?;

        info!(
            "Auto-configuration: {} problem, metric '{}', {} candidate algorithms",
            config.problem_type.as_str(),
            config.metric,
            config.candidate_algorithms.len()
        );
        ctx.progress(ProgressUpdate::complete("Configuration ready"));
        Ok(config)
    }
}

/// Everything produced by a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model: TrainedModel,
    pub metrics: Metrics,
    pub charts: Vec<Chart>,
    /// `None` for regression or when no plotter was configured.
    pub confusion_matrix: Option<ConfusionMatrix>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Model training, evaluation and result rendering.
///
/// Build with [`TrainingJob::builder`].
pub struct TrainingJob {
    engine: Arc<dyn AutoMlEngine>,
    plotter: Option<Arc<dyn ResultPlotter>>,
    runtime: Arc<dyn DistributedRuntime>,
    reaper: Arc<dyn WorkerProcessReaper>,
    dataset: Dataset,
    config: TaskConfig,
    runtime_config: RuntimeConfig,
}

impl TrainingJob {
    /// Start building a training job.
    ///
    /// Defaults: no plotter, a [`LocalRuntime`], a [`NoopReaper`] and the
    /// default [`RuntimeConfig`].
    #[must_use]
    pub fn builder(engine: Arc<dyn AutoMlEngine>, dataset: Dataset, config: TaskConfig) -> TrainingJobBuilder {
        TrainingJobBuilder {
            engine,
            plotter: None,
            runtime: Arc::new(LocalRuntime::new()),
            reaper: Arc::new(NoopReaper),
            dataset,
            config,
            runtime_config: RuntimeConfig::default(),
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }
}

impl TaskJob for TrainingJob {
    type Output = TrainingReport;

    fn kind(&self) -> TaskKind {
        TaskKind::Training
    }

    fn escalation(&self) -> Option<Arc<dyn CancelEscalation>> {
        Some(Arc::new(TrainingEscalation::new(
            Arc::clone(&self.runtime),
            Arc::clone(&self.reaper),
        )))
    }

    fn run(self, ctx: &TaskContext) -> Result<TrainingReport> {
        let started = Instant::now();
        let target = self.config.target_column.as_str();

        ctx.report(TaskStage::Initializing, 0.0, "Preparing training");
        ensure_target(&self.dataset, target)?;

        ctx.checkpoint(Checkpoint::PreTrain)?;
        if !self.runtime.is_initialized() {
            ctx.report(TaskStage::Initializing, 0.05, "Starting runtime");
            self.runtime.initialize(&self.runtime_config)?;
            // an escalation that ran before start-up found nothing to stop
            if ctx.is_cancelled() {
                stop_runtime(self.runtime.as_ref());
                return Err(TaskError::Cancelled);
            }
        }

        ctx.report(
            TaskStage::Training,
            0.1,
            format!(
                "Training models for '{}' (budget {}s)",
                target,
                self.config.time_budget.as_secs()
            ),
        );
        let model = self.engine.train(&self.dataset, &self.config)?;
        info!("Trained model '{}' ({})", model.name, model.algorithm);

        ctx.checkpoint(Checkpoint::PostTrain)?;
        ctx.report(TaskStage::Evaluating, 0.7, "Evaluating model");
        let metrics = self.engine.evaluate(&model, &self.dataset)?;

        ctx.checkpoint(Checkpoint::PreChartGeneration)?;
        ctx.report(TaskStage::RenderingCharts, 0.8, "Rendering charts");
        let charts = match &self.plotter {
            Some(plotter) => plotter.render_charts(&model, &metrics)?,
            None => Vec::new(),
        };

        ctx.checkpoint(Checkpoint::PreConfusionMatrix)?;
        ctx.report(TaskStage::ConfusionMatrix, 0.9, "Computing confusion matrix");
        let confusion_matrix = match &self.plotter {
            Some(plotter) => plotter.confusion_matrix(&model, &self.dataset)?,
            None => None,
        };

        let duration = started.elapsed();
        ctx.progress(ProgressUpdate::complete(format!(
            "Training complete in {:.1}s",
            duration.as_secs_f64()
        )));

        Ok(TrainingReport {
            model,
            metrics,
            charts,
            confusion_matrix,
            duration,
        })
    }
}

/// Builder for [`TrainingJob`].
pub struct TrainingJobBuilder {
    engine: Arc<dyn AutoMlEngine>,
    plotter: Option<Arc<dyn ResultPlotter>>,
    runtime: Arc<dyn DistributedRuntime>,
    reaper: Arc<dyn WorkerProcessReaper>,
    dataset: Dataset,
    config: TaskConfig,
    runtime_config: RuntimeConfig,
}

impl TrainingJobBuilder {
    #[must_use]
    pub fn plotter(mut self, plotter: Arc<dyn ResultPlotter>) -> Self {
        self.plotter = Some(plotter);
        self
    }

    #[must_use]
    pub fn runtime(mut self, runtime: Arc<dyn DistributedRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn reaper(mut self, reaper: Arc<dyn WorkerProcessReaper>) -> Self {
        self.reaper = reaper;
        self
    }

    #[must_use]
    pub fn runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Build the job.
    ///
    /// # Errors
    ///
    /// [`TaskError::InvalidConfig`] if the task or runtime config is invalid.
    pub fn build(self) -> Result<TrainingJob> {
        self.config.validate()?;
        self.runtime_config.validate()?;
        Ok(TrainingJob {
            engine: self.engine,
            plotter: self.plotter,
            runtime: self.runtime,
            reaper: self.reaper,
            dataset: self.dataset,
            config: self.config,
            runtime_config: self.runtime_config,
        })
    }
}

/// Shutdown protocol for a cancelled training run.
///
/// On cancel: shut the runtime down if it is up, then reap worker processes
/// even if the shutdown failed. On forced termination: reap once more.
pub struct TrainingEscalation {
    runtime: Arc<dyn DistributedRuntime>,
    reaper: Arc<dyn WorkerProcessReaper>,
}

impl TrainingEscalation {
    pub fn new(runtime: Arc<dyn DistributedRuntime>, reaper: Arc<dyn WorkerProcessReaper>) -> Self {
        Self { runtime, reaper }
    }

    fn reap(&self) {
        let report = self.reaper.reap();
        debug!(
            "Worker reap: {} matched, {} killed, {} failed",
            report.matched, report.killed, report.failed
        );
    }
}

impl CancelEscalation for TrainingEscalation {
    fn escalate(&self) {
        if self.runtime.is_initialized() {
            stop_runtime(self.runtime.as_ref());
        } else {
            debug!("Runtime not initialized; skipping shutdown");
        }
        self.reap();
    }

    fn force(&self) {
        if self.runtime.is_initialized() {
            stop_runtime(self.runtime.as_ref());
        }
        self.reap();
    }
}

/// Shut the runtime down after cancellation. Failures are logged, not
/// returned.
fn stop_runtime(runtime: &dyn DistributedRuntime) {
    match runtime.shutdown() {
        Ok(()) => info!("Runtime shut down after cancellation"),
        Err(e) => warn!("Runtime shutdown failed during cancellation: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::config::ProblemType;
    use crate::engine::EngineError;
    use crate::reaper::ReapReport;
    use parking_lot::Mutex;
    use polars::df;

    struct StubEngine;

    impl AutoMlEngine for StubEngine {
        fn auto_configure(&self, _dataset: &Dataset, _target: &str) -> std::result::Result<AutoConfig, EngineError> {
            Ok(AutoConfig {
                problem_type: ProblemType::Classification,
                time_budget: Duration::from_secs(30),
                metric: "accuracy".to_string(),
                candidate_algorithms: vec!["random_forest".to_string()],
                settings: Default::default(),
            })
        }

        fn train(&self, dataset: &Dataset, config: &TaskConfig) -> std::result::Result<TrainedModel, EngineError> {
            Ok(TrainedModel {
                name: "stub".to_string(),
                algorithm: "random_forest".to_string(),
                target_column: config.target_column.clone(),
                feature_columns: dataset
                    .column_names()
                    .into_iter()
                    .filter(|c| *c != config.target_column)
                    .collect(),
                artifact: serde_json::Value::Null,
            })
        }

        fn evaluate(&self, _model: &TrainedModel, _dataset: &Dataset) -> std::result::Result<Metrics, EngineError> {
            Ok(Metrics {
                test_score: Some(0.9),
                accuracy: Some(0.9),
                ..Metrics::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordingRuntime {
        up: Mutex<bool>,
        fail_shutdown: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
        /// Cancelled while the runtime starts, as a racing cancel would.
        cancel_on_init: Option<CancellationToken>,
    }

    impl DistributedRuntime for RecordingRuntime {
        fn initialize(&self, _config: &RuntimeConfig) -> std::result::Result<(), EngineError> {
            self.log.lock().push("initialize");
            *self.up.lock() = true;
            if let Some(token) = &self.cancel_on_init {
                token.cancel();
            }
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            *self.up.lock()
        }

        fn shutdown(&self) -> std::result::Result<(), EngineError> {
            self.log.lock().push("shutdown");
            if self.fail_shutdown {
                return Err(EngineError::new("cluster unreachable"));
            }
            *self.up.lock() = false;
            Ok(())
        }
    }

    struct RecordingReaper(Arc<Mutex<Vec<&'static str>>>);

    impl WorkerProcessReaper for RecordingReaper {
        fn reap(&self) -> ReapReport {
            self.0.lock().push("reap");
            ReapReport::default()
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            df!(
                "age" => &[30i64, 40, 50],
                "outcome" => &["yes", "no", "yes"],
            )
            .unwrap(),
        )
    }

    fn ctx(kind: TaskKind) -> TaskContext {
        TaskContext::detached(kind, CancellationToken::new())
    }

    fn task_config(target: &str) -> TaskConfig {
        TaskConfig::builder().target_column(target).build().unwrap()
    }

    #[test]
    fn test_configuration_job_runs_inline() {
        let job = ConfigurationJob::new(Arc::new(StubEngine), dataset(), "outcome");
        let config = job.run(&ctx(TaskKind::Configuration)).unwrap();
        assert_eq!(config.metric, "accuracy");
    }

    #[test]
    fn test_configuration_job_missing_target() {
        let job = ConfigurationJob::new(Arc::new(StubEngine), dataset(), "missing");
        let err = job.run(&ctx(TaskKind::Configuration)).unwrap_err();
        assert!(matches!(err, TaskError::TargetNotFound(ref t) if t == "missing"));
    }

    #[test]
    fn test_training_job_initializes_runtime() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let runtime = Arc::new(RecordingRuntime {
            log: log.clone(),
            ..RecordingRuntime::default()
        });
        let job = TrainingJob::builder(Arc::new(StubEngine), dataset(), task_config("outcome"))
            .runtime(runtime.clone())
            .build()
            .unwrap();

        let report = job.run(&ctx(TaskKind::Training)).unwrap();
        assert_eq!(report.model.feature_columns, vec!["age".to_string()]);
        assert!(report.charts.is_empty());
        assert!(report.confusion_matrix.is_none());
        assert!(runtime.is_initialized());
        assert_eq!(*log.lock(), vec!["initialize"]);
    }

    #[test]
    fn test_training_job_cancelled_before_train() {
        let token = CancellationToken::new();
        token.cancel();
        let job = TrainingJob::builder(Arc::new(StubEngine), dataset(), task_config("outcome"))
            .build()
            .unwrap();
        let err = job
            .run(&TaskContext::detached(TaskKind::Training, token))
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_training_builder_validates_runtime_config() {
        let result = TrainingJob::builder(Arc::new(StubEngine), dataset(), task_config("outcome"))
            .runtime_config(RuntimeConfig {
                num_workers: Some(0),
                ..RuntimeConfig::default()
            })
            .build();
        assert!(matches!(result, Err(TaskError::InvalidConfig(_))));
    }

    #[test]
    fn test_escalation_skips_shutdown_when_not_initialized() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let runtime = Arc::new(RecordingRuntime {
            log: log.clone(),
            ..RecordingRuntime::default()
        });
        let escalation = TrainingEscalation::new(runtime, Arc::new(RecordingReaper(log.clone())));
        escalation.escalate();
        assert_eq!(*log.lock(), vec!["reap"]);
    }

    #[test]
    fn test_escalation_reaps_after_failed_shutdown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let runtime = Arc::new(RecordingRuntime {
            up: Mutex::new(true),
            fail_shutdown: true,
            log: log.clone(),
            cancel_on_init: None,
        });
        let escalation = TrainingEscalation::new(runtime, Arc::new(RecordingReaper(log.clone())));
        escalation.escalate();
        escalation.force();
        // the runtime is still up after the failed shutdown, so force retries it
        assert_eq!(*log.lock(), vec!["shutdown", "reap", "shutdown", "reap"]);
    }

    #[test]
    fn test_runtime_started_during_cancel_is_shut_down() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let runtime = Arc::new(RecordingRuntime {
            log: log.clone(),
            cancel_on_init: Some(token.clone()),
            ..RecordingRuntime::default()
        });
        let job = TrainingJob::builder(Arc::new(StubEngine), dataset(), task_config("outcome"))
            .runtime(runtime.clone())
            .build()
            .unwrap();

        // escalation already ran and skipped the shutdown
        let escalation = job.escalation().unwrap();
        escalation.escalate();

        let err = job
            .run(&TaskContext::detached(TaskKind::Training, token))
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!runtime.is_initialized());
        assert_eq!(*log.lock(), vec!["initialize", "shutdown"]);
    }

    #[test]
    fn test_force_shuts_down_runtime_started_after_escalation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let runtime = Arc::new(RecordingRuntime {
            log: log.clone(),
            ..RecordingRuntime::default()
        });
        let escalation =
            TrainingEscalation::new(runtime.clone(), Arc::new(RecordingReaper(log.clone())));
        escalation.escalate();
        runtime.initialize(&RuntimeConfig::default()).unwrap();
        escalation.force();

        assert!(!runtime.is_initialized());
        assert_eq!(*log.lock(), vec!["reap", "initialize", "shutdown", "reap"]);
    }
}
