//! Integration tests for background configuration and training.
//!
//! The fake engine blocks inside `train` until the test releases it, which
//! stands in for an AutoML call that cannot be interrupted.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use hamelin_criteria::Dataset;
use hamelin_tasks::{
    AutoConfig, AutoMlEngine, BackgroundTask, Chart, ConfigurationJob, ConfusionMatrix,
    DistributedRuntime, EngineError, Metrics, ProblemType, ReapReport, ResultPlotter,
    RuntimeConfig, ShutdownOutcome, TaskConfig, TaskError, TaskEvent, TaskStage, TaskState,
    TrainedModel, TrainingJob, TrainingReport, WorkerProcessReaper,
};
use parking_lot::Mutex;
use polars::df;
use pretty_assertions::assert_eq;

const WAIT: Duration = Duration::from_secs(5);

type Log = Arc<Mutex<Vec<String>>>;

// =============================================================================
// Fakes
// =============================================================================

/// Engine whose `train` call signals entry and then waits for a release.
struct GatedEngine {
    entered: Mutex<Option<Sender<()>>>,
    release: Mutex<Option<Receiver<()>>>,
    fail_train: bool,
    log: Log,
}

struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl GatedEngine {
    fn new(fail_train: bool, log: Log) -> (Arc<Self>, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = Arc::new(Self {
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
            fail_train,
            log,
        });
        (
            engine,
            Gate {
                entered: entered_rx,
                release: release_tx,
            },
        )
    }
}

impl AutoMlEngine for GatedEngine {
    fn auto_configure(&self, _dataset: &Dataset, _target: &str) -> Result<AutoConfig, EngineError> {
        self.log.lock().push("auto_configure".to_string());
        Ok(AutoConfig {
            problem_type: ProblemType::Classification,
            time_budget: Duration::from_secs(60),
            metric: "accuracy".to_string(),
            candidate_algorithms: vec!["logistic_regression".to_string()],
            settings: Default::default(),
        })
    }

    fn train(&self, _dataset: &Dataset, config: &TaskConfig) -> Result<TrainedModel, EngineError> {
        self.log.lock().push("train".to_string());
        if let Some(entered) = self.entered.lock().take() {
            entered.send(()).ok();
        }
        let release = self.release.lock().take();
        if let Some(release) = release {
            release.recv().ok();
        }
        if self.fail_train {
            return Err(EngineError::new("runtime was shut down"));
        }
        Ok(TrainedModel {
            name: "fake".to_string(),
            algorithm: "logistic_regression".to_string(),
            target_column: config.target_column.clone(),
            feature_columns: vec!["age".to_string()],
            artifact: serde_json::Value::Null,
        })
    }

    fn evaluate(&self, _model: &TrainedModel, _dataset: &Dataset) -> Result<Metrics, EngineError> {
        self.log.lock().push("evaluate".to_string());
        Ok(Metrics {
            test_score: Some(0.75),
            accuracy: Some(0.75),
            ..Metrics::default()
        })
    }
}

struct FakePlotter;

impl ResultPlotter for FakePlotter {
    fn render_charts(&self, model: &TrainedModel, _metrics: &Metrics) -> Result<Vec<Chart>, EngineError> {
        Ok(vec![Chart {
            title: format!("{} feature importance", model.name),
            mime_type: "image/svg+xml".to_string(),
            data: b"<svg/>".to_vec(),
        }])
    }

    fn confusion_matrix(
        &self,
        _model: &TrainedModel,
        _dataset: &Dataset,
    ) -> Result<Option<ConfusionMatrix>, EngineError> {
        ConfusionMatrix::new(
            vec!["no".to_string(), "yes".to_string()],
            vec![vec![2, 1], vec![0, 3]],
        )
        .map(Some)
    }
}

struct FakeRuntime {
    up: Mutex<bool>,
    fail_shutdown: bool,
    log: Log,
}

impl FakeRuntime {
    fn new(up: bool, fail_shutdown: bool, log: Log) -> Arc<Self> {
        Arc::new(Self {
            up: Mutex::new(up),
            fail_shutdown,
            log,
        })
    }
}

impl DistributedRuntime for FakeRuntime {
    fn initialize(&self, _config: &RuntimeConfig) -> Result<(), EngineError> {
        self.log.lock().push("initialize".to_string());
        *self.up.lock() = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        *self.up.lock()
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        self.log.lock().push("shutdown".to_string());
        if self.fail_shutdown {
            return Err(EngineError::new("shutdown timed out"));
        }
        *self.up.lock() = false;
        Ok(())
    }
}

struct FakeReaper(Log);

impl WorkerProcessReaper for FakeReaper {
    fn reap(&self) -> ReapReport {
        self.0.lock().push("reap".to_string());
        ReapReport {
            matched: 1,
            killed: 1,
            failed: 0,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn dataset() -> Dataset {
    Dataset::new(
        df!(
            "age" => &[25i64, 34, 47, 52, 61, 70],
            "outcome" => &["no", "yes", "yes", "no", "yes", "yes"],
        )
        .unwrap(),
    )
}

fn training_task(
    engine: Arc<GatedEngine>,
    runtime: Arc<FakeRuntime>,
    log: &Log,
) -> BackgroundTask<TrainingJob> {
    let config = TaskConfig::builder().target_column("outcome").build().unwrap();
    let job = TrainingJob::builder(engine, dataset(), config)
        .plotter(Arc::new(FakePlotter))
        .runtime(runtime)
        .reaper(Arc::new(FakeReaper(log.clone())))
        .build()
        .unwrap();
    BackgroundTask::new(job)
}

fn terminal_count<T>(events: &[TaskEvent<T>]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

fn log_entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_training_runs_to_completion() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(false, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime.clone(), &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();
    gate.release.send(()).unwrap();

    assert!(task.wait_timeout(WAIT));
    assert_eq!(task.state(), TaskState::Finished);

    let events = task.drain_events();
    assert_eq!(terminal_count(&events), 1);

    let stages: Vec<TaskStage> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Progress(update) => Some(update.stage),
            _ => None,
        })
        .collect();
    assert_eq!(stages.first(), Some(&TaskStage::Initializing));
    assert_eq!(stages.last(), Some(&TaskStage::Complete));
    assert!(stages.contains(&TaskStage::ConfusionMatrix));

    let report: &TrainingReport = match events.last() {
        Some(TaskEvent::Finished(report)) => report,
        other => panic!("expected Finished, got {other:?}"),
    };
    assert_eq!(report.model.target_column, "outcome");
    assert_eq!(report.metrics.accuracy, Some(0.75));
    assert_eq!(report.charts.len(), 1);
    assert_eq!(
        report.confusion_matrix.as_ref().and_then(ConfusionMatrix::accuracy),
        Some(5.0 / 6.0)
    );

    assert_eq!(log_entries(&log), vec!["initialize", "train", "evaluate"]);
    assert!(runtime.is_initialized());
}

#[test]
fn test_cancel_before_start_never_trains() {
    let log: Log = Arc::default();
    let (engine, _gate) = GatedEngine::new(false, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime, &log);

    task.cancel();
    task.start().unwrap();

    assert_eq!(task.state(), TaskState::Cancelled);
    assert_eq!(task.drain_events(), vec![TaskEvent::Cancelled]);
    assert!(log_entries(&log).is_empty());
}

#[test]
fn test_mid_run_cancel_with_failing_engine_resolves_cancelled() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(true, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime.clone(), &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();

    assert!(task.cancel());
    assert_eq!(task.state(), TaskState::CancelRequested);
    // the runtime was brought up by the job, so it is shut down before reaping
    assert_eq!(
        log_entries(&log),
        vec!["initialize", "train", "shutdown", "reap"]
    );
    assert!(!runtime.is_initialized());

    // the engine now fails because its runtime is gone
    gate.release.send(()).unwrap();
    assert_eq!(task.cancel_and_wait(WAIT), ShutdownOutcome::Graceful);
    assert_eq!(task.state(), TaskState::Cancelled);

    let events = task.drain_events();
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(events.last(), Some(&TaskEvent::Cancelled));
    assert!(!events.iter().any(|e| matches!(e, TaskEvent::Error(_))));
}

#[test]
fn test_forced_termination() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(false, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime, &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();

    let outcome = task.cancel_and_wait(Duration::from_millis(100));
    assert_eq!(outcome, ShutdownOutcome::Forced);
    assert_eq!(task.state(), TaskState::Cancelled);
    // escalation reap plus the forced reap
    assert_eq!(
        log_entries(&log),
        vec!["initialize", "train", "shutdown", "reap", "reap"]
    );

    // the abandoned worker finishes later; its result is discarded
    gate.release.send(()).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let events = task.drain_events();
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(events.last(), Some(&TaskEvent::Cancelled));
    assert_eq!(task.state(), TaskState::Cancelled);
}

#[test]
fn test_escalation_reaps_even_when_shutdown_fails() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(false, log.clone());
    // already up, so the job will not initialize it again
    let runtime = FakeRuntime::new(true, true, log.clone());
    let mut task = training_task(engine, runtime, &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();
    task.cancel();
    gate.release.send(()).unwrap();

    assert_eq!(task.cancel_and_wait(WAIT), ShutdownOutcome::Graceful);
    assert_eq!(log_entries(&log), vec!["train", "shutdown", "reap"]);
    assert_eq!(task.state(), TaskState::Cancelled);
}

#[test]
fn test_cancel_after_finish_is_noop() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(false, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime, &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();
    gate.release.send(()).unwrap();
    assert!(task.wait_timeout(WAIT));
    task.drain_events();

    assert!(!task.cancel());
    assert_eq!(task.state(), TaskState::Finished);
    assert!(task.try_next_event().is_none());
    assert!(!log_entries(&log).contains(&"reap".to_string()));
}

#[test]
fn test_start_while_running_is_rejected() {
    let log: Log = Arc::default();
    let (engine, gate) = GatedEngine::new(false, log.clone());
    let runtime = FakeRuntime::new(false, false, log.clone());
    let mut task = training_task(engine, runtime, &log);

    task.start().unwrap();
    gate.entered.recv_timeout(WAIT).unwrap();

    let err = task.start().unwrap_err();
    assert_eq!(err.error_code(), "TASK_INVALID_STATE");
    assert_eq!(
        err.to_string(),
        "Cannot start a training task in state 'running'"
    );

    gate.release.send(()).unwrap();
    assert!(task.wait_timeout(WAIT));
}

#[test]
fn test_training_missing_target_fails() {
    let log: Log = Arc::default();
    let (engine, _gate) = GatedEngine::new(false, log.clone());
    let config = TaskConfig::builder().target_column("survived").build().unwrap();
    let job = TrainingJob::builder(engine, dataset(), config).build().unwrap();
    let mut task = BackgroundTask::new(job);

    task.start().unwrap();
    assert!(task.wait_timeout(WAIT));
    assert_eq!(task.state(), TaskState::Failed);

    let events = task.drain_events();
    assert_eq!(
        events.last(),
        Some(&TaskEvent::Error(
            TaskError::TargetNotFound("survived".to_string()).to_string()
        ))
    );
    assert!(log_entries(&log).is_empty());
}

#[test]
fn test_configuration_task() {
    let log: Log = Arc::default();
    let (engine, _gate) = GatedEngine::new(false, log.clone());
    let mut task = BackgroundTask::new(ConfigurationJob::new(engine, dataset(), "outcome"));

    task.start().unwrap();
    assert!(task.wait_timeout(WAIT));
    assert_eq!(task.state(), TaskState::Finished);

    let events = task.drain_events();
    assert_eq!(terminal_count(&events), 1);
    match events.last() {
        Some(TaskEvent::Finished(config)) => {
            assert_eq!(config.problem_type, ProblemType::Classification);
            assert_eq!(config.metric, "accuracy");
        }
        other => panic!("expected Finished, got {other:?}"),
    }
    assert_eq!(log_entries(&log), vec!["auto_configure"]);
}

#[test]
fn test_configuration_cancel_while_idle_and_graceful_shutdown() {
    let log: Log = Arc::default();
    let (engine, _gate) = GatedEngine::new(false, log.clone());
    let mut task = BackgroundTask::new(ConfigurationJob::new(engine, dataset(), "outcome"));

    assert_eq!(task.cancel_and_wait(WAIT), ShutdownOutcome::Graceful);
    assert_eq!(task.state(), TaskState::Idle);
    task.start().unwrap();
    assert_eq!(task.state(), TaskState::Cancelled);
    assert!(log_entries(&log).is_empty());
}
