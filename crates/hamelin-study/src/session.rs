//! The study-session wizard controller.
//!
//! A [`StudySession`] owns everything one study wizard needs: the loaded
//! dataset, the variable selection, the active criteria and their last
//! result, the configuration and training tasks, and the training history.
//!
//! # Locking
//!
//! Data lives behind a `RwLock`, the two background tasks behind a `Mutex`.
//! When both are needed the task lock is taken first. The sink is never
//! called with either lock held, so it may call back into the session.
//!
//! # Task events
//!
//! Tasks report through their own channels. [`StudySession::poll`] drains
//! them in order, updates the session (auto-config, training report,
//! history) and forwards each event to the [`StudyEventSink`].

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use hamelin_criteria::{Dataset, FilterReport, IncompleteRule, Rule, RuleDraft, validate_drafts};
use hamelin_criteria::DatasetFilterService;
use hamelin_tasks::{
    AutoConfig, AutoMlEngine, BackgroundTask, ConfigurationJob, DistributedRuntime, ProgressUpdate,
    ResultPlotter, ShutdownOutcome, TaskConfig, TaskError, TaskEvent, TaskJob, TaskKind, TaskState,
    TrainingJob, TrainingReport, WorkerProcessReaper,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::StudyConfig;
use crate::error::{Result, StudyError};
use crate::events::{StudyEventEmitter, StudyEventSink, error_codes};
use crate::state::{
    DatasetInfo, StudyType, TrainingHistoryEntry, TrainingSnapshot, TrainingSummary,
    VariableSelection, WizardTab,
};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

struct LoadedDataset {
    dataset: Dataset,
    info: DatasetInfo,
}

struct SessionState {
    tab: WizardTab,
    dataset: Option<LoadedDataset>,
    selection: Option<VariableSelection>,
    filter: DatasetFilterService,
    auto_config: Option<AutoConfig>,
    training_report: Option<TrainingReport>,
    /// Settings of the training run in flight, recorded in history on finish.
    pending_snapshot: Option<TrainingSnapshot>,
    history: Vec<TrainingHistoryEntry>,
}

impl SessionState {
    /// The filtered dataset (or the full one if no criteria were applied),
    /// restricted to the selected inputs and target.
    fn training_input(&self) -> Result<Dataset> {
        let loaded = self.dataset.as_ref().ok_or(StudyError::NoDataset)?;
        let selection = self.selection.as_ref().ok_or(StudyError::NoSelection)?;
        let source = self
            .filter
            .last_report()
            .map(|report| &report.dataset)
            .unwrap_or(&loaded.dataset);
        Ok(source.select(&selection.columns())?)
    }
}

#[derive(Default)]
struct TaskSlots {
    configuration: Option<BackgroundTask<ConfigurationJob>>,
    training: Option<BackgroundTask<TrainingJob>>,
}

impl TaskSlots {
    fn state(&self, kind: TaskKind) -> Option<TaskState> {
        match kind {
            TaskKind::Configuration => self.configuration.as_ref().map(BackgroundTask::state),
            TaskKind::Training => self.training.as_ref().map(BackgroundTask::state),
        }
    }

    fn is_active(&self, kind: TaskKind) -> bool {
        self.state(kind).is_some_and(|s| s.is_active())
    }

    fn active_kind(&self) -> Option<TaskKind> {
        [TaskKind::Configuration, TaskKind::Training]
            .into_iter()
            .find(|kind| self.is_active(*kind))
    }

    fn drain(&self) -> Vec<Drained> {
        let mut events = Vec::new();
        if let Some(task) = &self.configuration {
            events.extend(task.drain_events().into_iter().map(Drained::Configuration));
        }
        if let Some(task) = &self.training {
            events.extend(task.drain_events().into_iter().map(Drained::Training));
        }
        events
    }
}

enum Drained {
    Configuration(TaskEvent<AutoConfig>),
    Training(TaskEvent<TrainingReport>),
}

/// What the sink hears about one absorbed task event.
enum Notice {
    Progress(TaskKind, ProgressUpdate),
    Configured(AutoConfig),
    Trained(TrainingSummary),
    Failed(TaskKind, String),
    Cancelled(TaskKind),
}

fn absorb_configuration(state: &mut SessionState, event: TaskEvent<AutoConfig>) -> Notice {
    let kind = TaskKind::Configuration;
    match event {
        TaskEvent::Progress(update) => Notice::Progress(kind, update),
        TaskEvent::Finished(config) => {
            state.auto_config = Some(config.clone());
            Notice::Configured(config)
        }
        TaskEvent::Error(message) => Notice::Failed(kind, message),
        TaskEvent::Cancelled => Notice::Cancelled(kind),
    }
}

/// Controller for one study wizard.
pub struct StudySession {
    study_type: StudyType,
    config: StudyConfig,
    sink: Arc<dyn StudyEventSink>,
    state: RwLock<SessionState>,
    tasks: Mutex<TaskSlots>,
}

impl StudySession {
    /// Create a session.
    ///
    /// # Errors
    ///
    /// [`StudyError::InvalidConfig`] if `config` is invalid.
    pub fn new(
        study_type: StudyType,
        config: StudyConfig,
        sink: Arc<dyn StudyEventSink>,
    ) -> Result<Self> {
        config.validate()?;
        info!("Created {} session", study_type);
        Ok(Self {
            study_type,
            state: RwLock::new(SessionState {
                tab: WizardTab::default(),
                dataset: None,
                selection: None,
                filter: DatasetFilterService::new(config.filter.clone()),
                auto_config: None,
                training_report: None,
                pending_snapshot: None,
                history: Vec::new(),
            }),
            tasks: Mutex::new(TaskSlots::default()),
            config,
            sink,
        })
    }

    pub fn study_type(&self) -> StudyType {
        self.study_type
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Wizard navigation
    // ------------------------------------------------------------------------

    pub fn tab(&self) -> WizardTab {
        self.state.read().tab
    }

    /// Move to the next tab.
    ///
    /// Leaving the data tab needs a dataset, leaving the variables tab needs
    /// a selection and leaving the training tab needs a finished run. No
    /// move is possible while a task is running.
    ///
    /// # Errors
    ///
    /// [`StudyError::TaskActive`] or [`StudyError::InvalidTransition`].
    pub fn advance(&self) -> Result<WizardTab> {
        let tasks = self.tasks.lock();
        if let Some(kind) = tasks.active_kind() {
            return Err(StudyError::TaskActive(kind));
        }

        let mut state = self.state.write();
        let from = state.tab;
        let blocked = |reason: &str| StudyError::InvalidTransition {
            from,
            reason: reason.to_string(),
        };

        let to = from.next().ok_or_else(|| blocked("already on the last tab"))?;
        match from {
            WizardTab::Data if state.dataset.is_none() => {
                return Err(blocked("no dataset loaded"));
            }
            WizardTab::Variables if state.selection.is_none() => {
                return Err(blocked("select a target and at least one input variable"));
            }
            WizardTab::Training if state.training_report.is_none() => {
                return Err(blocked("no finished training run"));
            }
            _ => {}
        }

        state.tab = to;
        drop(state);
        drop(tasks);

        debug!("Wizard: {} -> {}", from, to);
        self.sink.emit_tab_changed(from, to);
        Ok(to)
    }

    /// Move to the previous tab.
    ///
    /// # Errors
    ///
    /// [`StudyError::TaskActive`] while a task is running, or
    /// [`StudyError::InvalidTransition`] on the first tab.
    pub fn back(&self) -> Result<WizardTab> {
        let tasks = self.tasks.lock();
        if let Some(kind) = tasks.active_kind() {
            return Err(StudyError::TaskActive(kind));
        }

        let mut state = self.state.write();
        let from = state.tab;
        let to = from.previous().ok_or_else(|| StudyError::InvalidTransition {
            from,
            reason: "already on the first tab".to_string(),
        })?;
        state.tab = to;
        drop(state);
        drop(tasks);

        debug!("Wizard: {} -> {}", from, to);
        self.sink.emit_tab_changed(from, to);
        Ok(to)
    }

    // ------------------------------------------------------------------------
    // Data and variables
    // ------------------------------------------------------------------------

    /// Load a dataset, replacing the previous one.
    ///
    /// Clears the variable selection, the last filter result and any
    /// configuration or training result. Criteria rules are kept.
    ///
    /// # Errors
    ///
    /// [`StudyError::TaskActive`] while a task is running.
    pub fn load_dataset(&self, dataset: Dataset) -> Result<DatasetInfo> {
        self.load(dataset, None)
    }

    /// Read a CSV file and load it.
    ///
    /// # Errors
    ///
    /// [`StudyError::Criteria`] if the file cannot be read, otherwise as
    /// [`load_dataset`](Self::load_dataset).
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DatasetInfo> {
        let path = path.as_ref();
        let dataset = Dataset::read_csv(path)?;
        self.load(dataset, Some(path.display().to_string()))
    }

    fn load(&self, dataset: Dataset, source: Option<String>) -> Result<DatasetInfo> {
        let tasks = self.tasks.lock();
        if let Some(kind) = tasks.active_kind() {
            return Err(StudyError::TaskActive(kind));
        }

        let info = DatasetInfo::from_dataset(&dataset, source);
        {
            let mut state = self.state.write();
            state.dataset = Some(LoadedDataset {
                dataset,
                info: info.clone(),
            });
            state.selection = None;
            state.filter.discard();
            state.auto_config = None;
            state.training_report = None;
        }
        drop(tasks);

        info!(
            "Loaded dataset: {} rows, {} columns",
            info.row_count, info.column_count
        );
        self.sink.emit_dataset_loaded(&info);
        Ok(info)
    }

    pub fn dataset_info(&self) -> Option<DatasetInfo> {
        self.state.read().dataset.as_ref().map(|d| d.info.clone())
    }

    /// Choose the input variables and the target.
    ///
    /// A new selection invalidates the previous auto-configuration.
    ///
    /// # Errors
    ///
    /// - [`StudyError::NoDataset`] before a dataset is loaded
    /// - [`StudyError::InvalidSelection`] for a blank target, no inputs, a
    ///   duplicate input or a target that is also an input
    /// - [`StudyError::UnknownColumn`] for a column not in the dataset
    /// - [`StudyError::TaskActive`] while a task is running
    pub fn select_variables(&self, inputs: Vec<String>, target: impl Into<String>) -> Result<()> {
        let target = target.into().trim().to_string();
        let inputs: Vec<String> = inputs.into_iter().map(|i| i.trim().to_string()).collect();

        let tasks = self.tasks.lock();
        if let Some(kind) = tasks.active_kind() {
            return Err(StudyError::TaskActive(kind));
        }

        let mut state = self.state.write();
        let loaded = state.dataset.as_ref().ok_or(StudyError::NoDataset)?;

        if target.is_empty() {
            return Err(StudyError::InvalidSelection(
                "a target variable is required".to_string(),
            ));
        }
        if inputs.is_empty() {
            return Err(StudyError::InvalidSelection(
                "at least one input variable is required".to_string(),
            ));
        }
        if inputs.contains(&target) {
            return Err(StudyError::InvalidSelection(format!(
                "target '{target}' cannot also be an input"
            )));
        }
        for (i, input) in inputs.iter().enumerate() {
            if inputs[..i].contains(input) {
                return Err(StudyError::InvalidSelection(format!(
                    "input '{input}' is listed twice"
                )));
            }
        }
        if let Some(unknown) = inputs
            .iter()
            .chain(std::iter::once(&target))
            .find(|column| !loaded.dataset.has_column(column))
        {
            return Err(StudyError::UnknownColumn(unknown.clone()));
        }

        info!("Selected {} inputs, target '{}'", inputs.len(), target);
        state.selection = Some(VariableSelection { inputs, target });
        state.auto_config = None;
        Ok(())
    }

    pub fn selection(&self) -> Option<VariableSelection> {
        self.state.read().selection.clone()
    }

    // ------------------------------------------------------------------------
    // Criteria
    // ------------------------------------------------------------------------

    pub fn add_rule(&self, rule: Rule) {
        self.state.write().filter.add_rule(rule);
    }

    /// Add every complete draft as a rule.
    ///
    /// Incomplete drafts are ignored and reported together in one
    /// `criteria:incomplete` event. Returns them as well.
    pub fn add_drafts(&self, drafts: Vec<RuleDraft>) -> Vec<IncompleteRule> {
        let (rules, incomplete) = validate_drafts(drafts);
        {
            let mut state = self.state.write();
            for rule in rules {
                state.filter.add_rule(rule);
            }
        }
        if !incomplete.is_empty() {
            warn!("Ignored {} incomplete rule draft(s)", incomplete.len());
            self.sink.emit_criteria_incomplete(&incomplete);
        }
        incomplete
    }

    pub fn remove_rule(&self, index: usize) -> Option<Rule> {
        self.state.write().filter.remove_rule(index)
    }

    /// Remove every rule and discard the last filter result.
    pub fn clear_rules(&self) {
        self.state.write().filter.clear();
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.state.read().filter.criteria().rules().to_vec()
    }

    /// Filter the loaded dataset with the active rules.
    ///
    /// The filtered dataset becomes the training input. Emits
    /// `criteria:applied` with the statistics and warnings.
    ///
    /// # Errors
    ///
    /// [`StudyError::NoDataset`] before a dataset is loaded, or
    /// [`StudyError::Criteria`] if the filtered copy cannot be built.
    pub fn apply_criteria(&self) -> Result<FilterReport> {
        let report = {
            let mut state = self.state.write();
            let dataset = state
                .dataset
                .as_ref()
                .ok_or(StudyError::NoDataset)?
                .dataset
                .clone();
            state.filter.apply(&dataset)?.clone()
        };

        self.sink
            .emit_criteria_applied(&report.stats, &report.warnings);
        Ok(report)
    }

    /// Drop the last filter result; training uses the full dataset again.
    pub fn discard_filter(&self) -> Option<FilterReport> {
        self.state.write().filter.discard()
    }

    pub fn last_filter_report(&self) -> Option<FilterReport> {
        self.state.read().filter.last_report().cloned()
    }

    /// The dataset a task started now would receive.
    ///
    /// # Errors
    ///
    /// [`StudyError::NoDataset`] or [`StudyError::NoSelection`].
    pub fn training_dataset(&self) -> Result<Dataset> {
        self.state.read().training_input()
    }

    // ------------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------------

    pub fn task_state(&self, kind: TaskKind) -> Option<TaskState> {
        self.tasks.lock().state(kind)
    }

    /// Whether any task is running or being cancelled.
    pub fn is_busy(&self) -> bool {
        self.tasks.lock().active_kind().is_some()
    }

    /// Start automatic configuration for the selected target.
    ///
    /// # Errors
    ///
    /// - [`TaskError::AlreadyRunning`] if a configuration task is active
    /// - [`StudyError::NoDataset`] / [`StudyError::NoSelection`]
    pub fn start_auto_configure(&self, engine: Arc<dyn AutoMlEngine>) -> Result<()> {
        let mut tasks = self.tasks.lock();
        if tasks.is_active(TaskKind::Configuration) {
            return Err(TaskError::AlreadyRunning(TaskKind::Configuration).into());
        }

        let (dataset, target) = {
            let state = self.state.read();
            let dataset = state.training_input()?;
            let target = state
                .selection
                .as_ref()
                .map(|s| s.target.clone())
                .ok_or(StudyError::NoSelection)?;
            (dataset, target)
        };

        // settle the previous run before its slot is reused
        let leftovers = self.absorb(tasks.drain());
        self.state.write().auto_config = None;

        let mut task = BackgroundTask::new(ConfigurationJob::new(engine, dataset, target));
        let started = task.start();
        if started.is_ok() {
            tasks.configuration = Some(task);
        }
        drop(tasks);

        self.notify(leftovers);
        started?;
        Ok(())
    }

    /// Start training on the training input.
    ///
    /// Uses the problem type and time budget from the last auto-configuration
    /// when there is one, otherwise lets the engine detect the problem type
    /// and uses the configured time budget.
    ///
    /// # Errors
    ///
    /// - [`TaskError::AlreadyRunning`] if a training task is active
    /// - [`StudyError::NoDataset`] / [`StudyError::NoSelection`]
    /// - [`TaskError::InvalidConfig`] if the resulting task config is invalid
    pub fn start_training(
        &self,
        engine: Arc<dyn AutoMlEngine>,
        plotter: Option<Arc<dyn ResultPlotter>>,
        runtime: Arc<dyn DistributedRuntime>,
        reaper: Arc<dyn WorkerProcessReaper>,
    ) -> Result<()> {
        let mut tasks = self.tasks.lock();
        if tasks.is_active(TaskKind::Training) {
            return Err(TaskError::AlreadyRunning(TaskKind::Training).into());
        }

        let (dataset, task_config, snapshot) = {
            let state = self.state.read();
            let dataset = state.training_input()?;
            let selection = state.selection.as_ref().ok_or(StudyError::NoSelection)?;

            let mut builder = TaskConfig::builder().target_column(selection.target.as_str());
            builder = match &state.auto_config {
                Some(auto) => builder
                    .time_budget(auto.time_budget)
                    .problem_type(auto.problem_type),
                None => builder.time_budget(self.config.time_budget),
            };
            let task_config = builder.build()?;

            let snapshot = TrainingSnapshot {
                target: selection.target.clone(),
                inputs: selection.inputs.clone(),
                problem_type: task_config.problem_type,
                time_budget_secs: task_config.time_budget.as_secs(),
                rule_count: state.filter.criteria().len(),
                row_count: dataset.row_count(),
            };
            (dataset, task_config, snapshot)
        };

        let mut builder = TrainingJob::builder(engine, dataset, task_config)
            .runtime(runtime)
            .reaper(reaper)
            .runtime_config(self.config.runtime.clone());
        if let Some(plotter) = plotter {
            builder = builder.plotter(plotter);
        }
        let job = builder.build()?;

        let leftovers = self.absorb(tasks.drain());
        {
            let mut state = self.state.write();
            state.training_report = None;
            state.pending_snapshot = Some(snapshot);
        }

        let mut task = BackgroundTask::new(job);
        let started = task.start();
        match started {
            Ok(()) => tasks.training = Some(task),
            Err(_) => self.state.write().pending_snapshot = None,
        }
        drop(tasks);

        self.notify(leftovers);
        started?;
        Ok(())
    }

    /// Cancel auto-configuration and wait up to the grace period.
    ///
    /// Does nothing without an active configuration task.
    pub fn cancel_configuration(&self) -> ShutdownOutcome {
        let outcome = self.shut_down(|tasks| tasks.configuration.as_mut());
        self.poll();
        outcome
    }

    /// Cancel training: shut down the runtime, reap its workers and wait up
    /// to the grace period before abandoning the worker.
    ///
    /// Does nothing without an active training task.
    pub fn cancel_training(&self) -> ShutdownOutcome {
        let outcome = self.shut_down(|tasks| tasks.training.as_mut());
        if outcome == ShutdownOutcome::Forced {
            warn!(
                "Training worker abandoned after {:?}",
                self.config.shutdown.grace_period
            );
        }
        self.poll();
        outcome
    }

    /// Cancel the task in `slot` and wait for it with the task lock
    /// released, so the session stays responsive during the grace period.
    fn shut_down<J: TaskJob>(
        &self,
        slot: impl Fn(&mut TaskSlots) -> Option<&mut BackgroundTask<J>>,
    ) -> ShutdownOutcome {
        let watch = {
            let mut tasks = self.tasks.lock();
            let Some(task) = slot(&mut *tasks) else {
                return ShutdownOutcome::Graceful;
            };
            task.cancel();
            if !task.state().is_active() {
                return ShutdownOutcome::Graceful;
            }
            task.watch()
        };

        if watch.wait_timeout(self.config.shutdown.grace_period) {
            return ShutdownOutcome::Graceful;
        }

        let mut tasks = self.tasks.lock();
        // still active, so the slot cannot have been reused
        if !watch.state().is_active() {
            return ShutdownOutcome::Graceful;
        }
        match slot(&mut *tasks) {
            Some(task) => task.abandon(),
            None => ShutdownOutcome::Graceful,
        }
    }

    /// Block until the task of `kind` is terminal or `timeout` elapses.
    ///
    /// Does not forward events; call [`poll`](Self::poll) afterwards.
    /// Returns `false` if no such task was started.
    pub fn wait_task(&self, kind: TaskKind, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.task_state(kind) {
                None => return false,
                Some(state) if state.is_terminal() => return true,
                Some(_) if Instant::now() >= deadline => return false,
                Some(_) => thread::sleep(WAIT_POLL_INTERVAL),
            }
        }
    }

    /// Forward queued task events to the sink, in order.
    ///
    /// Stores the auto-configuration and training report when their tasks
    /// finish and records finished training runs in the history. Returns the
    /// number of events forwarded.
    pub fn poll(&self) -> usize {
        let notices = {
            let tasks = self.tasks.lock();
            self.absorb(tasks.drain())
        };
        let count = notices.len();
        self.notify(notices);
        count
    }

    /// Apply drained events to the session state. Called with the task lock
    /// held; the returned notices go to the sink after it is released.
    fn absorb(&self, events: Vec<Drained>) -> Vec<Notice> {
        if events.is_empty() {
            return Vec::new();
        }
        let mut state = self.state.write();
        events
            .into_iter()
            .map(|event| match event {
                Drained::Configuration(event) => absorb_configuration(&mut state, event),
                Drained::Training(event) => self.absorb_training(&mut state, event),
            })
            .collect()
    }

    fn absorb_training(&self, state: &mut SessionState, event: TaskEvent<TrainingReport>) -> Notice {
        let kind = TaskKind::Training;
        match event {
            TaskEvent::Progress(update) => Notice::Progress(kind, update),
            TaskEvent::Finished(report) => {
                let summary = TrainingSummary::from(&report);
                if let Some(config) = state.pending_snapshot.take() {
                    let timestamp = Utc::now();
                    let entry = TrainingHistoryEntry {
                        id: format!("run_{}", timestamp.format("%Y%m%dT%H%M%S%.6f")),
                        timestamp,
                        study_type: self.study_type,
                        config,
                        summary: summary.clone(),
                    };
                    state.history.insert(0, entry);
                    state.history.truncate(self.config.history_limit);
                }
                state.training_report = Some(report);
                Notice::Trained(summary)
            }
            TaskEvent::Error(message) => {
                state.pending_snapshot = None;
                Notice::Failed(kind, message)
            }
            TaskEvent::Cancelled => {
                state.pending_snapshot = None;
                Notice::Cancelled(kind)
            }
        }
    }

    fn notify(&self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Progress(kind, update) => self.sink.emit_task_progress(kind, &update),
                Notice::Configured(config) => {
                    info!(
                        "Auto-configuration finished: {} ({})",
                        config.problem_type.as_str(),
                        config.metric
                    );
                    self.sink.emit_task_finished(TaskKind::Configuration, &config);
                }
                Notice::Trained(summary) => {
                    info!(
                        "Training finished: '{}' in {:.1}s",
                        summary.model_name, summary.duration_secs
                    );
                    self.sink.emit_task_finished(TaskKind::Training, &summary);
                }
                Notice::Failed(kind, message) => {
                    warn!("{} task failed: {}", kind, message);
                    let code = match kind {
                        TaskKind::Configuration => error_codes::CONFIGURATION_FAILED,
                        TaskKind::Training => error_codes::TRAINING_FAILED,
                    };
                    self.sink.emit_task_error(kind, code, &message);
                }
                Notice::Cancelled(kind) => {
                    info!("{} task cancelled", kind);
                    self.sink.emit_task_cancelled(kind);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    pub fn auto_config(&self) -> Option<AutoConfig> {
        self.state.read().auto_config.clone()
    }

    pub fn training_report(&self) -> Option<TrainingReport> {
        self.state.read().training_report.clone()
    }

    /// Finished training runs, newest first.
    pub fn history(&self) -> Vec<TrainingHistoryEntry> {
        self.state.read().history.clone()
    }

    pub fn clear_history(&self) {
        self.state.write().history.clear();
    }
}

impl std::fmt::Debug for StudySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudySession")
            .field("study_type", &self.study_type)
            .field("tab", &self.tab())
            .finish()
    }
}
