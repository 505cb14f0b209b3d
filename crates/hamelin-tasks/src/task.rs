//! Background task runner.
//!
//! A [`BackgroundTask`] runs one [`TaskJob`] on a dedicated worker thread and
//! reports what happens as [`TaskEvent`]s, delivered in the order the worker
//! produced them. Exactly one terminal event (`Finished`, `Error` or
//! `Cancelled`) is delivered per run.
//!
//! Cancellation is cooperative: [`cancel`](BackgroundTask::cancel) sets the
//! task's [`CancellationToken`], which the job consults at its
//! [`Checkpoint`]s. Jobs that drive external processes also supply a
//! [`CancelEscalation`], run once on the first cancel, to stop work the token
//! cannot reach. If the worker still does not settle,
//! [`cancel_and_wait`](BackgroundTask::cancel_and_wait) abandons it after a
//! grace period.
//!
//! Cancellation always wins: once it has been requested, the run settles as
//! `Cancelled` whether the job then returns a value, an error or panics.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use hamelin_tasks::{BackgroundTask, ConfigurationJob, TaskEvent};
//!
//! let mut task = BackgroundTask::new(ConfigurationJob::new(engine, dataset, "outcome"));
//! task.start()?;
//!
//! while let Some(event) = task.next_event_timeout(Duration::from_millis(100)) {
//!     match event {
//!         TaskEvent::Progress(update) => println!("{}", update.message),
//!         TaskEvent::Finished(config) => println!("metric: {}", config.metric),
//!         TaskEvent::Error(message) => eprintln!("failed: {message}"),
//!         TaskEvent::Cancelled => println!("cancelled"),
//!     }
//! }
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::error::{Result, TaskError};
use crate::progress::{Checkpoint, ProgressCallback, ProgressUpdate, TaskStage};
use crate::state::{ShutdownOutcome, TaskKind, TaskState};

/// Something that happened on a task, in worker order.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent<T> {
    Progress(ProgressUpdate),
    Finished(T),
    Error(String),
    Cancelled,
}

impl<T> TaskEvent<T> {
    /// `Finished`, `Error` or `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskEvent::Progress(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Progress(_) => "progress",
            TaskEvent::Finished(_) => "finished",
            TaskEvent::Error(_) => "error",
            TaskEvent::Cancelled => "cancelled",
        }
    }
}

/// Extra teardown run when a task is cancelled.
///
/// Implementations must swallow and log their own failures.
pub trait CancelEscalation: Send + Sync {
    /// Called once, on the first `cancel()` of a running task.
    fn escalate(&self);

    /// Called after the grace period expired and the worker was abandoned.
    fn force(&self) {}
}

/// A long-running operation executed by a [`BackgroundTask`].
pub trait TaskJob: Send + 'static {
    type Output: Send + 'static;

    fn kind(&self) -> TaskKind;

    /// Teardown to run on cancellation, if the job needs more than the
    /// cancellation flag.
    fn escalation(&self) -> Option<Arc<dyn CancelEscalation>> {
        None
    }

    /// Execute the job on the worker thread.
    ///
    /// Return `Err(TaskError::Cancelled)` (usually via
    /// [`TaskContext::checkpoint`]) to stop early.
    fn run(self, ctx: &TaskContext) -> Result<Self::Output>;
}

/// Handle passed to a running job: cancellation checks and progress.
#[derive(Clone)]
pub struct TaskContext {
    kind: TaskKind,
    token: CancellationToken,
    progress: ProgressCallback,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("kind", &self.kind)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl TaskContext {
    pub fn new(kind: TaskKind, token: CancellationToken, progress: ProgressCallback) -> Self {
        Self {
            kind,
            token,
            progress,
        }
    }

    /// A context that drops progress updates, for running a job inline.
    pub fn detached(kind: TaskKind, token: CancellationToken) -> Self {
        Self::new(kind, token, Arc::new(|_| {}))
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop here if cancellation has been requested.
    ///
    /// # Errors
    ///
    /// [`TaskError::Cancelled`] if the token is set.
    pub fn checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        self.token.check().inspect_err(|_| {
            info!("{} task cancelled at checkpoint {}", self.kind, checkpoint);
        })?;
        debug!("{} task passed checkpoint {}", self.kind, checkpoint);
        Ok(())
    }

    pub fn progress(&self, update: ProgressUpdate) {
        (self.progress)(update);
    }

    /// Shorthand for [`progress`](Self::progress).
    pub fn report(&self, stage: TaskStage, progress: f64, message: impl Into<String>) {
        self.progress(ProgressUpdate::new(stage, progress, message));
    }
}

enum Outcome<T> {
    Finished(T),
    Failed(String),
    Cancelled,
}

struct Inner<T> {
    state: TaskState,
    events: Sender<TaskEvent<T>>,
}

/// State shared between the task handle and its worker thread.
///
/// Events are sent while holding the state lock, so nothing is delivered
/// after the terminal event.
struct Shared<T> {
    inner: Mutex<Inner<T>>,
    settled: Condvar,
}

impl<T> Shared<T> {
    fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while !inner.state.is_terminal() {
            if self.settled.wait_until(&mut inner, deadline).timed_out() {
                return inner.state.is_terminal();
            }
        }
        true
    }

    fn emit_progress(&self, update: ProgressUpdate) {
        let inner = self.inner.lock();
        if inner.state.is_active() {
            let _ = inner.events.send(TaskEvent::Progress(update));
        }
    }

    /// Move to a terminal state and emit its event. `None` if another party
    /// already settled the run.
    fn settle(&self, token: &CancellationToken, outcome: Outcome<T>) -> Option<TaskState> {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return None;
        }

        let cancel_requested = inner.state == TaskState::CancelRequested || token.is_cancelled();
        let (state, event) = match outcome {
            _ if cancel_requested => (TaskState::Cancelled, TaskEvent::Cancelled),
            Outcome::Finished(value) => (TaskState::Finished, TaskEvent::Finished(value)),
            Outcome::Failed(message) => (TaskState::Failed, TaskEvent::Error(message)),
            Outcome::Cancelled => (TaskState::Cancelled, TaskEvent::Cancelled),
        };

        inner.state = state;
        let _ = inner.events.send(event);
        self.settled.notify_all();
        Some(state)
    }
}

/// Observes one task run from outside the lock that guards its
/// [`BackgroundTask`].
pub struct TaskWatch<T> {
    kind: TaskKind,
    shared: Arc<Shared<T>>,
}

impl<T> TaskWatch<T> {
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Block until the run is terminal or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_timeout(timeout)
    }
}

impl<T> Clone for TaskWatch<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Runs a [`TaskJob`] on its own worker thread.
///
/// Owns exactly one worker thread per run; a task runs once. Create a new
/// task for the next run.
pub struct BackgroundTask<J: TaskJob> {
    kind: TaskKind,
    job: Option<J>,
    escalation: Option<Arc<dyn CancelEscalation>>,
    escalated: AtomicBool,
    token: CancellationToken,
    shared: Arc<Shared<J::Output>>,
    events: Receiver<TaskEvent<J::Output>>,
    handle: Option<JoinHandle<()>>,
}

impl<J: TaskJob> BackgroundTask<J> {
    pub fn new(job: J) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            kind: job.kind(),
            escalation: job.escalation(),
            job: Some(job),
            escalated: AtomicBool::new(false),
            token: CancellationToken::new(),
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: TaskState::Idle,
                    events: sender,
                }),
                settled: Condvar::new(),
            }),
            events: receiver,
            handle: None,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// The task's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Start the job on a new worker thread.
    ///
    /// If cancellation was requested before this call, the task settles as
    /// `Cancelled` immediately and the job is never run.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidState`] unless the task is `Idle`
    /// - [`TaskError::Spawn`] if the worker thread could not be created; the
    ///   task is then `Failed`
    pub fn start(&mut self) -> Result<()> {
        let state = self.state();
        let job = match (state, self.job.take()) {
            (TaskState::Idle, Some(job)) => job,
            (_, job) => {
                self.job = job;
                return Err(TaskError::InvalidState {
                    kind: self.kind,
                    action: "start",
                    state,
                });
            }
        };

        if self.token.is_cancelled() {
            info!("{} task cancelled before start; job not run", self.kind);
            drop(job);
            self.shared.settle(&self.token, Outcome::Cancelled);
            return Ok(());
        }

        self.shared.inner.lock().state = TaskState::Running;
        info!("Starting {} task", self.kind);

        let progress_shared = Arc::clone(&self.shared);
        let progress: ProgressCallback =
            Arc::new(move |update| progress_shared.emit_progress(update));
        let ctx = TaskContext::new(self.kind, self.token.clone(), progress);

        let shared = Arc::clone(&self.shared);
        let token = self.token.clone();
        let kind = self.kind;

        let spawned = thread::Builder::new()
            .name(format!("hamelin-{kind}"))
            .spawn(move || {
                let started = Instant::now();
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| job.run(&ctx))) {
                    Ok(Ok(value)) => Outcome::Finished(value),
                    Ok(Err(TaskError::Cancelled)) => Outcome::Cancelled,
                    Ok(Err(err)) => Outcome::Failed(err.to_string()),
                    Err(payload) => {
                        Outcome::Failed(TaskError::WorkerPanicked(panic_message(&*payload)).to_string())
                    }
                };

                match shared.settle(&token, outcome) {
                    Some(state) => info!(
                        "{} task {} after {:.2}s",
                        kind,
                        state,
                        started.elapsed().as_secs_f64()
                    ),
                    None => debug!("{} worker finished after the task was abandoned", kind),
                }
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                warn!("Failed to spawn {} worker: {}", self.kind, err);
                self.shared
                    .settle(&self.token, Outcome::Failed(format!("failed to spawn worker: {err}")));
                Err(TaskError::Spawn(err))
            }
        }
    }

    /// Request cancellation.
    ///
    /// Idempotent. Before `start()` it only sets the flag, so `start()` will
    /// settle as cancelled without running the job. While running it moves
    /// the task to `CancelRequested` and runs the job's escalation once.
    /// After a terminal state it does nothing.
    ///
    /// Returns `true` if this call changed anything.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        match inner.state {
            TaskState::Idle => {
                drop(inner);
                let first = self.token.cancel();
                if first {
                    info!("{} task cancelled before start", self.kind);
                }
                first
            }
            TaskState::Running => {
                inner.state = TaskState::CancelRequested;
                drop(inner);
                self.token.cancel();
                info!("Cancellation requested for {} task", self.kind);
                self.escalate();
                true
            }
            TaskState::CancelRequested => false,
            state => {
                debug!("Ignoring cancel for {} task in state {}", self.kind, state);
                false
            }
        }
    }

    fn escalate(&self) {
        if let Some(escalation) = &self.escalation
            && !self.escalated.swap(true, Ordering::SeqCst)
        {
            debug!("Escalating cancellation of {} task", self.kind);
            escalation.escalate();
        }
    }

    /// Block until the task is terminal or `timeout` elapses.
    ///
    /// Returns whether the task is terminal.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_timeout(timeout)
    }

    /// A handle for observing this run without borrowing the task.
    pub fn watch(&self) -> TaskWatch<J::Output> {
        TaskWatch {
            kind: self.kind,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancel, wait up to `grace` and abandon the worker if it has not
    /// settled.
    ///
    /// An abandoned worker thread keeps running detached until the job
    /// returns; its result is discarded. The task is then `Cancelled`, a
    /// `Cancelled` event is emitted and the escalation's
    /// [`force`](CancelEscalation::force) step runs.
    pub fn cancel_and_wait(&mut self, grace: Duration) -> ShutdownOutcome {
        let state = self.state();
        if !state.is_active() {
            if state == TaskState::Idle {
                self.cancel();
            }
            return ShutdownOutcome::Graceful;
        }

        self.cancel();
        if self.wait_timeout(grace) {
            self.join_worker();
            return ShutdownOutcome::Graceful;
        }
        self.abandon()
    }

    /// Settle as `Cancelled` and detach the worker, unless it already
    /// settled on its own.
    ///
    /// The second half of [`cancel_and_wait`](Self::cancel_and_wait), for
    /// callers that [`cancel`](Self::cancel) and wait on a [`TaskWatch`]
    /// themselves.
    pub fn abandon(&mut self) -> ShutdownOutcome {
        if self.shared.settle(&self.token, Outcome::Cancelled).is_none() {
            self.join_worker();
            return ShutdownOutcome::Graceful;
        }

        warn!(
            "{} task did not stop in time; abandoning its worker thread",
            self.kind
        );
        self.handle.take();
        if let Some(escalation) = &self.escalation {
            escalation.force();
        }
        ShutdownOutcome::Forced
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("{} worker thread panicked outside the job", self.kind);
        }
    }

    /// Next event, if one is queued.
    pub fn try_next_event(&self) -> Option<TaskEvent<J::Output>> {
        self.events.try_recv().ok()
    }

    /// Next event, waiting up to `timeout`.
    pub fn next_event_timeout(&self, timeout: Duration) -> Option<TaskEvent<J::Output>> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Every queued event, in order.
    pub fn drain_events(&self) -> Vec<TaskEvent<J::Output>> {
        self.events.try_iter().collect()
    }
}

impl<J: TaskJob> Drop for BackgroundTask<J> {
    fn drop(&mut self) {
        if self.state().is_active() {
            debug!("Dropping active {} task; cancelling and detaching", self.kind);
            self.cancel();
        }
    }
}

impl<J: TaskJob> std::fmt::Debug for BackgroundTask<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
