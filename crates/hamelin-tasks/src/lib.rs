//! hamelin-tasks: background configuration and training with cooperative
//! cancellation.
//!
//! Long-running AutoML work runs on a dedicated worker thread so the caller
//! (usually a UI controller) never blocks. Each run is a [`BackgroundTask`]
//! driving one [`TaskJob`] and reporting [`TaskEvent`]s in order.
//!
//! # Features
//!
//! - **Lifecycle**: `Idle → Running → Finished | Failed | Cancelled`, with
//!   `CancelRequested` in between when the user cancels (see [`TaskState`])
//! - **Cooperative cancellation**: jobs check a [`CancellationToken`] at
//!   named [`Checkpoint`]s between engine calls
//! - **Escalation**: a cancelled [`TrainingJob`] shuts down the
//!   [`DistributedRuntime`] and kills leftover worker processes through a
//!   [`WorkerProcessReaper`]
//! - **Forced termination**: [`BackgroundTask::cancel_and_wait`] abandons a
//!   worker that ignores cancellation past its grace period
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hamelin_tasks::{BackgroundTask, PatternReaper, TaskConfig, TaskEvent, TrainingJob};
//!
//! let config = TaskConfig::builder().target_column("outcome").build()?;
//! let job = TrainingJob::builder(engine, dataset, config)
//!     .runtime(runtime)
//!     .reaper(Arc::new(PatternReaper::default()))
//!     .build()?;
//!
//! let mut task = BackgroundTask::new(job);
//! task.start()?;
//!
//! // later, from the UI
//! task.cancel_and_wait(Duration::from_secs(2));
//! for event in task.drain_events() {
//!     println!("{}", event.name());
//! }
//! ```
//!
//! # Engine Interfaces
//!
//! The AutoML engine, plotting library and distributed runtime are reached
//! only through [`AutoMlEngine`], [`ResultPlotter`] and
//! [`DistributedRuntime`]. Their failures are opaque [`EngineError`]
//! messages.
//!
//! # Thread Safety
//!
//! A task's state is shared with its worker through a mutex and condition
//! variable; events travel over a channel. The handle itself is `Send` and
//! may be moved to whichever thread owns the session.

mod cancellation;
mod config;
mod engine;
mod error;
mod jobs;
mod progress;
mod reaper;
mod runtime;
mod state;
mod task;

// Re-export public API
//
// Cancellation token
pub use cancellation::CancellationToken;
// Configuration types
pub use config::{
    DEFAULT_GRACE_PERIOD, DEFAULT_TIME_BUDGET, ProblemType, RuntimeConfig, RuntimeConfigBuilder,
    ShutdownConfig, ShutdownConfigBuilder, TaskConfig, TaskConfigBuilder,
};
// External engine interfaces
pub use engine::{
    AutoConfig, AutoMlEngine, Chart, ConfusionMatrix, EngineError, Metrics, ResultPlotter,
    TrainedModel,
};
// Error types
pub use error::{Result as TaskResult, TaskError};
// Jobs
pub use jobs::{ConfigurationJob, TrainingEscalation, TrainingJob, TrainingJobBuilder, TrainingReport};
// Progress reporting types
pub use progress::{
    Checkpoint, ParseTaskStageError, ProgressCallback, ProgressUpdate, TaskStage,
};
// Worker cleanup
pub use reaper::{DEFAULT_WORKER_PATTERNS, NoopReaper, PatternReaper, ReapReport, WorkerProcessReaper};
// Runtime
pub use runtime::{DistributedRuntime, LocalRuntime};
// Lifecycle
pub use state::{ParseTaskStateError, ShutdownOutcome, TaskKind, TaskState};
// Task runner
pub use task::{BackgroundTask, CancelEscalation, TaskContext, TaskEvent, TaskJob, TaskWatch};

static_assertions::assert_impl_all!(BackgroundTask<TrainingJob>: Send);
static_assertions::assert_impl_all!(BackgroundTask<ConfigurationJob>: Send);
static_assertions::assert_impl_all!(TaskWatch<TrainingReport>: Send, Sync, Clone);
static_assertions::assert_impl_all!(TaskContext: Send, Sync, Clone);
static_assertions::assert_impl_all!(TrainingReport: Send, Sync, Clone);
static_assertions::assert_impl_all!(TaskError: Send, Sync);
