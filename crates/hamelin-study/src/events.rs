//! Event system for session → presentation communication.
//!
//! The session pushes notifications through a [`StudyEventSink`]; the
//! presentation layer pulls larger data (reports, history) with getters.
//!
//! ```text
//! load_dataset()     ──► "dataset:loaded"       DatasetLoadedPayload
//! apply_criteria()   ──► "criteria:applied"     CriteriaAppliedPayload
//! add_drafts()       ──► "criteria:incomplete"  CriteriaIncompletePayload
//! advance()/back()   ──► "wizard:tab-changed"   TabChangedPayload
//!
//! poll():
//!   Progress         ──► "task:progress"        TaskProgressPayload
//!   Finished         ──► "task:finished"        TaskFinishedPayload
//!   Error            ──► "task:error"           TaskErrorPayload
//!   Cancelled        ──► "task:cancelled"       TaskCancelledPayload
//! ```

use std::sync::mpsc::Sender;

use hamelin_criteria::{FilterStats, FilterWarning, IncompleteRule};
use hamelin_tasks::{ProgressUpdate, TaskKind, TaskStage};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::state::{DatasetInfo, WizardTab};

// ============================================================================
// EVENT NAME CONSTANTS
// ============================================================================

/// A dataset was loaded. Payload: [`DatasetLoadedPayload`]
pub const EVENT_DATASET_LOADED: &str = "dataset:loaded";

/// Progress from a background task. Payload: [`TaskProgressPayload`]
pub const EVENT_TASK_PROGRESS: &str = "task:progress";

/// A background task finished. Payload: [`TaskFinishedPayload`]
pub const EVENT_TASK_FINISHED: &str = "task:finished";

/// A background task failed. Payload: [`TaskErrorPayload`]
pub const EVENT_TASK_ERROR: &str = "task:error";

/// A background task was cancelled. Payload: [`TaskCancelledPayload`]
pub const EVENT_TASK_CANCELLED: &str = "task:cancelled";

/// Criteria were applied. Payload: [`CriteriaAppliedPayload`]
pub const EVENT_CRITERIA_APPLIED: &str = "criteria:applied";

/// Submitted drafts were incomplete and ignored.
/// Payload: [`CriteriaIncompletePayload`]
pub const EVENT_CRITERIA_INCOMPLETE: &str = "criteria:incomplete";

/// The wizard moved to another tab. Payload: [`TabChangedPayload`]
pub const EVENT_TAB_CHANGED: &str = "wizard:tab-changed";

/// Error codes carried by `task:error`.
pub mod error_codes {
    pub const CONFIGURATION_FAILED: &str = "CONFIGURATION_FAILED";
    pub const TRAINING_FAILED: &str = "TRAINING_FAILED";
}

// ============================================================================
// EVENT PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DatasetLoadedPayload {
    pub info: DatasetInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskProgressPayload {
    pub task: TaskKind,
    pub stage: TaskStage,
    /// 0.0 to 1.0.
    pub progress: f64,
    pub message: String,
}

/// `result` is the [`AutoConfig`](hamelin_tasks::AutoConfig) for
/// configuration tasks and a
/// [`TrainingSummary`](crate::TrainingSummary) for training tasks.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFinishedPayload<'a, T: Serialize> {
    pub task: TaskKind,
    pub result: &'a T,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskErrorPayload {
    pub task: TaskKind,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCancelledPayload {
    pub task: TaskKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriteriaAppliedPayload {
    pub stats: FilterStats,
    pub warnings: Vec<FilterWarning>,
    /// One message per warning, in order.
    pub messages: Vec<String>,
}

/// One incomplete draft.
#[derive(Debug, Clone, Serialize)]
pub struct IncompleteDraftPayload {
    pub index: usize,
    pub missing: Vec<String>,
}

/// All incomplete drafts from one submission, reported together.
#[derive(Debug, Clone, Serialize)]
pub struct CriteriaIncompletePayload {
    pub count: usize,
    pub drafts: Vec<IncompleteDraftPayload>,
    pub message: String,
}

impl CriteriaIncompletePayload {
    pub fn new(incomplete: &[IncompleteRule]) -> Self {
        let drafts: Vec<IncompleteDraftPayload> = incomplete
            .iter()
            .map(|rule| IncompleteDraftPayload {
                index: rule.index,
                missing: rule.missing.clone(),
            })
            .collect();
        let details = drafts
            .iter()
            .map(|d| format!("rule {} (missing {})", d.index + 1, d.missing.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            count: drafts.len(),
            message: format!(
                "{} incomplete rule(s) ignored: {}",
                drafts.len(),
                details
            ),
            drafts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TabChangedPayload {
    pub from: WizardTab,
    pub to: WizardTab,
}

// ============================================================================
// SINKS
// ============================================================================

/// A serialized event.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

/// Receives session events. Must not block.
pub trait StudyEventSink: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// Logs events at debug level and drops them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StudyEventSink for TracingSink {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        debug!("event {}: {}", event, payload);
    }
}

/// Forwards events over a channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Mutex<Sender<StudyEvent>>,
}

impl ChannelSink {
    pub fn new(sender: Sender<StudyEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl StudyEventSink for ChannelSink {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        let event = StudyEvent {
            name: event.to_string(),
            payload,
        };
        if self.sender.lock().send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

// ============================================================================
// EVENT EMISSION HELPERS
// ============================================================================

fn emit_json<S: StudyEventSink + ?Sized>(sink: &S, event: &str, payload: &impl Serialize) {
    match serde_json::to_value(payload) {
        Ok(value) => sink.emit(event, value),
        Err(e) => warn!("Failed to serialize {} event: {}", event, e),
    }
}

/// Typed emit helpers, available on every sink.
pub trait StudyEventEmitter {
    fn emit_dataset_loaded(&self, info: &DatasetInfo);

    fn emit_task_progress(&self, task: TaskKind, update: &ProgressUpdate);

    fn emit_task_finished<T: Serialize>(&self, task: TaskKind, result: &T);

    fn emit_task_error(&self, task: TaskKind, code: &str, message: &str);

    fn emit_task_cancelled(&self, task: TaskKind);

    fn emit_criteria_applied(&self, stats: &FilterStats, warnings: &[FilterWarning]);

    /// Emit one consolidated event for every incomplete draft.
    fn emit_criteria_incomplete(&self, incomplete: &[IncompleteRule]);

    fn emit_tab_changed(&self, from: WizardTab, to: WizardTab);
}

impl<S: StudyEventSink + ?Sized> StudyEventEmitter for S {
    fn emit_dataset_loaded(&self, info: &DatasetInfo) {
        emit_json(self, EVENT_DATASET_LOADED, &DatasetLoadedPayload { info: info.clone() });
    }

    fn emit_task_progress(&self, task: TaskKind, update: &ProgressUpdate) {
        let payload = TaskProgressPayload {
            task,
            stage: update.stage,
            progress: update.progress,
            message: update.message.clone(),
        };
        emit_json(self, EVENT_TASK_PROGRESS, &payload);
    }

    fn emit_task_finished<T: Serialize>(&self, task: TaskKind, result: &T) {
        emit_json(self, EVENT_TASK_FINISHED, &TaskFinishedPayload { task, result });
    }

    fn emit_task_error(&self, task: TaskKind, code: &str, message: &str) {
        let payload = TaskErrorPayload {
            task,
            code: code.to_string(),
            message: message.to_string(),
        };
        emit_json(self, EVENT_TASK_ERROR, &payload);
    }

    fn emit_task_cancelled(&self, task: TaskKind) {
        emit_json(self, EVENT_TASK_CANCELLED, &TaskCancelledPayload { task });
    }

    fn emit_criteria_applied(&self, stats: &FilterStats, warnings: &[FilterWarning]) {
        let payload = CriteriaAppliedPayload {
            stats: stats.clone(),
            warnings: warnings.to_vec(),
            messages: warnings.iter().map(FilterWarning::message).collect(),
        };
        emit_json(self, EVENT_CRITERIA_APPLIED, &payload);
    }

    fn emit_criteria_incomplete(&self, incomplete: &[IncompleteRule]) {
        if incomplete.is_empty() {
            return;
        }
        emit_json(
            self,
            EVENT_CRITERIA_INCOMPLETE,
            &CriteriaIncompletePayload::new(incomplete),
        );
    }

    fn emit_tab_changed(&self, from: WizardTab, to: WizardTab) {
        emit_json(self, EVENT_TAB_CHANGED, &TabChangedPayload { from, to });
    }
}
