//! hamelin-study: the study-session wizard.
//!
//! Drives one study (registry, observational or clinical trial) through the
//! wizard tabs: load data, pick variables, filter with inclusion/exclusion
//! criteria, auto-configure and train. Filtering comes from
//! [`hamelin_criteria`]; configuration and training run as background tasks
//! from [`hamelin_tasks`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hamelin_criteria::{Operator, Rule};
//! use hamelin_study::{StudyConfig, StudySession, StudyType, TracingSink};
//!
//! let session = StudySession::new(StudyType::Observational, StudyConfig::default(), Arc::new(TracingSink))?;
//! session.load_csv("cohort.csv")?;
//! session.select_variables(vec!["age".into(), "bmi".into()], "outcome")?;
//!
//! session.add_rule(Rule::inclusion("age", Operator::GreaterOrEqual, 18));
//! session.apply_criteria()?;
//!
//! session.start_training(engine, Some(plotter), runtime, Arc::new(session.config().reaper()?))?;
//! // on the UI tick
//! session.poll();
//! ```
//!
//! # Events
//!
//! Every state change the UI must react to is pushed through a
//! [`StudyEventSink`]; see [`events`] for names and payloads.

pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod state;

pub use config::{DEFAULT_HISTORY_LIMIT, StudyConfig, StudyConfigBuilder};
pub use error::{Result as StudyResult, StudyError};
pub use events::{ChannelSink, StudyEvent, StudyEventEmitter, StudyEventSink, TracingSink};
pub use session::StudySession;
pub use state::{
    ColumnInfo, DatasetInfo, ParseStudyTypeError, StudyType, TrainingHistoryEntry,
    TrainingSnapshot, TrainingSummary, VariableSelection, WizardTab,
};

static_assertions::assert_impl_all!(StudySession: Send, Sync);
static_assertions::assert_impl_all!(StudyConfig: Send, Sync, Clone);
