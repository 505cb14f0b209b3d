//! Best-effort cleanup of orphaned runtime worker processes.
//!
//! Shutting down a distributed runtime does not always stop every worker it
//! spawned. After a cancelled training run, a [`WorkerProcessReaper`] kills
//! OS processes that match an explicit allow-list of name patterns.
//!
//! Reaping never fails from the caller's point of view: every error is
//! logged and counted in the returned [`ReapReport`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, info, warn};

/// Default patterns for a Ray-style runtime.
pub const DEFAULT_WORKER_PATTERNS: &[&str] = &[
    "raylet",
    "gcs_server",
    "plasma_store",
    "ray::",
    r"default_worker\.py",
    r"dashboard\.py",
    r"log_monitor\.py",
];

static DEFAULT_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_WORKER_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Outcome of one reaping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapReport {
    /// Processes whose name or command line matched a pattern.
    pub matched: usize,
    /// Matched processes that accepted the kill signal.
    pub killed: usize,
    /// Matched processes that could not be killed.
    pub failed: usize,
}

/// Forcibly terminates worker processes left behind by a runtime.
pub trait WorkerProcessReaper: Send + Sync {
    /// Kill every matching process. Must not panic or return an error.
    fn reap(&self) -> ReapReport;
}

/// Kills processes whose name or command line matches any pattern.
///
/// Never kills the current process.
#[derive(Debug, Clone)]
pub struct PatternReaper {
    patterns: Vec<Regex>,
}

impl Default for PatternReaper {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_REGEXES.clone(),
        }
    }
}

impl PatternReaper {
    /// Compile a reaper from regex patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    /// Whether a process with this name and command line should be killed.
    pub fn matches(&self, name: &str, command_line: &str) -> bool {
        self.patterns
            .iter()
            .any(|re| re.is_match(name) || re.is_match(command_line))
    }
}

impl WorkerProcessReaper for PatternReaper {
    fn reap(&self) -> ReapReport {
        let mut report = ReapReport::default();
        if self.patterns.is_empty() {
            return report;
        }

        let own_pid = sysinfo::get_current_pid().ok();
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::OnlyIfNotSet),
        );

        for (pid, process) in system.processes() {
            if Some(*pid) == own_pid {
                continue;
            }

            let name = process.name().to_string_lossy();
            let command_line = process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            if !self.matches(&name, &command_line) {
                continue;
            }

            report.matched += 1;
            if process.kill() {
                debug!("Killed worker process {} ({})", pid, name);
                report.killed += 1;
            } else {
                warn!("Failed to kill worker process {} ({})", pid, name);
                report.failed += 1;
            }
        }

        if report.matched > 0 {
            info!(
                "Reaped worker processes: {} matched, {} killed, {} failed",
                report.matched, report.killed, report.failed
            );
        }
        report
    }
}

/// A reaper that does nothing, for engines without external workers and
/// for platforms where process enumeration is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReaper;

impl WorkerProcessReaper for NoopReaper {
    fn reap(&self) -> ReapReport {
        ReapReport::default()
    }
}
