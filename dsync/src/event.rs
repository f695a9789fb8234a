use std::{fmt, ops, sync::Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{EntryKind, Error};

/// Why an entry was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Same modification time on both sides
    UpToDate,
    /// Remote copy is newer or missing locally but pulling is disabled
    PullDisabled,
    /// Local copy is newer or missing remotely but pushing is disabled
    PushDisabled,
    /// File on one side, directory on the other
    KindMismatch,
    /// Link or special entry
    Unsupported,
    NotDownloadable,
    /// Several entries share the name in the same folder
    DuplicateName,
}

impl SkipReason {
    /// Skips that leave the mapping out of agreement
    pub fn is_warning(self) -> bool {
        !matches!(
            self,
            SkipReason::UpToDate | SkipReason::PullDisabled | SkipReason::PushDisabled
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UpToDate => f.write_str("up to date"),
            SkipReason::PullDisabled => f.write_str("pulling is disabled"),
            SkipReason::PushDisabled => f.write_str("pushing is disabled"),
            SkipReason::KindMismatch => f.write_str("file on one side, directory on the other"),
            SkipReason::Unsupported => f.write_str("links and special files are not synchronized"),
            SkipReason::NotDownloadable => f.write_str("no downloadable content"),
            SkipReason::DuplicateName => f.write_str("several entries share this name"),
        }
    }
}

/// Event emitted by the merge engine for each decision.
/// Paths are relative to the root of the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Event {
    Pulled {
        path: Utf8PathBuf,
        kind: EntryKind,
    },
    Pushed {
        path: Utf8PathBuf,
        kind: EntryKind,
    },
    Skipped {
        path: Utf8PathBuf,
        reason: SkipReason,
    },
    Error {
        path: Utf8PathBuf,
        error: Error,
    },
}

impl Event {
    pub fn path(&self) -> &Utf8Path {
        match self {
            Event::Pulled { path, .. } => path,
            Event::Pushed { path, .. } => path,
            Event::Skipped { path, .. } => path,
            Event::Error { path, .. } => path,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Event::Pulled { .. } | Event::Pushed { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Pulled { path, kind } => write!(f, "pulled {kind} {path}"),
            Event::Pushed { path, kind } => write!(f, "pushed {kind} {path}"),
            Event::Skipped { path, reason } => write!(f, "skipped {path}: {reason}"),
            Event::Error { path, error } => write!(f, "error on {path}: {error}"),
        }
    }
}

/// Counters of a synchronization run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub pulled: usize,
    pub pushed: usize,
    pub up_to_date: usize,
    /// Skips due to a disabled direction
    pub held_back: usize,
    /// Skips that need attention
    pub skipped: usize,
    pub errors: usize,
}

impl Stats {
    pub fn record(&mut self, event: &Event) {
        match event {
            Event::Pulled { .. } => self.pulled += 1,
            Event::Pushed { .. } => self.pushed += 1,
            Event::Skipped {
                reason: SkipReason::UpToDate,
                ..
            } => self.up_to_date += 1,
            Event::Skipped { reason, .. } if reason.is_warning() => self.skipped += 1,
            Event::Skipped { .. } => self.held_back += 1,
            Event::Error { .. } => self.errors += 1,
        }
    }

    pub fn transfers(&self) -> usize {
        self.pulled + self.pushed
    }

    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.errors == 0
    }
}

impl ops::AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.pulled += rhs.pulled;
        self.pushed += rhs.pushed;
        self.up_to_date += rhs.up_to_date;
        self.held_back += rhs.held_back;
        self.skipped += rhs.skipped;
        self.errors += rhs.errors;
    }
}

impl ops::Add for Stats {
    type Output = Stats;

    fn add(mut self, rhs: Self) -> Stats {
        self += rhs;
        self
    }
}

/// Sink of the events emitted by the merge engine
pub trait Reporter: Send + Sync {
    fn report(&self, mapping: &str, event: &Event);
}

impl<R> Reporter for &R
where
    R: Reporter + ?Sized,
{
    fn report(&self, mapping: &str, event: &Event) {
        (**self).report(mapping, event)
    }
}

impl<R> Reporter for std::sync::Arc<R>
where
    R: Reporter + ?Sized,
{
    fn report(&self, mapping: &str, event: &Event) {
        (**self).report(mapping, event)
    }
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, mapping: &str, event: &Event) {
        match event {
            Event::Pulled { .. } | Event::Pushed { .. } => log::info!("[{mapping}] {event}"),
            Event::Skipped {
                reason: SkipReason::UpToDate,
                ..
            } => log::trace!("[{mapping}] {event}"),
            Event::Skipped { reason, .. } if reason.is_warning() => {
                log::warn!("[{mapping}] {event}")
            }
            Event::Skipped { .. } => log::debug!("[{mapping}] {event}"),
            Event::Error { .. } => log::error!("[{mapping}] {event}"),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct Collector {
    events: Mutex<Vec<(String, Event)>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Event)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Reporter for Collector {
    fn report(&self, mapping: &str, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((mapping.to_string(), event.clone()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Synchronized,
    SynchronizedWithSkips,
    Failed(Error),
}

impl Outcome {
    pub fn from_stats(stats: &Stats) -> Self {
        if stats.is_clean() {
            Outcome::Synchronized
        } else {
            Outcome::SynchronizedWithSkips
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(..))
    }
}

/// Result of the synchronization of one top-level mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingReport {
    pub remote_name: String,
    pub local_dir: Option<Utf8PathBuf>,
    pub outcome: Outcome,
    pub stats: Stats,
}

impl fmt::Display for MappingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local_dir {
            Some(local_dir) => write!(f, "{} <-> {local_dir}: ", self.remote_name)?,
            None => write!(f, "{}: ", self.remote_name)?,
        }
        let st = &self.stats;
        match &self.outcome {
            Outcome::Synchronized => write!(
                f,
                "fully synchronized ({} pulled, {} pushed)",
                st.pulled, st.pushed
            ),
            Outcome::SynchronizedWithSkips => write!(
                f,
                "synchronized with skipped entries ({} pulled, {} pushed, {} skipped, {} errors)",
                st.pulled, st.pushed, st.skipped, st.errors
            ),
            Outcome::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Result of a whole run
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Report {
    pub mappings: Vec<MappingReport>,
}

impl Report {
    pub fn mapping(&self, remote_name: &str) -> Option<&MappingReport> {
        self.mappings.iter().find(|m| m.remote_name == remote_name)
    }

    pub fn has_failures(&self) -> bool {
        self.mappings.iter().any(|m| m.outcome.is_failed())
    }

    pub fn total(&self) -> Stats {
        self.mappings
            .iter()
            .fold(Stats::default(), |acc, m| acc + m.stats)
    }
}
