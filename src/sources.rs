//! Data collaborators the insight engine reads from
//!
//! The engine never owns storage. It asks a [`JournalSource`] for the
//! signals it needs and treats every failure as that signal being absent.
//! [`InMemoryJournal`] backs the CLI with a JSON journal export and is the
//! reference implementation for tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Result, SourceError};
use crate::goals::{GoalPeriod, GoalTargets};
use crate::models::{
    CompetitionEvent, InjuryContext, ReadinessCheckIn, SessionAttackDefenceTally, SessionSummary,
    WearableRecovery,
};

/// Read-only view of a practitioner's training journal
///
/// Ranges are half-open, `[start, end)`.
pub trait JournalSource {
    fn readiness_by_date(&self, date: NaiveDate)
        -> std::result::Result<Option<ReadinessCheckIn>, SourceError>;

    /// Most recent wearable snapshot, whatever its date
    fn latest_wearable_recovery(&self) -> std::result::Result<Option<WearableRecovery>, SourceError>;

    fn wearable_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<WearableRecovery>, SourceError>;

    fn session_tallies_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<SessionAttackDefenceTally>, SourceError>;

    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<SessionSummary>, SourceError>;

    /// Up to `limit` sessions dated on or before `until`, newest first
    fn recent_sessions(
        &self,
        until: NaiveDate,
        limit: usize,
    ) -> std::result::Result<Vec<SessionSummary>, SourceError>;

    fn injury_context(&self) -> std::result::Result<InjuryContext, SourceError>;

    fn competition_calendar(&self) -> std::result::Result<Vec<CompetitionEvent>, SourceError>;

    fn goal_targets(&self, period: GoalPeriod)
        -> std::result::Result<Option<GoalTargets>, SourceError>;
}

/// Journal export as written by the logging app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSnapshot {
    #[serde(default)]
    pub check_ins: Vec<ReadinessCheckIn>,

    #[serde(default)]
    pub wearable: Vec<WearableRecovery>,

    #[serde(default)]
    pub sessions: Vec<SessionSummary>,

    #[serde(default)]
    pub tallies: Vec<SessionAttackDefenceTally>,

    #[serde(default)]
    pub injuries: InjuryContext,

    #[serde(default)]
    pub competitions: Vec<CompetitionEvent>,

    #[serde(default)]
    pub goals: Vec<GoalTargets>,
}

/// [`JournalSource`] over an in-memory snapshot
#[derive(Debug, Clone, Default)]
pub struct InMemoryJournal {
    snapshot: JournalSnapshot,
}

impl InMemoryJournal {
    pub fn new(snapshot: JournalSnapshot) -> Self {
        InMemoryJournal { snapshot }
    }

    /// Load a JSON journal export
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let snapshot: JournalSnapshot = serde_json::from_str(&content)?;

        info!(
            path = %path.as_ref().display(),
            check_ins = snapshot.check_ins.len(),
            sessions = snapshot.sessions.len(),
            tallies = snapshot.tallies.len(),
            "Journal loaded"
        );

        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &JournalSnapshot {
        &self.snapshot
    }
}

fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    date >= start && date < end
}

impl JournalSource for InMemoryJournal {
    fn readiness_by_date(
        &self,
        date: NaiveDate,
    ) -> std::result::Result<Option<ReadinessCheckIn>, SourceError> {
        // Last entry wins when the app logged the same day twice
        Ok(self
            .snapshot
            .check_ins
            .iter()
            .rev()
            .find(|c| c.date == date)
            .cloned())
    }

    fn latest_wearable_recovery(&self) -> std::result::Result<Option<WearableRecovery>, SourceError> {
        Ok(self.snapshot.wearable.iter().max_by_key(|w| w.date).cloned())
    }

    fn wearable_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<WearableRecovery>, SourceError> {
        Ok(self
            .snapshot
            .wearable
            .iter()
            .filter(|w| in_range(w.date, start, end))
            .cloned()
            .collect())
    }

    fn session_tallies_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<SessionAttackDefenceTally>, SourceError> {
        Ok(self
            .snapshot
            .tallies
            .iter()
            .filter(|t| in_range(t.date, start, end))
            .cloned()
            .collect())
    }

    fn sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<SessionSummary>, SourceError> {
        Ok(self
            .snapshot
            .sessions
            .iter()
            .filter(|s| in_range(s.date, start, end))
            .cloned()
            .collect())
    }

    fn recent_sessions(
        &self,
        until: NaiveDate,
        limit: usize,
    ) -> std::result::Result<Vec<SessionSummary>, SourceError> {
        let mut sessions: Vec<SessionSummary> = self
            .snapshot
            .sessions
            .iter()
            .filter(|s| s.date <= until)
            .cloned()
            .collect();
        // Stable: same-day sessions keep their logged order, later entries first
        sessions.reverse();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        sessions.truncate(limit);
        Ok(sessions)
    }

    fn injury_context(&self) -> std::result::Result<InjuryContext, SourceError> {
        Ok(self.snapshot.injuries.clone())
    }

    fn competition_calendar(&self) -> std::result::Result<Vec<CompetitionEvent>, SourceError> {
        Ok(self.snapshot.competitions.clone())
    }

    fn goal_targets(
        &self,
        period: GoalPeriod,
    ) -> std::result::Result<Option<GoalTargets>, SourceError> {
        Ok(self
            .snapshot
            .goals
            .iter()
            .find(|g| g.period == period)
            .cloned())
    }
}
