//! Insight pipeline
//!
//! [`InsightEngine`] pulls signals from a [`JournalSource`], runs the pure
//! calculators and assembles the payloads the app renders. Collaborator
//! failures never escape: each one is logged and the signal is treated as
//! absent, so the worst case is a check-in prompt or an empty grid.

use chrono::{Days, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{Result, SourceError};
use crate::focus::{detect_imbalance, rank_focus, FocusSuggestion, Imbalance};
use crate::goals::{goal_progress, GoalPeriod, GoalProgress};
use crate::heatmap::{aggregate_periods, grid_range, HeatmapPeriod, ViewMode};
use crate::models::{ReadinessCheckIn, SessionAttackDefenceTally, WearableRecovery};
use crate::recommendation::{fuse, DailyRecommendation, DayPart};
use crate::recovery::hrv_trend;
use crate::rules::{RuleContext, RuleEngine};
use crate::sources::JournalSource;
use crate::trends::{analyze_trends, sessions_with_data, TrendRecord, TrendVerdict, WindowTotals};

/// Trend, imbalance and focus verdict over the weekly grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightDynamicsInsights {
    pub has_sufficient_data: bool,
    pub sessions_with_data: usize,
    pub sessions_needed: usize,

    pub recent_period: Option<WindowTotals>,
    pub previous_period: Option<WindowTotals>,

    pub offensive_trend: Option<TrendRecord>,
    pub defensive_trend: Option<TrendRecord>,

    /// Attack/defence split of the recent window
    pub imbalance: Option<Imbalance>,

    /// Most urgent first
    pub suggested_focus: Vec<FocusSuggestion>,
    pub primary_focus: Option<FocusSuggestion>,
}

impl FightDynamicsInsights {
    fn insufficient(sessions_with_data: usize, sessions_needed: usize) -> Self {
        FightDynamicsInsights {
            has_sufficient_data: false,
            sessions_with_data,
            sessions_needed,
            recent_period: None,
            previous_period: None,
            offensive_trend: None,
            defensive_trend: None,
            imbalance: None,
            suggested_focus: Vec::new(),
            primary_focus: None,
        }
    }
}

/// Log a collaborator failure and carry on without the signal
fn absent_on_failure<T>(signal: &str, result: std::result::Result<T, SourceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                signal,
                source_name = err.source_name(),
                error = %err,
                "Collaborator failed, treating signal as absent"
            );
            None
        }
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

/// Stateless facade over a journal and a set of thresholds
pub struct InsightEngine<'a, S: JournalSource> {
    source: &'a S,
    config: EngineConfig,
    rules: RuleEngine,
}

impl<'a, S: JournalSource> InsightEngine<'a, S> {
    pub fn new(source: &'a S, config: EngineConfig) -> Self {
        let rules = RuleEngine::new(config.rules.clone());
        InsightEngine {
            source,
            config,
            rules,
        }
    }

    /// Engine with a custom rule catalog
    pub fn with_rule_engine(source: &'a S, config: EngineConfig, rules: RuleEngine) -> Self {
        InsightEngine {
            source,
            config,
            rules,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The "what should I do today" recommendation for the local time `now`
    #[instrument(skip(self), fields(date = %now.date()))]
    pub fn daily_recommendation(&self, now: NaiveDateTime) -> DailyRecommendation {
        let today = now.date();
        let rule_cfg = &self.config.rules;

        let readiness = absent_on_failure("readiness", self.source.readiness_by_date(today));
        let check_in: Option<ReadinessCheckIn> = readiness.flatten();
        let has_checked_in = check_in.is_some();

        let composite_score = check_in.as_ref().and_then(|c| match c.composite_score() {
            Ok(score) => Some(score),
            Err(err) => {
                warn!(error = %err, "Ignoring invalid check-in");
                None
            }
        });

        let wearable = self.wearable_for(today);
        let recovery_tier = wearable.as_ref().and_then(|w| match w.tier() {
            Ok(tier) => Some(tier),
            Err(err) => {
                warn!(error = %err, "Ignoring invalid wearable snapshot");
                None
            }
        });

        let composite_tier = composite_score.map(crate::readiness::Tier::from_composite);
        let fused = fuse(composite_tier, recovery_tier, has_checked_in);

        let hrv = if wearable.as_ref().is_some_and(|w| w.hrv_ms.is_some()) {
            let start = days_before(today, self.config.hrv.lookback_days as u64);
            absent_on_failure(
                "wearable_history",
                self.source.wearable_history(start, day_after(today)),
            )
            .and_then(|history| hrv_trend(&history, &self.config.hrv))
        } else {
            None
        };

        // Sleep debt looks back over consecutive days, today first
        let recent_check_ins: Vec<ReadinessCheckIn> = (0..rule_cfg.sleep_debt_window as u64)
            .filter_map(|offset| {
                let day = days_before(today, offset);
                if offset == 0 {
                    return check_in.clone();
                }
                absent_on_failure("readiness", self.source.readiness_by_date(day)).flatten()
            })
            .filter(|c| c.validate().is_ok())
            .collect();

        let lookback = (rule_cfg.stale_technique_days as u64 * 2).max(7);
        let window_sessions = absent_on_failure(
            "sessions",
            self.source
                .sessions_in_range(days_before(today, lookback), day_after(today)),
        )
        .unwrap_or_default();

        let recent_sessions = absent_on_failure(
            "recent_sessions",
            self.source
                .recent_sessions(today, self.config.recent_session_limit),
        )
        .unwrap_or_default();

        let ctx = RuleContext {
            today,
            tier: Some(fused.tier),
            composite_tier,
            check_in: check_in.filter(|c| c.validate().is_ok()),
            recent_check_ins,
            wearable: wearable.clone(),
            hrv,
            injuries: absent_on_failure("injuries", self.source.injury_context())
                .unwrap_or_default(),
            recent_sessions,
            window_sessions,
            competitions: absent_on_failure("competitions", self.source.competition_calendar())
                .unwrap_or_default(),
        };

        let outcome = self.rules.evaluate(&ctx);

        info!(
            tier = %fused.tier,
            source = ?fused.source,
            composite = ?composite_score,
            rules_fired = outcome.triggered_rules.len(),
            "Daily recommendation ready"
        );

        DailyRecommendation {
            date: today,
            day_part: DayPart::from_time(now),
            label: fused.tier.label().to_string(),
            primary_tier: fused.tier,
            source: fused.source,
            show_check_in_prompt: fused.show_check_in_prompt(),
            composite_score,
            recovery_score: wearable.and_then(|w| w.recovery_score),
            suggestion_text: outcome.suggestion_text,
            triggered_rules: outcome.triggered_rules,
        }
    }

    /// Today's wearable snapshot; stale snapshots from earlier days don't count
    fn wearable_for(&self, today: NaiveDate) -> Option<WearableRecovery> {
        let from_history = absent_on_failure(
            "wearable_history",
            self.source.wearable_history(today, day_after(today)),
        )
        .and_then(|history| history.into_iter().max_by_key(|w| w.date));

        if from_history.is_some() {
            return from_history;
        }

        absent_on_failure("wearable", self.source.latest_wearable_recovery())
            .flatten()
            .filter(|w| {
                let fresh = w.date == today;
                if !fresh {
                    debug!(snapshot_date = %w.date, "Latest wearable snapshot is stale");
                }
                fresh
            })
    }

    /// Period buckets for the heatmap; always the full grid, empty if no data
    #[instrument(skip(self))]
    pub fn fight_dynamics_heatmap(
        &self,
        view: ViewMode,
        today: NaiveDate,
    ) -> Result<Vec<HeatmapPeriod>> {
        let tallies = self.tallies_for_grid(view, today)?;
        aggregate_periods(view, today, &tallies)
    }

    /// Trend, imbalance and focus analysis over the weekly grid
    #[instrument(skip(self))]
    pub fn fight_dynamics_insights(&self, today: NaiveDate) -> Result<FightDynamicsInsights> {
        let tallies = self.tallies_for_grid(ViewMode::Weekly, today)?;
        let periods = aggregate_periods(ViewMode::Weekly, today, &tallies)?;
        let with_data = sessions_with_data(&periods, &tallies);

        match analyze_trends(&periods, with_data, &self.config.trends) {
            TrendVerdict::InsufficientData {
                sessions_with_data,
                sessions_needed,
            } => {
                debug!(sessions_with_data, sessions_needed, "Not enough data for trends");
                Ok(FightDynamicsInsights::insufficient(
                    sessions_with_data,
                    sessions_needed,
                ))
            }
            TrendVerdict::Trends {
                recent,
                previous,
                offense,
                defense,
            } => {
                let imbalance = detect_imbalance(
                    recent.attacks_attempted,
                    recent.defenses_attempted,
                    &self.config.imbalance,
                );
                let plan = rank_focus(&imbalance, &recent, &self.config.focus);

                info!(
                    offense = ?offense.volume_change,
                    defense = ?defense.volume_change,
                    imbalance = imbalance.detected,
                    "Fight dynamics analyzed"
                );

                Ok(FightDynamicsInsights {
                    has_sufficient_data: true,
                    sessions_with_data: with_data,
                    sessions_needed: self.config.trends.min_sessions,
                    recent_period: Some(recent),
                    previous_period: Some(previous),
                    offensive_trend: Some(offense),
                    defensive_trend: Some(defense),
                    imbalance: Some(imbalance),
                    suggested_focus: plan.suggestions,
                    primary_focus: plan.primary_focus,
                })
            }
        }
    }

    /// Progress toward the targets of the period containing `today`
    ///
    /// Empty when no targets are set or the journal can't be read.
    #[instrument(skip(self))]
    pub fn goal_progress(&self, period: GoalPeriod, today: NaiveDate) -> Result<Vec<GoalProgress>> {
        let Some(targets) =
            absent_on_failure("goal_targets", self.source.goal_targets(period)).flatten()
        else {
            return Ok(Vec::new());
        };

        let (start, end) = period.bounds(today)?;
        let Some(sessions) =
            absent_on_failure("sessions", self.source.sessions_in_range(start, end))
        else {
            return Ok(Vec::new());
        };

        Ok(goal_progress(&targets, &sessions))
    }

    /// Tallies inside the grid, minus any the collaborator got wrong
    fn tallies_for_grid(
        &self,
        view: ViewMode,
        today: NaiveDate,
    ) -> Result<Vec<SessionAttackDefenceTally>> {
        let (start, end) = grid_range(view, today)?;
        let tallies = absent_on_failure(
            "tallies",
            self.source.session_tallies_in_range(start, end),
        )
        .unwrap_or_default();

        let (valid, invalid): (Vec<_>, Vec<_>) =
            tallies.into_iter().partition(|t| t.validate().is_ok());
        if !invalid.is_empty() {
            warn!(dropped = invalid.len(), "Dropping inconsistent session tallies");
        }
        Ok(valid)
    }
}

impl<'a, S: JournalSource + Sync> InsightEngine<'a, S> {
    /// Recommendations for many moments at once, in input order
    pub fn daily_recommendations(&self, moments: &[NaiveDateTime]) -> Vec<DailyRecommendation> {
        moments
            .par_iter()
            .map(|now| self.daily_recommendation(*now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalTargets;
    use crate::models::{ClassType, CompetitionEvent, InjuryContext, SessionSummary};
    use crate::readiness::Tier;
    use crate::recommendation::SignalSource;
    use crate::sources::{InMemoryJournal, JournalSnapshot};
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn at(m: u32, d: u32, hour: u32) -> NaiveDateTime {
        date(m, d).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn check_in(day: NaiveDate, sliders: (u8, u8, u8, u8)) -> ReadinessCheckIn {
        ReadinessCheckIn {
            date: day,
            sleep: sliders.0,
            stress: sliders.1,
            soreness: sliders.2,
            energy: sliders.3,
            hotspot_note: None,
            weight_kg: None,
        }
    }

    fn wearable(day: NaiveDate, score: u8) -> WearableRecovery {
        WearableRecovery {
            date: day,
            recovery_score: Some(score),
            hrv_ms: None,
            resting_hr: None,
        }
    }

    fn tally(id: &str, day: NaiveDate, att: (u32, u32), def: (u32, u32)) -> SessionAttackDefenceTally {
        SessionAttackDefenceTally {
            session_id: id.to_string(),
            date: day,
            attacks_attempted: att.0,
            attacks_successful: att.1,
            defenses_attempted: def.0,
            defenses_successful: def.1,
        }
    }

    /// Every call fails
    struct DownJournal;

    impl JournalSource for DownJournal {
        fn readiness_by_date(&self, _: NaiveDate) -> std::result::Result<Option<ReadinessCheckIn>, SourceError> {
            Err(SourceError::unavailable("readiness", "timeout"))
        }
        fn latest_wearable_recovery(&self) -> std::result::Result<Option<WearableRecovery>, SourceError> {
            Err(SourceError::unavailable("whoop", "token expired"))
        }
        fn wearable_history(&self, _: NaiveDate, _: NaiveDate) -> std::result::Result<Vec<WearableRecovery>, SourceError> {
            Err(SourceError::unavailable("whoop", "token expired"))
        }
        fn session_tallies_in_range(&self, _: NaiveDate, _: NaiveDate) -> std::result::Result<Vec<SessionAttackDefenceTally>, SourceError> {
            Err(SourceError::unavailable("tallies", "timeout"))
        }
        fn sessions_in_range(&self, _: NaiveDate, _: NaiveDate) -> std::result::Result<Vec<SessionSummary>, SourceError> {
            Err(SourceError::unavailable("sessions", "timeout"))
        }
        fn recent_sessions(&self, _: NaiveDate, _: usize) -> std::result::Result<Vec<SessionSummary>, SourceError> {
            Err(SourceError::unavailable("sessions", "timeout"))
        }
        fn injury_context(&self) -> std::result::Result<InjuryContext, SourceError> {
            Err(SourceError::unavailable("injuries", "timeout"))
        }
        fn competition_calendar(&self) -> std::result::Result<Vec<CompetitionEvent>, SourceError> {
            Err(SourceError::unavailable("calendar", "timeout"))
        }
        fn goal_targets(&self, _: GoalPeriod) -> std::result::Result<Option<GoalTargets>, SourceError> {
            Err(SourceError::unavailable("goals", "timeout"))
        }
    }

    #[test]
    fn test_check_in_beats_wearable() {
        let today = date(9, 18);
        let journal = InMemoryJournal::new(JournalSnapshot {
            check_ins: vec![check_in(today, (5, 1, 1, 5))],
            wearable: vec![wearable(today, 20)],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let rec = engine.daily_recommendation(at(9, 18, 7));
        assert_eq!(rec.primary_tier, Tier::TrainHard);
        assert_eq!(rec.source, SignalSource::SelfReport);
        assert_eq!(rec.composite_score, Some(20));
        assert_eq!(rec.recovery_score, Some(20));
        assert_eq!(rec.day_part, DayPart::Morning);
        // Low recovery still shows up as a rule badge
        assert!(rec.triggered_rules.iter().any(|r| r.name == "whoop_low_recovery"));
    }

    #[test]
    fn test_wearable_fallback_before_check_in() {
        let today = date(9, 18);
        let journal = InMemoryJournal::new(JournalSnapshot {
            wearable: vec![wearable(today, 50)],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let rec = engine.daily_recommendation(at(9, 18, 13));
        assert_eq!(rec.primary_tier, Tier::LightSession);
        assert_eq!(rec.source, SignalSource::Wearable);
        assert!(!rec.show_check_in_prompt);
        assert!(rec.triggered_rules.is_empty());
        assert_eq!(rec.suggestion_text, Tier::CheckIn.fallback_suggestion());
    }

    #[test]
    fn test_stale_wearable_ignored() {
        let journal = InMemoryJournal::new(JournalSnapshot {
            wearable: vec![wearable(date(9, 14), 90)],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let rec = engine.daily_recommendation(at(9, 18, 9));
        assert_eq!(rec.primary_tier, Tier::CheckIn);
        assert!(rec.show_check_in_prompt);
        assert_eq!(rec.recovery_score, None);
    }

    #[test]
    fn test_everything_down_degrades_to_check_in() {
        let engine = InsightEngine::new(&DownJournal, EngineConfig::default());

        let rec = engine.daily_recommendation(at(9, 18, 19));
        assert_eq!(rec.primary_tier, Tier::CheckIn);
        assert!(rec.show_check_in_prompt);
        assert!(rec.triggered_rules.is_empty());
        assert!(!rec.suggestion_text.is_empty());
        assert_eq!(rec.day_part, DayPart::Evening);

        let periods = engine
            .fight_dynamics_heatmap(ViewMode::Weekly, date(9, 18))
            .unwrap();
        assert_eq!(periods.len(), 8);

        let insights = engine.fight_dynamics_insights(date(9, 18)).unwrap();
        assert!(!insights.has_sufficient_data);

        assert!(engine
            .goal_progress(GoalPeriod::Weekly, date(9, 18))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_tallies_dropped() {
        let today = date(9, 18);
        let journal = InMemoryJournal::new(JournalSnapshot {
            tallies: vec![
                tally("ok", today, (10, 4), (6, 3)),
                tally("bad", today, (2, 5), (0, 0)),
            ],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let periods = engine.fight_dynamics_heatmap(ViewMode::Weekly, today).unwrap();
        let last = periods.last().unwrap();
        assert_eq!(last.attacks_attempted, 10);
        assert_eq!(last.session_count, 1);
    }

    #[test]
    fn test_insights_with_trends() {
        let today = date(9, 18);
        let mut tallies = Vec::new();
        // Previous four weeks: 10 attacks each; recent four: 20 attacks each
        for week in 0..8u64 {
            let day = today - chrono::Duration::weeks(week as i64);
            let attacks = if week < 4 { 20 } else { 10 };
            tallies.push(tally(&format!("s{}", week), day, (attacks, attacks / 2), (5, 1)));
        }
        let journal = InMemoryJournal::new(JournalSnapshot {
            tallies,
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let insights = engine.fight_dynamics_insights(today).unwrap();
        assert!(insights.has_sufficient_data);
        assert_eq!(insights.sessions_with_data, 8);

        let offense = insights.offensive_trend.unwrap();
        assert_eq!(offense.volume_change_pct, dec!(100));

        // 80 attacks vs 20 defenses in the recent window
        let imbalance = insights.imbalance.unwrap();
        assert!(imbalance.detected);
        let primary = insights.primary_focus.unwrap();
        assert_eq!(primary.area, crate::focus::FocusArea::Defense);
    }

    #[test]
    fn test_goal_progress_current_week() {
        let today = date(9, 18);
        let session = |id: &str, day: NaiveDate| SessionSummary {
            id: id.to_string(),
            date: day,
            class_type: ClassType::Gi,
            duration_minutes: 60,
        };
        let journal = InMemoryJournal::new(JournalSnapshot {
            sessions: vec![
                session("last-week", date(9, 15)),
                session("mon", date(9, 16)),
                session("wed", date(9, 18)),
            ],
            goals: vec![GoalTargets {
                period: GoalPeriod::Weekly,
                sessions: Some(4),
                hours: None,
                class_types: Default::default(),
            }],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());

        let progress = engine.goal_progress(GoalPeriod::Weekly, today).unwrap();
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].actual, dec!(2));
        assert_eq!(progress[0].pct, 50);
    }

    #[test]
    fn test_batch_matches_single() {
        let journal = InMemoryJournal::new(JournalSnapshot {
            check_ins: vec![
                check_in(date(9, 16), (5, 1, 1, 5)),
                check_in(date(9, 17), (2, 4, 4, 2)),
            ],
            ..Default::default()
        });
        let engine = InsightEngine::new(&journal, EngineConfig::default());
        let moments = [at(9, 16, 8), at(9, 17, 8), at(9, 18, 8)];

        let batch = engine.daily_recommendations(&moments);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].primary_tier, Tier::TrainHard);
        assert_eq!(batch[1].primary_tier, Tier::RestDay);
        assert_eq!(batch[2].primary_tier, Tier::CheckIn);
        assert_eq!(batch[1], engine.daily_recommendation(moments[1]));
    }
}
