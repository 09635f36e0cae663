//! Fight dynamics trend analysis
//!
//! The heatmap grid is split into a "recent" window (the last four periods)
//! and a "previous" window (the four before it). Volume is compared as a
//! percentage change; success rate as a percentage-point change.
//!
//! A trend is only reported when there is enough history behind it. Thin
//! data yields [`TrendVerdict::InsufficientData`], a normal result rather
//! than an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::heatmap::{success_rate, HeatmapPeriod};
use crate::models::{round_half_up, SessionAttackDefenceTally};

/// Trend analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Periods per comparison window
    pub window_periods: usize,

    /// Changes within ±epsilon (percent / percentage points) are stable
    pub stable_epsilon: Decimal,

    /// Sessions with non-zero tallies needed across both windows
    pub min_sessions: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            window_periods: 4,
            stable_epsilon: dec!(5),
            min_sessions: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeChange {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateDirection {
    Improving,
    Declining,
    Stable,
}

/// Volume and success-rate movement for one side (offense or defense)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub volume_change: VolumeChange,
    pub volume_change_pct: Decimal,
    pub rate_direction: RateDirection,

    /// Percentage-point change of the success rate
    pub rate_change_pct: Decimal,

    pub recent_rate: Option<u8>,
    pub previous_rate: Option<u8>,
}

/// Summed tallies over a comparison window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowTotals {
    pub attacks_attempted: u64,
    pub attacks_successful: u64,
    pub defenses_attempted: u64,
    pub defenses_successful: u64,
    pub session_count: u64,

    /// Periods in the window that had at least one session
    pub active_periods: u32,
}

impl WindowTotals {
    pub fn from_periods(periods: &[HeatmapPeriod]) -> Self {
        // Periods are u32-bounded, so these u64 sums saturate only in theory
        let add = |sum: u64, value: u32| sum.saturating_add(value.into());
        periods.iter().fold(WindowTotals::default(), |mut acc, p| {
            acc.attacks_attempted = add(acc.attacks_attempted, p.attacks_attempted);
            acc.attacks_successful = add(acc.attacks_successful, p.attacks_successful);
            acc.defenses_attempted = add(acc.defenses_attempted, p.defenses_attempted);
            acc.defenses_successful = add(acc.defenses_successful, p.defenses_successful);
            acc.session_count = add(acc.session_count, p.session_count);
            if !p.is_empty() {
                acc.active_periods = acc.active_periods.saturating_add(1);
            }
            acc
        })
    }

    pub fn attack_success_rate(&self) -> Option<u8> {
        success_rate(self.attacks_successful, self.attacks_attempted)
    }

    pub fn defense_success_rate(&self) -> Option<u8> {
        success_rate(self.defenses_successful, self.defenses_attempted)
    }
}

/// Outcome of a window comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrendVerdict {
    InsufficientData {
        sessions_with_data: usize,
        sessions_needed: usize,
    },
    Trends {
        recent: WindowTotals,
        previous: WindowTotals,
        offense: TrendRecord,
        defense: TrendRecord,
    },
}

/// Split the grid into (previous, recent) windows of `window` periods each
pub fn split_windows(periods: &[HeatmapPeriod], window: usize) -> (&[HeatmapPeriod], &[HeatmapPeriod]) {
    let recent_start = periods.len().saturating_sub(window);
    let previous_start = recent_start.saturating_sub(window);
    (&periods[previous_start..recent_start], &periods[recent_start..])
}

/// Percent change of volume, guarded against an empty baseline
pub fn classify_volume(recent: u64, previous: u64, epsilon: Decimal) -> (VolumeChange, Decimal) {
    if previous == 0 {
        return (VolumeChange::Stable, Decimal::ZERO);
    }
    let pct = round_half_up(
        (Decimal::from(recent) - Decimal::from(previous)) / Decimal::from(previous) * dec!(100),
        1,
    );

    let change = if pct > epsilon {
        VolumeChange::Increasing
    } else if pct < -epsilon {
        VolumeChange::Decreasing
    } else {
        VolumeChange::Stable
    };
    (change, pct)
}

/// Percentage-point change of success rate; undefined rates are stable
pub fn classify_rate(
    recent: Option<u8>,
    previous: Option<u8>,
    epsilon: Decimal,
) -> (RateDirection, Decimal) {
    let (Some(recent), Some(previous)) = (recent, previous) else {
        return (RateDirection::Stable, Decimal::ZERO);
    };
    let delta = Decimal::from(recent) - Decimal::from(previous);

    let direction = if delta > epsilon {
        RateDirection::Improving
    } else if delta < -epsilon {
        RateDirection::Declining
    } else {
        RateDirection::Stable
    };
    (direction, delta)
}

fn trend_record(
    recent_volume: u64,
    previous_volume: u64,
    recent_rate: Option<u8>,
    previous_rate: Option<u8>,
    epsilon: Decimal,
) -> TrendRecord {
    let (volume_change, volume_change_pct) =
        classify_volume(recent_volume, previous_volume, epsilon);
    let (rate_direction, rate_change_pct) = classify_rate(recent_rate, previous_rate, epsilon);
    TrendRecord {
        volume_change,
        volume_change_pct,
        rate_direction,
        rate_change_pct,
        recent_rate,
        previous_rate,
    }
}

/// Distinct sessions whose tallies fall inside the grid and are non-zero
pub fn sessions_with_data(periods: &[HeatmapPeriod], tallies: &[SessionAttackDefenceTally]) -> usize {
    let (Some(first), Some(last)) = (periods.first(), periods.last()) else {
        return 0;
    };
    let mut ids: Vec<&str> = tallies
        .iter()
        .filter(|t| t.has_activity())
        .filter(|t| t.date >= first.period_start && t.date < last.period_end)
        .map(|t| t.session_id.as_str())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

/// Compare the recent window to the previous one
///
/// `sessions_with_data` is the count of distinct sessions with non-zero
/// tallies across both windows (see [`sessions_with_data`]).
pub fn analyze_trends(
    periods: &[HeatmapPeriod],
    sessions_with_data: usize,
    config: &TrendConfig,
) -> TrendVerdict {
    let (previous_periods, recent_periods) = split_windows(periods, config.window_periods);
    let recent = WindowTotals::from_periods(recent_periods);
    let previous = WindowTotals::from_periods(previous_periods);

    if sessions_with_data < config.min_sessions
        || recent.active_periods == 0
        || previous.active_periods == 0
    {
        return TrendVerdict::InsufficientData {
            sessions_with_data,
            sessions_needed: config.min_sessions,
        };
    }

    let offense = trend_record(
        recent.attacks_attempted,
        previous.attacks_attempted,
        recent.attack_success_rate(),
        previous.attack_success_rate(),
        config.stable_epsilon,
    );
    let defense = trend_record(
        recent.defenses_attempted,
        previous.defenses_attempted,
        recent.defense_success_rate(),
        previous.defense_success_rate(),
        config.stable_epsilon,
    );

    TrendVerdict::Trends {
        recent,
        previous,
        offense,
        defense,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn period(index: u32, attacks: (u32, u32), defenses: (u32, u32), sessions: u32) -> HeatmapPeriod {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::weeks(index as i64);
        HeatmapPeriod {
            period_start: start,
            period_end: start + chrono::Duration::weeks(1),
            label: format!("W{}", index),
            attacks_attempted: attacks.0,
            attacks_successful: attacks.1,
            defenses_attempted: defenses.0,
            defenses_successful: defenses.1,
            session_count: sessions,
        }
    }

    #[test]
    fn test_volume_doubling_is_increasing() {
        let (change, pct) = classify_volume(20, 10, dec!(5));
        assert_eq!(change, VolumeChange::Increasing);
        assert_eq!(pct, dec!(100));
    }

    #[test]
    fn test_zero_baseline_is_stable() {
        let (change, pct) = classify_volume(5, 0, dec!(5));
        assert_eq!(change, VolumeChange::Stable);
        assert_eq!(pct, Decimal::ZERO);
    }

    #[test]
    fn test_small_changes_are_stable() {
        assert_eq!(classify_volume(104, 100, dec!(5)).0, VolumeChange::Stable);
        assert_eq!(classify_volume(90, 100, dec!(5)).0, VolumeChange::Decreasing);
        assert_eq!(
            classify_rate(Some(52), Some(50), dec!(5)).0,
            RateDirection::Stable
        );
        assert_eq!(
            classify_rate(Some(40), Some(55), dec!(5)),
            (RateDirection::Declining, dec!(-15))
        );
        assert_eq!(
            classify_rate(None, Some(55), dec!(5)),
            (RateDirection::Stable, Decimal::ZERO)
        );
    }

    #[test]
    fn test_volume_change_rounds_half_up() {
        // 1/8 = 12.5%, 1/16 = 6.25%
        assert_eq!(classify_volume(9, 8, dec!(5)).1, dec!(12.5));
        assert_eq!(classify_volume(17, 16, dec!(5)).1, dec!(6.3));
        assert_eq!(classify_volume(15, 16, dec!(5)).1, dec!(-6.3));
    }

    #[test]
    fn test_window_totals_hold_saturated_periods() {
        let max = u32::MAX;
        let periods: Vec<HeatmapPeriod> = (0..4).map(|i| period(i, (max, max), (max, 0), max)).collect();
        let totals = WindowTotals::from_periods(&periods);
        assert_eq!(totals.attacks_attempted, 4 * u64::from(max));
        assert_eq!(totals.defenses_successful, 0);
        assert_eq!(totals.session_count, 4 * u64::from(max));
        assert_eq!(totals.active_periods, 4);
        assert_eq!(totals.attack_success_rate(), Some(100));
        assert_eq!(totals.defense_success_rate(), Some(0));
    }

    #[test]
    fn test_windows_split() {
        let periods: Vec<HeatmapPeriod> = (0..8).map(|i| period(i, (0, 0), (0, 0), 0)).collect();
        let (previous, recent) = split_windows(&periods, 4);
        assert_eq!(previous.len(), 4);
        assert_eq!(recent.len(), 4);
        assert_eq!(previous[0].label, "W0");
        assert_eq!(recent[0].label, "W4");
    }

    #[test]
    fn test_full_analysis() {
        let mut periods: Vec<HeatmapPeriod> = Vec::new();
        // Previous window: 10 attacks, 5 landed; 8 defenses, 4 held
        periods.push(period(0, (4, 2), (4, 2), 1));
        periods.push(period(1, (6, 3), (4, 2), 1));
        periods.push(period(2, (0, 0), (0, 0), 0));
        periods.push(period(3, (0, 0), (0, 0), 0));
        // Recent window: 20 attacks, 14 landed; 8 defenses, 2 held
        periods.push(period(4, (10, 7), (4, 1), 1));
        periods.push(period(5, (10, 7), (4, 1), 1));
        periods.push(period(6, (0, 0), (0, 0), 0));
        periods.push(period(7, (0, 0), (0, 0), 0));

        match analyze_trends(&periods, 4, &TrendConfig::default()) {
            TrendVerdict::Trends {
                recent,
                previous,
                offense,
                defense,
            } => {
                assert_eq!(recent.attacks_attempted, 20);
                assert_eq!(previous.attacks_attempted, 10);
                assert_eq!(offense.volume_change, VolumeChange::Increasing);
                assert_eq!(offense.volume_change_pct, dec!(100));
                assert_eq!(offense.rate_direction, RateDirection::Improving);
                assert_eq!(offense.rate_change_pct, dec!(20));
                assert_eq!(defense.volume_change, VolumeChange::Stable);
                assert_eq!(defense.rate_direction, RateDirection::Declining);
                assert_eq!(defense.recent_rate, Some(25));
            }
            other => panic!("expected trends, got {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_sessions() {
        let periods: Vec<HeatmapPeriod> = (0..8).map(|i| period(i, (3, 1), (3, 1), 1)).collect();
        assert_eq!(
            analyze_trends(&periods, 2, &TrendConfig::default()),
            TrendVerdict::InsufficientData {
                sessions_with_data: 2,
                sessions_needed: 3,
            }
        );
    }

    #[test]
    fn test_empty_previous_window_is_insufficient() {
        let mut periods: Vec<HeatmapPeriod> = (0..4).map(|i| period(i, (0, 0), (0, 0), 0)).collect();
        periods.extend((4..8).map(|i| period(i, (5, 2), (5, 2), 2)));
        assert!(matches!(
            analyze_trends(&periods, 8, &TrendConfig::default()),
            TrendVerdict::InsufficientData { .. }
        ));
    }

    #[test]
    fn test_sessions_with_data_counts_distinct_nonzero() {
        let periods: Vec<HeatmapPeriod> = (0..8).map(|i| period(i, (0, 0), (0, 0), 0)).collect();
        let tally = |id: &str, day: u32, attempts: u32| SessionAttackDefenceTally {
            session_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            attacks_attempted: attempts,
            attacks_successful: 0,
            defenses_attempted: 0,
            defenses_successful: 0,
        };
        let tallies = vec![tally("a", 2, 3), tally("a", 3, 1), tally("b", 4, 0), tally("c", 9, 2)];
        assert_eq!(sessions_with_data(&periods, &tallies), 2);
    }
}
