//! Fight dynamics period aggregation
//!
//! Attack/defence tallies are bucketed into a fixed number of rolling
//! periods walking backward from "today": eight 7-day weeks or six calendar
//! months. Empty periods are kept so the heatmap always has the same number
//! of columns.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{InsightError, Result};
use crate::models::SessionAttackDefenceTally;

/// Opacity of a period with some activity but very little relative to the max
pub const INTENSITY_BASE: f64 = 0.15;
/// Opacity range added on top of the base for the busiest period
pub const INTENSITY_RANGE: f64 = 0.85;
/// Opacity of a period with no attempts at all
pub const INTENSITY_EMPTY: f64 = 0.05;

/// Heatmap granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Weekly,
    Monthly,
}

impl ViewMode {
    /// Number of columns the heatmap always has
    pub fn period_count(&self) -> usize {
        match self {
            ViewMode::Weekly => 8,
            ViewMode::Monthly => 6,
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(ViewMode::Weekly),
            "monthly" | "month" => Ok(ViewMode::Monthly),
            _ => Err(format!("Invalid view mode: {}", s)),
        }
    }
}

/// Summed tallies for one period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapPeriod {
    /// First day of the period (inclusive)
    pub period_start: NaiveDate,

    /// Day after the last day of the period (exclusive)
    pub period_end: NaiveDate,

    pub label: String,
    pub attacks_attempted: u32,
    pub attacks_successful: u32,
    pub defenses_attempted: u32,
    pub defenses_successful: u32,

    /// Distinct sessions that contributed a tally
    pub session_count: u32,
}

impl HeatmapPeriod {
    fn empty(period_start: NaiveDate, period_end: NaiveDate, label: String) -> Self {
        HeatmapPeriod {
            period_start,
            period_end,
            label,
            attacks_attempted: 0,
            attacks_successful: 0,
            defenses_attempted: 0,
            defenses_successful: 0,
            session_count: 0,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.period_start && date < self.period_end
    }

    pub fn attack_success_rate(&self) -> Option<u8> {
        success_rate(self.attacks_successful.into(), self.attacks_attempted.into())
    }

    pub fn defense_success_rate(&self) -> Option<u8> {
        success_rate(self.defenses_successful.into(), self.defenses_attempted.into())
    }

    pub fn total_attempted(&self) -> u64 {
        u64::from(self.attacks_attempted) + u64::from(self.defenses_attempted)
    }

    /// No session contributed to this period
    pub fn is_empty(&self) -> bool {
        self.session_count == 0
    }
}

/// `round(100 * successful / attempted)`, or `None` when nothing was attempted
pub fn success_rate(successful: u64, attempted: u64) -> Option<u8> {
    if attempted == 0 {
        return None;
    }
    let successful = u128::from(successful.min(attempted));
    let attempted = u128::from(attempted);
    // Integer half-up rounding
    Some(((200 * successful + attempted) / (2 * attempted)) as u8)
}

/// Cell opacity for a period relative to the busiest period on the map
pub fn heat_intensity(attempted: u64, max_attempted: u64) -> f64 {
    if attempted == 0 || max_attempted == 0 {
        return INTENSITY_EMPTY;
    }
    let ratio = (attempted as f64 / max_attempted as f64).min(1.0);
    INTENSITY_BASE + INTENSITY_RANGE * ratio
}

/// Half-open `[start, end)` bounds for every period, oldest first
pub fn period_bounds(view: ViewMode, today: NaiveDate) -> Result<Vec<(NaiveDate, NaiveDate)>> {
    let count = view.period_count();
    let out_of_range = || InsightError::invalid(format!("date out of range: {}", today));

    match view {
        ViewMode::Weekly => {
            let end_of_range = today.checked_add_days(Days::new(1)).ok_or_else(out_of_range)?;
            (0..count)
                .rev()
                .map(|weeks_back| {
                    let end = end_of_range
                        .checked_sub_days(Days::new(7 * weeks_back as u64))
                        .ok_or_else(out_of_range)?;
                    let start = end.checked_sub_days(Days::new(7)).ok_or_else(out_of_range)?;
                    Ok((start, end))
                })
                .collect()
        }
        ViewMode::Monthly => {
            let this_month = today.with_day(1).ok_or_else(out_of_range)?;
            (0..count)
                .rev()
                .map(|months_back| {
                    let start = this_month
                        .checked_sub_months(Months::new(months_back as u32))
                        .ok_or_else(out_of_range)?;
                    let end = start
                        .checked_add_months(Months::new(1))
                        .ok_or_else(out_of_range)?;
                    Ok((start, end))
                })
                .collect()
        }
    }
}

fn period_label(view: ViewMode, start: NaiveDate) -> String {
    match view {
        ViewMode::Weekly => start.format("%b %-d").to_string(),
        ViewMode::Monthly => start.format("%b %Y").to_string(),
    }
}

/// Bucket tallies into the fixed period grid for `view`
///
/// Tallies outside the grid are ignored. Fails with `InvalidInput` if any
/// tally reports more successes than attempts, or if a period's sums
/// overflow.
pub fn aggregate_periods(
    view: ViewMode,
    today: NaiveDate,
    tallies: &[SessionAttackDefenceTally],
) -> Result<Vec<HeatmapPeriod>> {
    for tally in tallies {
        tally.validate()?;
    }

    let mut periods: Vec<HeatmapPeriod> = period_bounds(view, today)?
        .into_iter()
        .map(|(start, end)| HeatmapPeriod::empty(start, end, period_label(view, start)))
        .collect();

    for period in &mut periods {
        let (start, end) = (period.period_start, period.period_end);
        let overflow =
            || InsightError::invalid(format!("tally totals overflow in period {}", start));

        let mut sessions: HashSet<&str> = HashSet::new();
        for tally in tallies.iter().filter(|t| t.date >= start && t.date < end) {
            period.attacks_attempted = period
                .attacks_attempted
                .checked_add(tally.attacks_attempted)
                .ok_or_else(overflow)?;
            period.attacks_successful = period
                .attacks_successful
                .checked_add(tally.attacks_successful)
                .ok_or_else(overflow)?;
            period.defenses_attempted = period
                .defenses_attempted
                .checked_add(tally.defenses_attempted)
                .ok_or_else(overflow)?;
            period.defenses_successful = period
                .defenses_successful
                .checked_add(tally.defenses_successful)
                .ok_or_else(overflow)?;
            sessions.insert(tally.session_id.as_str());
        }
        period.session_count = u32::try_from(sessions.len()).map_err(|_| overflow())?;
    }

    Ok(periods)
}

/// Date range `[start, end)` covered by the grid, for fetching tallies
pub fn grid_range(view: ViewMode, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let bounds = period_bounds(view, today)?;
    match (bounds.first(), bounds.last()) {
        (Some(first), Some(last)) => Ok((first.0, last.1)),
        _ => Err(InsightError::Internal("empty period grid".to_string())),
    }
}
