//! Weekly and monthly goal progress

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{InsightError, Result};
use crate::models::{round_half_up, ClassType, SessionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Weekly,
    Monthly,
}

impl GoalPeriod {
    /// `[start, end)` of the period containing `today`; weeks start Monday
    pub fn bounds(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let out_of_range = || InsightError::invalid(format!("date out of range: {}", today));
        match self {
            GoalPeriod::Weekly => {
                let offset = today.weekday().num_days_from_monday() as u64;
                let start = today.checked_sub_days(Days::new(offset)).ok_or_else(out_of_range)?;
                let end = start.checked_add_days(Days::new(7)).ok_or_else(out_of_range)?;
                Ok((start, end))
            }
            GoalPeriod::Monthly => {
                let start = today.with_day(1).ok_or_else(out_of_range)?;
                let end = start
                    .checked_add_months(Months::new(1))
                    .ok_or_else(out_of_range)?;
                Ok((start, end))
            }
        }
    }
}

impl std::str::FromStr for GoalPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(GoalPeriod::Weekly),
            "monthly" | "month" => Ok(GoalPeriod::Monthly),
            _ => Err(format!("Invalid goal period: {}", s)),
        }
    }
}

/// Targets the user set for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTargets {
    pub period: GoalPeriod,

    #[serde(default)]
    pub sessions: Option<u32>,

    #[serde(default)]
    pub hours: Option<Decimal>,

    /// Per-class-type session counts
    #[serde(default)]
    pub class_types: BTreeMap<ClassType, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    Sessions,
    Hours,
    ClassType(ClassType),
}

impl fmt::Display for GoalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalMetric::Sessions => write!(f, "Sessions"),
            GoalMetric::Hours => write!(f, "Hours"),
            GoalMetric::ClassType(class_type) => write!(f, "{} sessions", class_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub metric: GoalMetric,
    pub target: Decimal,
    pub actual: Decimal,

    /// Unclamped `100 * actual / target`, may exceed 100
    pub raw_pct: Decimal,

    /// Display percentage, clamped to 0–100
    pub pct: u8,
}

impl GoalProgress {
    pub fn is_met(&self) -> bool {
        self.actual >= self.target
    }
}

/// Progress for one metric; `None` when the target is zero
pub fn progress(metric: GoalMetric, actual: Decimal, target: Decimal) -> Option<GoalProgress> {
    if target <= Decimal::ZERO {
        return None;
    }
    let ratio = actual / target * dec!(100);
    let raw_pct = round_half_up(ratio, 1);
    let pct = round_half_up(ratio, 0).clamp(Decimal::ZERO, dec!(100));
    Some(GoalProgress {
        metric,
        target,
        actual,
        raw_pct,
        pct: pct.to_u8().unwrap_or(100),
    })
}

/// Progress for every non-zero target, from sessions already inside the period
pub fn goal_progress(targets: &GoalTargets, sessions: &[SessionSummary]) -> Vec<GoalProgress> {
    let mut results = Vec::new();

    if let Some(target) = targets.sessions {
        let actual = Decimal::from(sessions.len());
        results.extend(progress(GoalMetric::Sessions, actual, Decimal::from(target)));
    }

    if let Some(target) = targets.hours {
        let minutes: u64 = sessions.iter().map(|s| s.duration_minutes as u64).sum();
        let actual = round_half_up(Decimal::from(minutes) / dec!(60), 1);
        results.extend(progress(GoalMetric::Hours, actual, target));
    }

    for (class_type, target) in &targets.class_types {
        let actual = sessions
            .iter()
            .filter(|s| s.class_type == *class_type)
            .count();
        results.extend(progress(
            GoalMetric::ClassType(*class_type),
            Decimal::from(actual),
            Decimal::from(*target),
        ));
    }

    results
}
