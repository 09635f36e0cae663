//! Wearable recovery normalization and HRV trend detection
//!
//! Wearables report recovery as a 0–100 percentage. [`tier_from_recovery`]
//! maps that onto the same three tiers the composite readiness score uses,
//! with cut points at 67 and 34 so both signals split their range at the
//! same relative positions.
//!
//! A missing score is [`Tier::NoSignal`], never [`Tier::RestDay`].

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{InsightError, Result};
use crate::models::{round_half_up, WearableRecovery};
use crate::readiness::Tier;

/// Recovery at or above this is a hard training day
pub const RECOVERY_TRAIN_HARD_MIN: u8 = 67;
/// Recovery at or above this (and below [`RECOVERY_TRAIN_HARD_MIN`]) is a light day
pub const RECOVERY_LIGHT_SESSION_MIN: u8 = 34;

/// Map a wearable recovery percentage onto the shared tiers
pub fn tier_from_recovery(recovery_score: Option<u8>) -> Result<Tier> {
    match recovery_score {
        None => Ok(Tier::NoSignal),
        Some(score) if score > 100 => Err(InsightError::invalid(format!(
            "recovery score must be between 0 and 100, got {}",
            score
        ))),
        Some(score) if score >= RECOVERY_TRAIN_HARD_MIN => Ok(Tier::TrainHard),
        Some(score) if score >= RECOVERY_LIGHT_SESSION_MIN => Ok(Tier::LightSession),
        Some(_) => Ok(Tier::RestDay),
    }
}

impl WearableRecovery {
    /// Tier derived from this snapshot's recovery score
    pub fn tier(&self) -> Result<Tier> {
        tier_from_recovery(self.recovery_score)
    }
}

/// HRV drop detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrvTrendConfig {
    /// Days before the latest reading that form the baseline
    pub lookback_days: u16,

    /// Drop below baseline (percent) that counts as significant
    pub drop_pct: Decimal,

    /// Baseline readings required before a verdict is given
    pub min_baseline_readings: usize,
}

impl Default for HrvTrendConfig {
    fn default() -> Self {
        HrvTrendConfig {
            lookback_days: 7,
            drop_pct: dec!(20),
            min_baseline_readings: 3,
        }
    }
}

/// Latest HRV compared to the personal baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvTrend {
    pub latest_ms: Decimal,
    pub baseline_ms: Decimal,

    /// Positive when HRV is below baseline
    pub drop_pct: Decimal,

    /// Drop exceeds the configured threshold
    pub significant_drop: bool,
}

/// Compare the most recent HRV reading against the mean of the readings
/// in the preceding lookback window.
///
/// Returns `None` when there is no latest HRV or the baseline is too thin.
pub fn hrv_trend(history: &[WearableRecovery], config: &HrvTrendConfig) -> Option<HrvTrend> {
    let latest = history
        .iter()
        .filter(|snapshot| snapshot.hrv_ms.is_some())
        .max_by_key(|snapshot| snapshot.date)?;
    let latest_ms = latest.hrv_ms?;

    let window_start = latest
        .date
        .checked_sub_days(Days::new(config.lookback_days as u64))
        .unwrap_or(NaiveDate::MIN);

    let baseline: Vec<Decimal> = history
        .iter()
        .filter(|s| s.date >= window_start && s.date < latest.date)
        .filter_map(|s| s.hrv_ms)
        .collect();

    if baseline.len() < config.min_baseline_readings.max(1) {
        return None;
    }

    let baseline_ms = baseline.iter().sum::<Decimal>() / Decimal::from(baseline.len());
    if baseline_ms <= Decimal::ZERO {
        return None;
    }

    let drop_pct = round_half_up((baseline_ms - latest_ms) / baseline_ms * dec!(100), 1);

    Some(HrvTrend {
        latest_ms,
        baseline_ms: round_half_up(baseline_ms, 1),
        drop_pct,
        significant_drop: drop_pct >= config.drop_pct,
    })
}
