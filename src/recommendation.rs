//! Recommendation fusion
//!
//! Self-reported readiness and wearable recovery are merged into one daily
//! label. The decision table, in order:
//!
//! 1. Neither signal present: prompt for a check-in.
//! 2. Composite present: the composite tier wins outright.
//! 3. Only recovery present: use it while the user has not checked in yet.
//!    Once they have checked in (but no composite could be derived) the
//!    wearable is not substituted and the label is [`Tier::NoSignal`].

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::readiness::Tier;
use crate::rules::TriggeredRule;

/// Which signal produced the fused label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    SelfReport,
    Wearable,
    None,
}

/// Output of the fuser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusedTier {
    pub tier: Tier,
    pub source: SignalSource,
}

impl FusedTier {
    /// Show the check-in prompt instead of a training recommendation
    pub fn show_check_in_prompt(&self) -> bool {
        self.tier == Tier::CheckIn
    }
}

/// Merge composite and wearable tiers
///
/// `Some(Tier::NoSignal)` on either side is treated the same as `None`.
pub fn fuse(
    composite_tier: Option<Tier>,
    recovery_tier: Option<Tier>,
    has_checked_in: bool,
) -> FusedTier {
    let composite = composite_tier.filter(Tier::is_training_advice);
    let recovery = recovery_tier.filter(Tier::is_training_advice);

    match (composite, recovery) {
        (Some(tier), _) => FusedTier {
            tier,
            source: SignalSource::SelfReport,
        },
        (None, Some(tier)) if !has_checked_in => FusedTier {
            tier,
            source: SignalSource::Wearable,
        },
        (None, Some(_)) => FusedTier {
            tier: Tier::NoSignal,
            source: SignalSource::None,
        },
        (None, None) if has_checked_in => FusedTier {
            tier: Tier::NoSignal,
            source: SignalSource::None,
        },
        (None, None) => FusedTier {
            tier: Tier::CheckIn,
            source: SignalSource::None,
        },
    }
}

/// Coarse time of day used for greetings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Midday,
    Evening,
}

impl DayPart {
    /// Before noon is morning, noon to 17:00 midday, later evening
    pub fn from_time(now: NaiveDateTime) -> Self {
        match now.hour() {
            0..=11 => DayPart::Morning,
            12..=16 => DayPart::Midday,
            _ => DayPart::Evening,
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            DayPart::Morning => "Good morning",
            DayPart::Midday => "Good afternoon",
            DayPart::Evening => "Good evening",
        }
    }
}

/// The "what should I do today" payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecommendation {
    pub date: chrono::NaiveDate,
    pub day_part: DayPart,

    /// Display label of the primary tier
    pub label: String,
    pub primary_tier: Tier,
    pub source: SignalSource,
    pub show_check_in_prompt: bool,

    /// Today's composite readiness, if a valid check-in exists
    pub composite_score: Option<u8>,

    /// Wearable recovery percentage, if synced
    pub recovery_score: Option<u8>,

    pub suggestion_text: String,

    /// All fired rules, most urgent first
    pub triggered_rules: Vec<TriggeredRule>,
}

impl DailyRecommendation {
    /// The handful of rules worth showing as badges
    pub fn top_badges(&self, limit: usize) -> &[TriggeredRule] {
        &self.triggered_rules[..self.triggered_rules.len().min(limit)]
    }
}
