use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InsightError, Result};

/// Lowest value a readiness slider accepts
pub const SLIDER_MIN: u8 = 1;
/// Highest value a readiness slider accepts
pub const SLIDER_MAX: u8 = 5;

/// Reject a slider value outside 1–5
pub fn validate_slider(name: &str, value: u8) -> Result<()> {
    if (SLIDER_MIN..=SLIDER_MAX).contains(&value) {
        Ok(())
    } else {
        Err(InsightError::invalid(format!(
            "{} must be between {} and {}, got {}",
            name, SLIDER_MIN, SLIDER_MAX, value
        )))
    }
}

/// Round to `dp` places with halves going away from zero (12.5 -> 13)
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Daily self-reported readiness, one per user per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessCheckIn {
    /// Day the check-in belongs to
    pub date: NaiveDate,

    /// Sleep quality (1 = terrible, 5 = great)
    pub sleep: u8,

    /// Stress level (1 = calm, 5 = overwhelmed)
    pub stress: u8,

    /// Muscle soreness (1 = fresh, 5 = wrecked)
    pub soreness: u8,

    /// Energy level (1 = empty, 5 = full tank)
    pub energy: u8,

    /// Free-text note about a sore spot or tweak
    #[serde(default)]
    pub hotspot_note: Option<String>,

    /// Body weight in kilograms
    #[serde(default)]
    pub weight_kg: Option<Decimal>,
}

impl ReadinessCheckIn {
    /// Reject sliders outside 1–5
    pub fn validate(&self) -> Result<()> {
        validate_slider("sleep", self.sleep)?;
        validate_slider("stress", self.stress)?;
        validate_slider("soreness", self.soreness)?;
        validate_slider("energy", self.energy)
    }

    /// Hotspot note with surrounding whitespace removed, if non-empty
    pub fn active_hotspot(&self) -> Option<&str> {
        self.hotspot_note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
    }
}

/// Recovery snapshot pushed by a wearable sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableRecovery {
    /// Day the snapshot describes
    pub date: NaiveDate,

    /// Recovery percentage 0-100 (None when the device didn't score the night)
    pub recovery_score: Option<u8>,

    /// Heart rate variability (RMSSD) in milliseconds
    pub hrv_ms: Option<Decimal>,

    /// Resting heart rate in beats per minute
    pub resting_hr: Option<u16>,
}

/// Attack/defence counts logged against one training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAttackDefenceTally {
    /// Session the tally belongs to
    pub session_id: String,

    /// Session date
    pub date: NaiveDate,

    pub attacks_attempted: u32,
    pub attacks_successful: u32,
    pub defenses_attempted: u32,
    pub defenses_successful: u32,
}

impl SessionAttackDefenceTally {
    /// Successful counts may never exceed attempts
    pub fn validate(&self) -> Result<()> {
        if self.attacks_successful > self.attacks_attempted {
            return Err(InsightError::invalid(format!(
                "session {}: {} successful attacks out of {} attempted",
                self.session_id, self.attacks_successful, self.attacks_attempted
            )));
        }
        if self.defenses_successful > self.defenses_attempted {
            return Err(InsightError::invalid(format!(
                "session {}: {} successful defenses out of {} attempted",
                self.session_id, self.defenses_successful, self.defenses_attempted
            )));
        }
        Ok(())
    }

    /// True if anything at all was tallied
    pub fn has_activity(&self) -> bool {
        self.attacks_attempted > 0 || self.defenses_attempted > 0
    }
}

/// Class formats a session can be logged as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassType {
    Gi,
    NoGi,
    OpenMat,
    Drilling,
    Competition,
    Private,
    Recovery,
}

impl ClassType {
    /// Sessions that count as deliberate technique work
    pub fn is_technique_focused(&self) -> bool {
        matches!(self, ClassType::Drilling | ClassType::Private)
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassType::Gi => write!(f, "Gi"),
            ClassType::NoGi => write!(f, "No-Gi"),
            ClassType::OpenMat => write!(f, "Open Mat"),
            ClassType::Drilling => write!(f, "Drilling"),
            ClassType::Competition => write!(f, "Competition"),
            ClassType::Private => write!(f, "Private"),
            ClassType::Recovery => write!(f, "Recovery"),
        }
    }
}

impl std::str::FromStr for ClassType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' ', '_'], "").as_str() {
            "gi" => Ok(ClassType::Gi),
            "nogi" => Ok(ClassType::NoGi),
            "openmat" => Ok(ClassType::OpenMat),
            "drilling" => Ok(ClassType::Drilling),
            "competition" => Ok(ClassType::Competition),
            "private" => Ok(ClassType::Private),
            "recovery" => Ok(ClassType::Recovery),
            _ => Err(format!("Unknown class type: {}", s)),
        }
    }
}

/// Minimal view of a logged training session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub date: NaiveDate,
    pub class_type: ClassType,
    pub duration_minutes: u32,
}

/// A single "this hurts" report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryReport {
    /// Body area, e.g. "left knee"
    pub area: String,
    pub reported_on: NaiveDate,
}

/// Injury history and recovery-mode flag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryContext {
    /// User switched the journal into recovery mode
    #[serde(default)]
    pub recovery_mode: bool,

    #[serde(default)]
    pub reports: Vec<InjuryReport>,
}

/// An upcoming (or past) tournament on the user's calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionEvent {
    pub name: String,
    pub date: NaiveDate,
}

/// Next event on or after `today`
pub fn next_competition(
    calendar: &[CompetitionEvent],
    today: NaiveDate,
) -> Option<&CompetitionEvent> {
    calendar
        .iter()
        .filter(|event| event.date >= today)
        .min_by_key(|event| event.date)
}
