//! Composite readiness scoring
//!
//! Four 1–5 sliders collapse into a single 4–20 figure where higher is
//! always better. Stress and soreness are inverted because a high reported
//! value means a worse state.
//!
//! The three-way [`Tier`] split defined here is shared by every signal the
//! journal shows: the composite score, the wearable recovery score, and the
//! fused daily label.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::models::{validate_slider, ReadinessCheckIn};

/// Lowest possible composite score
pub const COMPOSITE_MIN: u8 = 4;
/// Highest possible composite score
pub const COMPOSITE_MAX: u8 = 20;
/// Composite at or above this is a hard training day
pub const TRAIN_HARD_MIN: u8 = 16;
/// Composite at or above this (and below [`TRAIN_HARD_MIN`]) is a light day
pub const LIGHT_SESSION_MIN: u8 = 12;

/// Coarse recommendation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    TrainHard,
    LightSession,
    RestDay,
    /// Nothing logged yet today; prompt for a check-in
    CheckIn,
    /// A signal source exists but produced no value
    NoSignal,
}

impl Tier {
    /// Classify a composite score
    pub fn from_composite(composite: u8) -> Self {
        if composite >= TRAIN_HARD_MIN {
            Tier::TrainHard
        } else if composite >= LIGHT_SESSION_MIN {
            Tier::LightSession
        } else {
            Tier::RestDay
        }
    }

    /// True for the three tiers that are actual training advice
    pub fn is_training_advice(&self) -> bool {
        matches!(self, Tier::TrainHard | Tier::LightSession | Tier::RestDay)
    }

    /// Display label for badges and headers
    pub fn label(&self) -> &'static str {
        match self {
            Tier::TrainHard => "Train Hard",
            Tier::LightSession => "Light Session",
            Tier::RestDay => "Rest Day",
            Tier::CheckIn => "Check In",
            Tier::NoSignal => "No Signal",
        }
    }

    /// Generic suggestion used when no rule fires
    pub fn fallback_suggestion(&self) -> &'static str {
        match self {
            Tier::TrainHard => "You're fresh. Push the pace in rounds and chase your A-game.",
            Tier::LightSession => {
                "Go light today: flow rolls, drilling, and controlled positional work."
            }
            Tier::RestDay => "Your body is asking for rest. Walk, stretch, and sleep early.",
            Tier::CheckIn => "Log today's check-in to get a training recommendation.",
            Tier::NoSignal => {
                "We couldn't score today's readiness. Train by feel and keep intensity moderate."
            }
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Combine the four sliders into the 4–20 composite
///
/// `sleep + (6 - stress) + (6 - soreness) + energy`. Fails with
/// `InvalidInput` when any slider is outside 1–5; values are never clamped.
pub fn composite_score(sleep: u8, stress: u8, soreness: u8, energy: u8) -> Result<u8> {
    validate_slider("sleep", sleep)?;
    validate_slider("stress", stress)?;
    validate_slider("soreness", soreness)?;
    validate_slider("energy", energy)?;
    Ok(sleep + (6 - stress) + (6 - soreness) + energy)
}

impl ReadinessCheckIn {
    /// Composite score of this check-in
    pub fn composite_score(&self) -> Result<u8> {
        composite_score(self.sleep, self.stress, self.soreness, self.energy)
    }

    /// Tier derived from the composite score
    pub fn tier(&self) -> Result<Tier> {
        self.composite_score().map(Tier::from_composite)
    }
}
