//! Attack/defence imbalance detection and training focus ranking

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::round_half_up;
use crate::trends::WindowTotals;

/// Share-of-volume bounds outside which training counts as lopsided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImbalanceConfig {
    /// Attack share (percent) below this is defence-heavy
    pub lower_bound_pct: Decimal,

    /// Attack share (percent) above this is attack-heavy
    pub upper_bound_pct: Decimal,
}

impl Default for ImbalanceConfig {
    fn default() -> Self {
        ImbalanceConfig {
            lower_bound_pct: dec!(35),
            upper_bound_pct: dec!(65),
        }
    }
}

/// Focus ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Success rate (percent) below which an area needs work
    pub needs_work_rate: u8,
}

impl Default for FocusConfig {
    fn default() -> Self {
        FocusConfig { needs_work_rate: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImbalanceType {
    AttackHeavy,
    DefenseHeavy,
}

/// Attack vs defence share of training volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imbalance {
    pub detected: bool,

    /// `None` when nothing was attempted on either side
    pub attack_ratio: Option<Decimal>,
    pub defense_ratio: Option<Decimal>,

    #[serde(rename = "type")]
    pub imbalance_type: Option<ImbalanceType>,
    pub description: String,
}

/// Classify the attack/defence split of a window
pub fn detect_imbalance(attacks: u64, defenses: u64, config: &ImbalanceConfig) -> Imbalance {
    if attacks == 0 && defenses == 0 {
        return Imbalance {
            detected: false,
            attack_ratio: None,
            defense_ratio: None,
            imbalance_type: None,
            description: "No attacks or defenses logged in this window.".to_string(),
        };
    }

    let total = Decimal::from(attacks) + Decimal::from(defenses);
    let attack_ratio = round_half_up(Decimal::from(attacks) / total * dec!(100), 1);
    let defense_ratio = dec!(100) - attack_ratio;

    let imbalance_type = if attack_ratio > config.upper_bound_pct {
        Some(ImbalanceType::AttackHeavy)
    } else if attack_ratio < config.lower_bound_pct {
        Some(ImbalanceType::DefenseHeavy)
    } else {
        None
    };

    let description = match imbalance_type {
        Some(ImbalanceType::AttackHeavy) => format!(
            "{}% of your reps are attacks. You're rarely working from bad positions.",
            attack_ratio.normalize()
        ),
        Some(ImbalanceType::DefenseHeavy) => format!(
            "{}% of your reps are defense. You're spending most rounds on the back foot.",
            defense_ratio.normalize()
        ),
        None => format!(
            "Balanced split: {}% attack, {}% defense.",
            attack_ratio.normalize(),
            defense_ratio.normalize()
        ),
    };

    Imbalance {
        detected: imbalance_type.is_some(),
        attack_ratio: Some(attack_ratio),
        defense_ratio: Some(defense_ratio),
        imbalance_type,
        description,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Offense,
    Defense,
    Overall,
}

/// Ordered so that `High < Medium < Low` sorts most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSuggestion {
    pub area: FocusArea,
    pub priority: FocusPriority,
    pub message: String,
}

/// Ranked focus list plus the one suggestion to feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusPlan {
    pub primary_focus: Option<FocusSuggestion>,

    /// Every suggestion, most urgent first
    pub suggestions: Vec<FocusSuggestion>,
}

/// Build and rank focus suggestions for a window
pub fn rank_focus(imbalance: &Imbalance, recent: &WindowTotals, config: &FocusConfig) -> FocusPlan {
    let attack_rate = recent.attack_success_rate();
    let defense_rate = recent.defense_success_rate();
    let rate_of = |area: FocusArea| match area {
        FocusArea::Offense => attack_rate,
        FocusArea::Defense => defense_rate,
        FocusArea::Overall => attack_rate.min(defense_rate),
    };

    let mut suggestions = Vec::new();

    match imbalance.imbalance_type {
        Some(ImbalanceType::AttackHeavy) => suggestions.push(FocusSuggestion {
            area: FocusArea::Defense,
            priority: FocusPriority::High,
            message: format!(
                "{} Start more rounds from bottom side control or back mount.",
                imbalance.description
            ),
        }),
        Some(ImbalanceType::DefenseHeavy) => suggestions.push(FocusSuggestion {
            area: FocusArea::Offense,
            priority: FocusPriority::High,
            message: format!(
                "{} Work guard passing and dominant-position chains.",
                imbalance.description
            ),
        }),
        None => {}
    }

    // The weaker side, considering only rates that exist
    let weaker = match (attack_rate, defense_rate) {
        (Some(a), Some(d)) if d < a => Some((FocusArea::Defense, d)),
        (Some(a), Some(_)) => Some((FocusArea::Offense, a)),
        (Some(a), None) => Some((FocusArea::Offense, a)),
        (None, Some(d)) => Some((FocusArea::Defense, d)),
        (None, None) => None,
    };

    if let Some((area, rate)) = weaker {
        if rate < config.needs_work_rate {
            let message = match area {
                FocusArea::Defense => format!(
                    "Only {}% of your defenses succeed. Drill escapes and frames.",
                    rate
                ),
                _ => format!(
                    "Only {}% of your attacks land. Drill setups for your best submissions.",
                    rate
                ),
            };
            suggestions.push(FocusSuggestion {
                area,
                priority: FocusPriority::Medium,
                message,
            });
        }
    }

    if let (Some(a), Some(d)) = (attack_rate, defense_rate) {
        if a > config.needs_work_rate && d > config.needs_work_rate {
            suggestions.push(FocusSuggestion {
                area: FocusArea::Overall,
                priority: FocusPriority::Low,
                message: format!(
                    "Strong on both ends: {}% attack and {}% defense success. Keep it up.",
                    a, d
                ),
            });
        }
    }

    // Priority first; ties go to the area with the lower success rate,
    // unknown rates last
    suggestions.sort_by(|x, y| {
        x.priority.cmp(&y.priority).then_with(|| {
            match (rate_of(x.area), rate_of(y.area)) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
    });

    FocusPlan {
        primary_focus: suggestions.first().cloned(),
        suggestions,
    }
}
