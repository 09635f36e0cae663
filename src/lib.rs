// Library interface for the bjjlog insight engine
// The CLI and the integration tests both go through these modules

pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod goals;
pub mod heatmap;
pub mod logging;
pub mod models;
pub mod readiness;
pub mod recommendation;
pub mod recovery;
pub mod rules;
pub mod sources;
pub mod trends;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::{AppConfig, EngineConfig};
pub use engine::{FightDynamicsInsights, InsightEngine};
pub use error::{InsightError, Result, SourceError};
pub use goals::{GoalPeriod, GoalProgress, GoalTargets};
pub use heatmap::{HeatmapPeriod, ViewMode};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use readiness::Tier;
pub use recommendation::{DailyRecommendation, DayPart, SignalSource};
pub use rules::{RuleConfig, RuleEngine, TriggeredRule};
pub use sources::{InMemoryJournal, JournalSnapshot, JournalSource};
