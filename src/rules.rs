//! Suggestion rule engine
//!
//! Every rule is a plain [`Rule`] record: a stable name, a priority (lower
//! is more urgent), a predicate over the day's [`RuleContext`], and text
//! templates. Evaluation is a single pass over the catalog; everything that
//! fires is collected and sorted by priority, and the most urgent rule's
//! recommendation becomes the suggestion of the day.
//!
//! Templates use `{token}` placeholders filled from the context. Rendered
//! text always goes through [`sanitize_suggestion`] so a token without a
//! value never reaches the user.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::models::{
    next_competition, round_half_up, ClassType, CompetitionEvent, InjuryContext,
    ReadinessCheckIn, SessionSummary, WearableRecovery,
};
use crate::readiness::Tier;
use crate::recovery::{HrvTrend, RECOVERY_LIGHT_SESSION_MIN};

/// Anything that looks like an unfilled `{token}`
static PLACEHOLDER_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\{[a-z_]+\}").ok());

/// Strip unresolved `{token}` placeholders and collapse whitespace
pub fn sanitize_suggestion(text: &str) -> String {
    let stripped = match PLACEHOLDER_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Thresholds used by the rule predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Sessions of the same class type in a row before suggesting variety
    pub class_streak: usize,

    /// Days without drilling/private work before technique is stale
    pub stale_technique_days: u16,

    /// Sessions in the trailing week that call for a deload
    pub deload_sessions_per_week: usize,

    /// Sleep slider at or below this is a poor night
    pub poor_sleep_max: u8,

    /// Poor nights within the window that count as sleep debt
    pub sleep_debt_nights: usize,

    /// Recent check-ins inspected for sleep debt
    pub sleep_debt_window: usize,

    /// Days out from a competition that count as fight week
    pub fight_week_days: i64,

    /// Days out from a competition when tapering should start
    pub taper_days: i64,

    /// Reports of the same area that make an injury persistent
    pub persistent_injury_reports: usize,

    /// Lookback for persistent injury reports
    pub persistent_injury_window_days: i64,

    /// Stress at or above this is high
    pub high_stress_min: u8,

    /// Energy at or below this is low
    pub low_energy_max: u8,

    /// Soreness at or above this is high
    pub high_soreness_min: u8,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            class_streak: 3,
            stale_technique_days: 14,
            deload_sessions_per_week: 6,
            poor_sleep_max: 2,
            sleep_debt_nights: 3,
            sleep_debt_window: 5,
            fight_week_days: 7,
            taper_days: 14,
            persistent_injury_reports: 3,
            persistent_injury_window_days: 30,
            high_stress_min: 4,
            low_energy_max: 2,
            high_soreness_min: 4,
        }
    }
}

/// Everything the predicates may look at for one day
#[derive(Debug, Clone, Default)]
pub struct RuleContext {
    pub today: NaiveDate,

    /// Fused tier for the day
    pub tier: Option<Tier>,

    /// Tier of today's composite readiness alone
    pub composite_tier: Option<Tier>,

    /// Today's check-in, if any
    pub check_in: Option<ReadinessCheckIn>,

    /// Recent check-ins, newest first (today's included)
    pub recent_check_ins: Vec<ReadinessCheckIn>,

    pub wearable: Option<WearableRecovery>,
    pub hrv: Option<HrvTrend>,
    pub injuries: InjuryContext,

    /// Last few sessions, newest first
    pub recent_sessions: Vec<SessionSummary>,

    /// Sessions over the past few weeks, any order
    pub window_sessions: Vec<SessionSummary>,

    pub competitions: Vec<CompetitionEvent>,
}

impl RuleContext {
    /// Tier whose generic text is shown when no rule fires
    ///
    /// Only the composite counts. Without one the user is asked to check
    /// in, unless they already did and the check-in could not be scored.
    pub fn fallback_tier(&self) -> Tier {
        match (self.composite_tier, self.tier) {
            (Some(tier), _) => tier,
            (None, Some(Tier::NoSignal)) => Tier::NoSignal,
            (None, _) => Tier::CheckIn,
        }
    }

    /// Next competition on or after today
    pub fn next_competition(&self) -> Option<&CompetitionEvent> {
        next_competition(&self.competitions, self.today)
    }

    pub fn days_to_competition(&self) -> Option<i64> {
        self.next_competition()
            .map(|event| (event.date - self.today).num_days())
    }

    /// How many of the most recent sessions in a row were `class_type`
    pub fn class_streak(&self, class_type: ClassType) -> usize {
        self.recent_sessions
            .iter()
            .take_while(|session| session.class_type == class_type)
            .count()
    }

    /// Sessions dated within the trailing `days` days (today included)
    pub fn sessions_in_last_days(&self, days: i64) -> usize {
        self.window_sessions
            .iter()
            .filter(|s| {
                let age = (self.today - s.date).num_days();
                (0..days).contains(&age)
            })
            .count()
    }

    /// Most frequently reported area inside the lookback, with its count
    pub fn most_reported_injury(&self, window_days: i64) -> Option<(String, usize)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for report in &self.injuries.reports {
            let age = (self.today - report.reported_on).num_days();
            if (0..window_days).contains(&age) {
                *counts
                    .entry(report.area.trim().to_lowercase())
                    .or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
    }

    /// Poor-sleep nights among the last `window` check-ins
    pub fn poor_sleep_nights(&self, window: usize, poor_sleep_max: u8) -> usize {
        self.recent_check_ins
            .iter()
            .take(window)
            .filter(|c| c.sleep <= poor_sleep_max)
            .count()
    }

    /// Values available to `{token}` placeholders
    fn template_vars(&self, config: &RuleConfig) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();

        if let Some(event) = self.next_competition() {
            vars.insert("event", event.name.clone());
        }
        if let Some(days) = self.days_to_competition() {
            vars.insert("days_to_comp", days.to_string());
        }
        if let Some(hotspot) = self.check_in.as_ref().and_then(|c| c.active_hotspot()) {
            vars.insert("hotspot", hotspot.to_string());
        }
        if let Some(check_in) = &self.check_in {
            vars.insert("soreness", check_in.soreness.to_string());
            vars.insert("stress", check_in.stress.to_string());
            vars.insert("energy", check_in.energy.to_string());
        }
        if let Some(score) = self.wearable.as_ref().and_then(|w| w.recovery_score) {
            vars.insert("recovery", score.to_string());
        }
        if let Some(hrv) = &self.hrv {
            vars.insert("hrv_drop_pct", round_half_up(hrv.drop_pct, 0).to_string());
        }
        if let Some((area, count)) = self.most_reported_injury(config.persistent_injury_window_days)
        {
            vars.insert("injury_area", area);
            vars.insert("injury_reports", count.to_string());
        }

        let streak = self
            .recent_sessions
            .first()
            .map(|s| self.class_streak(s.class_type))
            .unwrap_or(0);
        vars.insert("class_streak", streak.to_string());
        vars.insert("sessions_this_week", self.sessions_in_last_days(7).to_string());
        vars.insert(
            "poor_sleep_nights",
            self.poor_sleep_nights(config.sleep_debt_window, config.poor_sleep_max)
                .to_string(),
        );
        vars.insert("sleep_window", config.sleep_debt_window.to_string());
        vars.insert("fight_week_days", config.fight_week_days.to_string());
        vars.insert(
            "injury_window_days",
            config.persistent_injury_window_days.to_string(),
        );
        vars.insert(
            "stale_technique_days",
            config.stale_technique_days.to_string(),
        );

        vars
    }
}

/// A catalog entry
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable identifier, used by the UI for badge styling
    pub name: &'static str,
    pub priority: u8,
    pub predicate: fn(&RuleContext, &RuleConfig) -> bool,
    pub recommendation: &'static str,
    pub explanation: &'static str,
}

/// A rule that fired for the current context, text already rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub name: String,
    pub recommendation: String,
    pub explanation: String,
    pub priority: u8,
}

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionOutcome {
    pub suggestion_text: String,

    /// Most urgent first; empty when only the fallback applies
    pub triggered_rules: Vec<TriggeredRule>,
}

fn fight_week(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.days_to_competition()
        .is_some_and(|days| days <= cfg.fight_week_days)
}

fn taper_warning(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.days_to_competition()
        .is_some_and(|days| days > cfg.fight_week_days && days <= cfg.taper_days)
}

fn recovery_mode(ctx: &RuleContext, _cfg: &RuleConfig) -> bool {
    ctx.injuries.recovery_mode
}

fn hotspot(ctx: &RuleContext, _cfg: &RuleConfig) -> bool {
    ctx.check_in
        .as_ref()
        .and_then(|c| c.active_hotspot())
        .is_some()
}

fn persistent_injuries(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.most_reported_injury(cfg.persistent_injury_window_days)
        .is_some_and(|(_, count)| count >= cfg.persistent_injury_reports)
}

fn low_recovery(ctx: &RuleContext, _cfg: &RuleConfig) -> bool {
    ctx.wearable
        .as_ref()
        .and_then(|w| w.recovery_score)
        .is_some_and(|score| score < RECOVERY_LIGHT_SESSION_MIN)
}

fn stress_and_fatigue(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.check_in
        .as_ref()
        .is_some_and(|c| c.stress >= cfg.high_stress_min && c.energy <= cfg.low_energy_max)
}

fn high_soreness(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.check_in
        .as_ref()
        .is_some_and(|c| c.soreness >= cfg.high_soreness_min)
}

fn sleep_debt(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.poor_sleep_nights(cfg.sleep_debt_window, cfg.poor_sleep_max) >= cfg.sleep_debt_nights
}

fn hrv_drop(ctx: &RuleContext, _cfg: &RuleConfig) -> bool {
    ctx.hrv
        .as_ref()
        .is_some_and(|hrv| hrv.significant_drop && hrv.drop_pct > Decimal::ZERO)
}

fn deload(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.sessions_in_last_days(7) >= cfg.deload_sessions_per_week
}

fn gi_streak(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.class_streak(ClassType::Gi) >= cfg.class_streak
}

fn nogi_streak(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.class_streak(ClassType::NoGi) >= cfg.class_streak
}

/// Needs history older than the stale window, something inside it, and no
/// technique session inside it
fn stale_technique(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    let window = cfg.stale_technique_days as i64;
    let age = |s: &SessionSummary| (ctx.today - s.date).num_days();

    let has_older_history = ctx.window_sessions.iter().any(|s| age(s) >= window);
    let inside: Vec<&SessionSummary> = ctx
        .window_sessions
        .iter()
        .filter(|s| (0..window).contains(&age(s)))
        .collect();

    has_older_history
        && !inside.is_empty()
        && !inside.iter().any(|s| s.class_type.is_technique_focused())
}

fn green_light(ctx: &RuleContext, cfg: &RuleConfig) -> bool {
    ctx.tier == Some(Tier::TrainHard)
        && !hotspot(ctx, cfg)
        && !ctx.injuries.recovery_mode
}

/// The built-in catalog, in tie-break order
pub fn default_catalog() -> Vec<Rule> {
    vec![
        Rule {
            name: "comp_fight_week",
            priority: 1,
            predicate: fight_week,
            recommendation: "Fight week for {event}: {days_to_comp} days out. Sharpen timing, skip hard rounds, and dial in your weight.",
            explanation: "Competition within {fight_week_days} days.",
        },
        Rule {
            name: "recovery_mode_active",
            priority: 2,
            predicate: recovery_mode,
            recommendation: "Recovery mode is on. Stick to mobility, light drilling, or a full rest day.",
            explanation: "You switched recovery mode on.",
        },
        Rule {
            name: "hotspot_active",
            priority: 3,
            predicate: hotspot,
            recommendation: "Protect your {hotspot}: tell your partners and skip positions that load it.",
            explanation: "Today's check-in flagged a hotspot: {hotspot}.",
        },
        Rule {
            name: "persistent_injuries",
            priority: 4,
            predicate: persistent_injuries,
            recommendation: "Your {injury_area} has come up {injury_reports} times recently. Consider getting it looked at before it gets worse.",
            explanation: "Same area reported repeatedly within {injury_window_days} days.",
        },
        Rule {
            name: "whoop_low_recovery",
            priority: 5,
            predicate: low_recovery,
            recommendation: "Recovery is only {recovery}%. Keep today to drilling or take the day off.",
            explanation: "Wearable recovery is in the red.",
        },
        Rule {
            name: "high_stress_low_energy",
            priority: 6,
            predicate: stress_and_fatigue,
            recommendation: "High stress and low energy: choose a technique class over hard sparring.",
            explanation: "Stress {stress}/5 with energy {energy}/5.",
        },
        Rule {
            name: "high_soreness",
            priority: 7,
            predicate: high_soreness,
            recommendation: "Soreness is high ({soreness}/5). Flow roll or focus on drilling today.",
            explanation: "Reported soreness is {soreness}/5.",
        },
        Rule {
            name: "sleep_debt_high",
            priority: 8,
            predicate: sleep_debt,
            recommendation: "You've slept poorly {poor_sleep_nights} of the last {sleep_window} nights. Prioritize sleep before intensity.",
            explanation: "Repeated low sleep scores.",
        },
        Rule {
            name: "whoop_hrv_drop",
            priority: 9,
            predicate: hrv_drop,
            recommendation: "HRV is {hrv_drop_pct}% below your baseline. Lower the intensity today.",
            explanation: "HRV dropped well below your recent average.",
        },
        Rule {
            name: "comp_taper_warning",
            priority: 10,
            predicate: taper_warning,
            recommendation: "{event} is {days_to_comp} days away. Start tapering volume while keeping some intensity.",
            explanation: "Competition approaching; taper window has opened.",
        },
        Rule {
            name: "deload_week",
            priority: 11,
            predicate: deload,
            recommendation: "{sessions_this_week} sessions in 7 days. Plan a deload so your body can absorb the work.",
            explanation: "High weekly session count.",
        },
        Rule {
            name: "consecutive_gi",
            priority: 20,
            predicate: gi_streak,
            recommendation: "Your last {class_streak} sessions were all Gi. Mix in a No-Gi class to round out your game.",
            explanation: "Gi-only streak.",
        },
        Rule {
            name: "consecutive_nogi",
            priority: 21,
            predicate: nogi_streak,
            recommendation: "Your last {class_streak} sessions were all No-Gi. Put the gi back on for grip work.",
            explanation: "No-Gi-only streak.",
        },
        Rule {
            name: "stale_technique",
            priority: 22,
            predicate: stale_technique,
            recommendation: "No drilling or private lesson in over {stale_technique_days} days. Book some dedicated technique time.",
            explanation: "Only live training logged recently.",
        },
        Rule {
            name: "green_light",
            priority: 30,
            predicate: green_light,
            recommendation: "Green light: you're recovered and ready. Push hard rounds today.",
            explanation: "High readiness with no active hotspot.",
        },
    ]
}

/// Fill `{token}` placeholders that have values; leave the rest for the sanitizer
fn render(template: &str, vars: &HashMap<&'static str, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in vars {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    sanitize_suggestion(&rendered)
}

/// Evaluates a catalog against a context
pub struct RuleEngine {
    rules: Vec<Rule>,
    config: RuleConfig,
}

impl RuleEngine {
    /// Rule engine over the built-in catalog
    pub fn new(config: RuleConfig) -> Self {
        RuleEngine {
            rules: default_catalog(),
            config,
        }
    }

    /// Rule engine over a custom catalog
    pub fn with_rules(rules: Vec<Rule>, config: RuleConfig) -> Self {
        RuleEngine { rules, config }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run every predicate once and rank what fired
    pub fn evaluate(&self, ctx: &RuleContext) -> SuggestionOutcome {
        let vars = ctx.template_vars(&self.config);

        let mut triggered: Vec<TriggeredRule> = self
            .rules
            .iter()
            .filter(|rule| (rule.predicate)(ctx, &self.config))
            .map(|rule| TriggeredRule {
                name: rule.name.to_string(),
                recommendation: render(rule.recommendation, &vars),
                explanation: render(rule.explanation, &vars),
                priority: rule.priority,
            })
            .collect();

        // Stable sort keeps catalog order for equal priorities
        triggered.sort_by_key(|rule| rule.priority);

        let suggestion_text = match triggered.first() {
            Some(top) => top.recommendation.clone(),
            None => sanitize_suggestion(ctx.fallback_tier().fallback_suggestion()),
        };

        debug!(
            date = %ctx.today,
            fired = triggered.len(),
            top = triggered.first().map(|r| r.name.as_str()).unwrap_or("fallback"),
            "Rules evaluated"
        );

        SuggestionOutcome {
            suggestion_text,
            triggered_rules: triggered,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InjuryReport;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 18).unwrap()
    }

    fn days_ago(days: u64) -> NaiveDate {
        today().checked_sub_days(chrono::Days::new(days)).unwrap()
    }

    fn check_in(sleep: u8, stress: u8, soreness: u8, energy: u8) -> ReadinessCheckIn {
        ReadinessCheckIn {
            date: today(),
            sleep,
            stress,
            soreness,
            energy,
            hotspot_note: None,
            weight_kg: None,
        }
    }

    fn session(days: u64, class_type: ClassType) -> SessionSummary {
        SessionSummary {
            id: format!("session_{}", days),
            date: days_ago(days),
            class_type,
            duration_minutes: 60,
        }
    }

    fn base_context() -> RuleContext {
        RuleContext {
            today: today(),
            ..RuleContext::default()
        }
    }

    fn fired(outcome: &SuggestionOutcome) -> Vec<&str> {
        outcome
            .triggered_rules
            .iter()
            .map(|r| r.name.as_str())
            .collect()
    }

    #[test]
    fn test_sanitizer_strips_unresolved_tokens() {
        assert_eq!(
            sanitize_suggestion("Rest {day_count} days before {event}"),
            "Rest days before"
        );
        assert_eq!(sanitize_suggestion("Mixed {Case_Token} text"), "Mixed text");
        assert_eq!(sanitize_suggestion("  plain   text "), "plain text");
    }

    #[test]
    fn test_no_rules_uses_tier_fallback() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.tier = Some(Tier::LightSession);
        ctx.composite_tier = Some(Tier::LightSession);

        let outcome = engine.evaluate(&ctx);
        assert!(outcome.triggered_rules.is_empty());
        assert_eq!(
            outcome.suggestion_text,
            Tier::LightSession.fallback_suggestion()
        );
    }

    #[test]
    fn test_fallback_ignores_wearable_tier() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.tier = Some(Tier::LightSession);

        let outcome = engine.evaluate(&ctx);
        assert!(outcome.triggered_rules.is_empty());
        assert_eq!(outcome.suggestion_text, Tier::CheckIn.fallback_suggestion());

        ctx.tier = Some(Tier::NoSignal);
        assert_eq!(
            engine.evaluate(&ctx).suggestion_text,
            Tier::NoSignal.fallback_suggestion()
        );
    }

    #[test]
    fn test_priority_ordering() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        let mut entry = check_in(4, 2, 5, 4);
        entry.hotspot_note = Some("left elbow".to_string());
        ctx.check_in = Some(entry);
        ctx.competitions = vec![CompetitionEvent {
            name: "Fall Open".to_string(),
            date: today() + chrono::Duration::days(5),
        }];

        let outcome = engine.evaluate(&ctx);
        assert_eq!(
            fired(&outcome),
            vec!["comp_fight_week", "hotspot_active", "high_soreness"]
        );
        assert_eq!(
            outcome.suggestion_text,
            "Fight week for Fall Open: 5 days out. Sharpen timing, skip hard rounds, and dial in your weight."
        );
    }

    #[test]
    fn test_hotspot_text_rendered() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        let mut entry = check_in(4, 2, 2, 4);
        entry.hotspot_note = Some("left elbow".to_string());
        ctx.check_in = Some(entry);

        let outcome = engine.evaluate(&ctx);
        assert_eq!(
            outcome.suggestion_text,
            "Protect your left elbow: tell your partners and skip positions that load it."
        );
        assert_eq!(
            outcome.triggered_rules[0].explanation,
            "Today's check-in flagged a hotspot: left elbow."
        );
    }

    #[test]
    fn test_taper_window() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.competitions = vec![CompetitionEvent {
            name: "Worlds".to_string(),
            date: today() + chrono::Duration::days(10),
        }];

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["comp_taper_warning"]);
        assert!(outcome.suggestion_text.starts_with("Worlds is 10 days away."));
    }

    #[test]
    fn test_stress_and_green_light() {
        let engine = RuleEngine::default();

        let mut ctx = base_context();
        ctx.check_in = Some(check_in(3, 5, 2, 1));
        assert_eq!(fired(&engine.evaluate(&ctx)), vec!["high_stress_low_energy"]);

        let mut ctx = base_context();
        ctx.check_in = Some(check_in(5, 1, 1, 5));
        ctx.tier = Some(Tier::TrainHard);
        assert_eq!(fired(&engine.evaluate(&ctx)), vec!["green_light"]);

        ctx.injuries.recovery_mode = true;
        assert_eq!(
            fired(&engine.evaluate(&ctx)),
            vec!["recovery_mode_active"]
        );
    }

    #[test]
    fn test_class_streaks() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.recent_sessions = vec![
            session(1, ClassType::Gi),
            session(2, ClassType::Gi),
            session(3, ClassType::Gi),
            session(5, ClassType::NoGi),
        ];

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["consecutive_gi"]);
        assert!(outcome.suggestion_text.contains("last 3 sessions were all Gi"));

        ctx.recent_sessions[0].class_type = ClassType::NoGi;
        assert!(engine.evaluate(&ctx).triggered_rules.is_empty());
    }

    #[test]
    fn test_deload_and_stale_technique() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.window_sessions = (0..6).map(|d| session(d, ClassType::OpenMat)).collect();
        ctx.window_sessions.push(session(20, ClassType::Drilling));

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["deload_week", "stale_technique"]);
        assert!(outcome.suggestion_text.starts_with("6 sessions in 7 days."));

        // A recent drilling class keeps technique fresh
        ctx.window_sessions.push(session(3, ClassType::Drilling));
        assert!(!fired(&engine.evaluate(&ctx)).contains(&"stale_technique"));
    }

    #[test]
    fn test_stale_technique_needs_history() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.window_sessions = vec![session(1, ClassType::Gi), session(4, ClassType::NoGi)];
        assert!(engine.evaluate(&ctx).triggered_rules.is_empty());
    }

    #[test]
    fn test_persistent_injuries() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.injuries.reports = [2, 9, 15, 45]
            .iter()
            .map(|&d| InjuryReport {
                area: "Left Knee".to_string(),
                reported_on: days_ago(d),
            })
            .collect();

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["persistent_injuries"]);
        assert!(outcome.suggestion_text.starts_with("Your left knee has come up 3 times"));
    }

    #[test]
    fn test_sleep_debt() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.recent_check_ins = vec![
            check_in(2, 3, 3, 3),
            check_in(1, 3, 3, 3),
            check_in(4, 3, 3, 3),
            check_in(2, 3, 3, 3),
            check_in(5, 3, 3, 3),
            check_in(1, 3, 3, 3),
        ];

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["sleep_debt_high"]);
        assert_eq!(
            outcome.suggestion_text,
            "You've slept poorly 3 of the last 5 nights. Prioritize sleep before intensity."
        );
    }

    #[test]
    fn test_wearable_rules() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.wearable = Some(WearableRecovery {
            date: today(),
            recovery_score: Some(21),
            hrv_ms: Some(dec!(40)),
            resting_hr: Some(58),
        });
        ctx.hrv = Some(HrvTrend {
            latest_ms: dec!(40),
            baseline_ms: dec!(55),
            drop_pct: dec!(27.3),
            significant_drop: true,
        });

        let outcome = engine.evaluate(&ctx);
        assert_eq!(fired(&outcome), vec!["whoop_low_recovery", "whoop_hrv_drop"]);
        assert_eq!(
            outcome.triggered_rules[1].recommendation,
            "HRV is 27% below your baseline. Lower the intensity today."
        );
    }

    #[test]
    fn test_hrv_drop_text_rounds_half_up() {
        let engine = RuleEngine::default();
        let mut ctx = base_context();
        ctx.hrv = Some(HrvTrend {
            latest_ms: dec!(46.5),
            baseline_ms: dec!(60),
            drop_pct: dec!(22.5),
            significant_drop: true,
        });

        let outcome = engine.evaluate(&ctx);
        let hrv = outcome
            .triggered_rules
            .iter()
            .find(|r| r.name == "whoop_hrv_drop")
            .unwrap();
        assert_eq!(
            hrv.recommendation,
            "HRV is 23% below your baseline. Lower the intensity today."
        );
    }

    #[test]
    fn test_custom_catalog_is_data() {
        fn always(_: &RuleContext, _: &RuleConfig) -> bool {
            true
        }

        let engine = RuleEngine::with_rules(
            vec![Rule {
                name: "always",
                priority: 1,
                predicate: always,
                recommendation: "Rest {missing} today",
                explanation: "",
            }],
            RuleConfig::default(),
        );

        let outcome = engine.evaluate(&base_context());
        assert_eq!(outcome.suggestion_text, "Rest today");
    }
}
