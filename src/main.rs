use anyhow::{bail, Context, Result};
use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use bjjlog::config::AppConfig;
use bjjlog::heatmap::heat_intensity;
use bjjlog::logging::{init_logging, LogLevel};
use bjjlog::{
    DailyRecommendation, FightDynamicsInsights, GoalPeriod, GoalProgress, HeatmapPeriod,
    InMemoryJournal, InsightEngine, Tier, ViewMode,
};

/// bjjlog - BJJ training insights
///
/// Turns a journal export (check-ins, wearable recovery, sessions and
/// attack/defence tallies) into daily recommendations, heatmaps, trend
/// insights and goal progress.
#[derive(Parser)]
#[command(name = "bjjlog")]
#[command(author = "bjjlog Contributors")]
#[command(version = "0.1.0")]
#[command(about = "BJJ training insight CLI", long_about = None)]
struct Cli {
    /// Journal export (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    journal: Option<PathBuf>,

    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// What should I do today?
    Recommend {
        /// Local time to evaluate (YYYY-MM-DDTHH:MM:SS, default: now)
        #[arg(short, long)]
        at: Option<NaiveDateTime>,

        /// Also evaluate this many preceding days at the same time
        #[arg(short, long, default_value = "1")]
        days: u32,
    },

    /// Attack/defence heatmap by period
    Heatmap {
        /// Period grid (weekly, monthly)
        #[arg(long, default_value = "weekly")]
        view: ViewMode,

        /// Reference day (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Trends, imbalance and suggested focus
    Insights {
        /// Reference day (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Progress toward weekly or monthly goals
    Goals {
        /// Goal period (weekly, monthly)
        #[arg(short, long, default_value = "weekly")]
        period: GoalPeriod,

        /// Reference day (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Configure application settings
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct HeatmapRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Attacks")]
    attacks: String,
    #[tabled(rename = "Att %")]
    attack_rate: String,
    #[tabled(rename = "Defenses")]
    defenses: String,
    #[tabled(rename = "Def %")]
    defense_rate: String,
    #[tabled(rename = "Sessions")]
    sessions: u32,
    #[tabled(rename = "Heat")]
    heat: String,
}

#[derive(Tabled)]
struct GoalRow {
    #[tabled(rename = "Goal")]
    metric: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Progress")]
    pct: String,
}

fn rate(value: Option<u8>) -> String {
    value.map(|r| format!("{}%", r)).unwrap_or_else(|| "-".to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_journal(path: Option<&Path>) -> Result<InMemoryJournal> {
    let Some(path) = path else {
        bail!("No journal given, pass --journal <FILE>");
    };
    InMemoryJournal::from_json_file(path)
        .with_context(|| format!("Failed to load journal: {}", path.display()))
}

fn tier_colored(tier: Tier) -> ColoredString {
    match tier {
        Tier::TrainHard => tier.label().green().bold(),
        Tier::LightSession => tier.label().yellow().bold(),
        Tier::RestDay => tier.label().red().bold(),
        Tier::CheckIn | Tier::NoSignal => tier.label().dimmed(),
    }
}

fn print_recommendation(rec: &DailyRecommendation) {
    println!(
        "{} {}",
        rec.day_part.greeting().bold(),
        rec.date.format("(%a %b %-d)").to_string().dimmed()
    );
    println!("  {}", tier_colored(rec.primary_tier));
    if let Some(score) = rec.composite_score {
        println!("  Readiness: {}/20", score);
    }
    if let Some(score) = rec.recovery_score {
        println!("  Recovery:  {}%", score);
    }
    println!("  {}", rec.suggestion_text);
    if rec.show_check_in_prompt {
        println!("  {}", "Log today's check-in for a tailored plan.".cyan());
    }
    for badge in rec.top_badges(3) {
        println!("  {} {}", "•".blue(), badge.explanation);
    }
}

fn print_heatmap(periods: &[HeatmapPeriod]) {
    let max_attempted = periods.iter().map(|p| p.total_attempted()).max().unwrap_or(0);
    let rows: Vec<HeatmapRow> = periods
        .iter()
        .map(|p| {
            let intensity = heat_intensity(p.total_attempted(), max_attempted);
            HeatmapRow {
                period: p.label.clone(),
                attacks: format!("{}/{}", p.attacks_successful, p.attacks_attempted),
                attack_rate: rate(p.attack_success_rate()),
                defenses: format!("{}/{}", p.defenses_successful, p.defenses_attempted),
                defense_rate: rate(p.defense_success_rate()),
                sessions: p.session_count,
                heat: "█".repeat((intensity * 10.0).round() as usize),
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_insights(insights: &FightDynamicsInsights) {
    if !insights.has_sufficient_data {
        println!(
            "{}",
            format!(
                "Not enough data yet: {} of {} sessions with tallies.",
                insights.sessions_with_data, insights.sessions_needed
            )
            .yellow()
        );
        return;
    }

    println!("{}", "Fight dynamics (last 4 weeks vs the 4 before)".cyan().bold());
    if let Some(offense) = &insights.offensive_trend {
        println!(
            "  Offense: volume {:?} ({}%), success {:?} ({} pts)",
            offense.volume_change,
            offense.volume_change_pct,
            offense.rate_direction,
            offense.rate_change_pct
        );
    }
    if let Some(defense) = &insights.defensive_trend {
        println!(
            "  Defense: volume {:?} ({}%), success {:?} ({} pts)",
            defense.volume_change,
            defense.volume_change_pct,
            defense.rate_direction,
            defense.rate_change_pct
        );
    }
    if let Some(imbalance) = &insights.imbalance {
        let line = if imbalance.detected {
            imbalance.description.red()
        } else {
            imbalance.description.normal()
        };
        println!("  {}", line);
    }
    for suggestion in &insights.suggested_focus {
        println!(
            "  [{:?}] {:?}: {}",
            suggestion.priority, suggestion.area, suggestion.message
        );
    }
}

fn print_goals(progress: &[GoalProgress]) {
    if progress.is_empty() {
        println!("{}", "No goals set for this period.".dimmed());
        return;
    }
    let rows: Vec<GoalRow> = progress
        .iter()
        .map(|g| GoalRow {
            metric: g.metric.to_string(),
            actual: g.actual.normalize().to_string(),
            target: g.target.normalize().to_string(),
            pct: if g.is_met() {
                format!("{}% ✓", g.pct)
            } else {
                format!("{}%", g.pct)
            },
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref());

    config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    init_logging(&config.logging)?;

    let today = Local::now().date_naive();

    match cli.command {
        Commands::Recommend { at, days } => {
            let journal = load_journal(cli.journal.as_deref())?;
            let engine = InsightEngine::new(&journal, config.engine.clone());
            let now = at.unwrap_or_else(|| Local::now().naive_local());

            let moments: Vec<NaiveDateTime> = (0..days.max(1) as u64)
                .rev()
                .filter_map(|offset| now.checked_sub_days(Days::new(offset)))
                .collect();
            let recommendations = engine.daily_recommendations(&moments);

            if cli.json {
                print_json(&recommendations)?;
            } else {
                for (i, rec) in recommendations.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    print_recommendation(rec);
                }
            }
        }

        Commands::Heatmap { view, date } => {
            let journal = load_journal(cli.journal.as_deref())?;
            let engine = InsightEngine::new(&journal, config.engine.clone());
            let periods = engine.fight_dynamics_heatmap(view, date.unwrap_or(today))?;

            if cli.json {
                print_json(&periods)?;
            } else {
                print_heatmap(&periods);
            }
        }

        Commands::Insights { date } => {
            let journal = load_journal(cli.journal.as_deref())?;
            let engine = InsightEngine::new(&journal, config.engine.clone());
            let insights = engine.fight_dynamics_insights(date.unwrap_or(today))?;

            if cli.json {
                print_json(&insights)?;
            } else {
                print_insights(&insights);
            }
        }

        Commands::Goals { period, date } => {
            let journal = load_journal(cli.journal.as_deref())?;
            let engine = InsightEngine::new(&journal, config.engine.clone());
            let progress = engine.goal_progress(period, date.unwrap_or(today))?;

            if cli.json {
                print_json(&progress)?;
            } else {
                print_goals(&progress);
            }
        }

        Commands::Config { init, show } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);

            if init {
                if path.exists() {
                    bail!("Config already exists at {}", path.display());
                }
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!(
                    "{}",
                    format!("✓ Wrote default config to {}", path.display()).green()
                );
            }

            if show || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
