use bjjlog::heatmap::aggregate_periods;
use bjjlog::rules::{RuleContext, RuleEngine};
use bjjlog::{
    ClassType, EngineConfig, InMemoryJournal, InsightEngine, JournalSnapshot, ReadinessCheckIn,
    SessionAttackDefenceTally, SessionSummary, Tier, ViewMode,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Performance benchmarks for the insight pipeline
///
/// Sized from a light hobbyist journal up to years of daily logging.

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 18).unwrap()
}

fn create_tallies(count: usize) -> Vec<SessionAttackDefenceTally> {
    (0..count)
        .map(|i| SessionAttackDefenceTally {
            session_id: format!("session_{}", i),
            date: today() - Duration::days((i % 60) as i64),
            attacks_attempted: (i % 12) as u32 + 1,
            attacks_successful: (i % 5) as u32,
            defenses_attempted: (i % 9) as u32 + 1,
            defenses_successful: (i % 4) as u32,
        })
        .collect()
}

fn create_journal(days: usize) -> InMemoryJournal {
    let check_ins = (0..days)
        .map(|i| ReadinessCheckIn {
            date: today() - Duration::days(i as i64),
            sleep: (i % 5) as u8 + 1,
            stress: ((i + 2) % 5) as u8 + 1,
            soreness: ((i + 1) % 5) as u8 + 1,
            energy: ((i + 3) % 5) as u8 + 1,
            hotspot_note: None,
            weight_kg: None,
        })
        .collect();
    let class_types = [ClassType::Gi, ClassType::NoGi, ClassType::OpenMat, ClassType::Drilling];
    let sessions = (0..days)
        .map(|i| SessionSummary {
            id: format!("session_{}", i),
            date: today() - Duration::days(i as i64),
            class_type: class_types[i % class_types.len()],
            duration_minutes: 75,
        })
        .collect();

    InMemoryJournal::new(JournalSnapshot {
        check_ins,
        sessions,
        tallies: create_tallies(days),
        ..Default::default()
    })
}

fn bench_heatmap_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Heatmap Aggregation");

    for &size in &[10, 100, 1000, 10000] {
        let tallies = create_tallies(size);

        group.throughput(Throughput::Elements(size as u64));
        for view in [ViewMode::Weekly, ViewMode::Monthly] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", view), size),
                &tallies,
                |b, tallies| {
                    b.iter(|| aggregate_periods(view, black_box(today()), black_box(tallies)));
                },
            );
        }
    }

    group.finish();
}

fn bench_rule_evaluation(c: &mut Criterion) {
    let engine = RuleEngine::default();
    let journal = create_journal(30);
    let ctx = RuleContext {
        today: today(),
        tier: Some(Tier::LightSession),
        composite_tier: Some(Tier::LightSession),
        check_in: journal.snapshot().check_ins.first().cloned(),
        recent_check_ins: journal.snapshot().check_ins.iter().take(5).cloned().collect(),
        recent_sessions: journal.snapshot().sessions.iter().take(10).cloned().collect(),
        window_sessions: journal.snapshot().sessions.clone(),
        ..Default::default()
    };

    c.bench_function("evaluate_default_catalog", |b| {
        b.iter(|| engine.evaluate(black_box(&ctx)));
    });
}

fn bench_daily_recommendations(c: &mut Criterion) {
    let mut group = c.benchmark_group("Daily Recommendations");
    let journal = create_journal(365);
    let engine = InsightEngine::new(&journal, EngineConfig::default());

    for &days in &[7, 30, 90] {
        let moments: Vec<NaiveDateTime> = (0..days)
            .map(|i| (today() - Duration::days(i)).and_hms_opt(7, 0, 0).unwrap())
            .collect();

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(
            BenchmarkId::new("parallel_batch", days),
            &moments,
            |b, moments| {
                b.iter(|| engine.daily_recommendations(black_box(moments)));
            },
        );
    }

    group.finish();
}

fn bench_fight_dynamics_insights(c: &mut Criterion) {
    let journal = create_journal(365);
    let engine = InsightEngine::new(&journal, EngineConfig::default());

    c.bench_function("fight_dynamics_insights", |b| {
        b.iter(|| engine.fight_dynamics_insights(black_box(today())));
    });
}

criterion_group!(
    benches,
    bench_heatmap_aggregation,
    bench_rule_evaluation,
    bench_daily_recommendations,
    bench_fight_dynamics_insights
);
criterion_main!(benches);
