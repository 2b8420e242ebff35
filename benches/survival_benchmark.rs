use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use survival_engine::{
    at_risk::at_risk_table, data::Cohort, log_rank::log_rank_test, Subject, SurvivalAnalysis,
};

fn generate_synthetic_subjects(n_per_group: usize, n_groups: usize) -> Vec<Subject> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut subjects = Vec::with_capacity(n_per_group * n_groups);

    for g in 0..n_groups {
        let hazard = 0.1 * (g + 1) as f64;
        for _ in 0..n_per_group {
            let u: f64 = rng.gen();
            let time = -(1.0 - u).ln() / hazard;
            let censoring_time = rng.gen_range(1.0..8.0);

            // round to whole days so there are plenty of ties
            if time < censoring_time {
                subjects.push(Subject::event(time.ceil(), format!("g{}", g)));
            } else {
                subjects.push(Subject::censored(censoring_time.ceil(), format!("g{}", g)));
            }
        }
    }

    subjects
}

fn benchmark_kaplan_meier(c: &mut Criterion) {
    let mut group = c.benchmark_group("kaplan_meier");
    let engine = SurvivalAnalysis::new();

    for &n_per_group in [100, 1_000, 10_000].iter() {
        let subjects = generate_synthetic_subjects(n_per_group, 2);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_per_group", n_per_group)),
            &subjects,
            |b, subjects| {
                b.iter(|| engine.kaplan_meier(black_box(subjects)).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_log_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_rank");

    for &n_groups in [2, 4, 8].iter() {
        let cohort = Cohort::new(&generate_synthetic_subjects(1_000, n_groups)).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_groups", n_groups)),
            &cohort,
            |b, cohort| {
                b.iter(|| log_rank_test(black_box(cohort), 0.05).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_at_risk_table(c: &mut Criterion) {
    let cohort = Cohort::new(&generate_synthetic_subjects(5_000, 3)).unwrap();
    let checkpoints: Vec<f64> = (0..=20).map(|i| i as f64 * 0.5).collect();

    c.bench_function("at_risk_table", |b| {
        b.iter(|| at_risk_table(black_box(&cohort), black_box(&checkpoints)).unwrap());
    });
}

fn benchmark_full_analysis(c: &mut Criterion) {
    let subjects = generate_synthetic_subjects(2_000, 2);
    let engine = SurvivalAnalysis::new();

    c.bench_function("analyze", |b| {
        b.iter(|| engine.analyze(black_box(&subjects)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_kaplan_meier,
    benchmark_log_rank,
    benchmark_at_risk_table,
    benchmark_full_analysis
);
criterion_main!(benches);
