use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use survival_engine::{AnalysisConfig, Cohort, SurvivalAnalysis};

/// simulate expression-quartile cohorts: higher quartile, higher hazard
fn simulate_quartiles(n_per_quartile: usize, seed: u64) -> Vec<(String, Vec<(f64, bool)>)> {
    let mut rng = StdRng::seed_from_u64(seed);

    (1..=4)
        .map(|q| {
            let hazard = 0.05 * q as f64;
            let records = (0..n_per_quartile)
                .map(|_| {
                    let u: f64 = rng.gen();
                    let time = -(1.0 - u).ln() / hazard;
                    let censoring_time = rng.gen_range(6.0..60.0);
                    if time < censoring_time {
                        (time, true)
                    } else {
                        (censoring_time, false)
                    }
                })
                .collect();
            (format!("Q{}", q), records)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Cohort Comparison - Expression Quartiles");
    println!("========================================\n");

    // settings as they'd arrive in a request body
    let config: AnalysisConfig =
        serde_json::from_str(r#"{"confidenceLevel": 0.9, "alpha": 0.01, "checkpointCount": 7}"#)?;
    let engine = SurvivalAnalysis::from_config(config)?;

    // the partition is computed upstream; the engine just consumes it
    let cohort = Cohort::from_groups(simulate_quartiles(75, 7))?;
    let report = engine.analyze_cohort(&cohort)?;
    report.print();
    println!();

    println!("median survival with {:.0}% interval:", config.confidence_level * 100.0);
    let fmt = |t: Option<f64>| t.map_or("NR".to_string(), |t| format!("{:.1}", t));
    for group in &report.groups {
        println!(
            "  {:<4} {:>6}  ({} - {})",
            group.name,
            fmt(group.median_survival),
            fmt(group.median_interval.lower),
            fmt(group.median_interval.upper),
        );
    }
    println!();

    // the same report, as the API layer would ship it
    let json = serde_json::to_string_pretty(&report.log_rank)?;
    println!("log-rank as json:\n{}", json);

    Ok(())
}
