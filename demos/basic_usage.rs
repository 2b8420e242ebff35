use survival_engine::{
    compute_at_risk_table, compute_kaplan_meier, compute_log_rank, extract_median, Subject,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Kaplan-Meier Survival Analysis - Basic Usage Example");
    println!("====================================================\n");

    // months from diagnosis; false = censored (alive at last follow-up)
    let mutant = [
        (3.2, true), (5.1, true), (6.0, false), (7.4, true), (9.9, true),
        (11.2, false), (12.5, true), (14.0, true), (18.3, false), (21.7, true),
    ];
    let wild_type = [
        (4.8, true), (8.9, false), (12.1, true), (15.6, false), (19.4, true),
        (23.0, false), (26.8, true), (31.2, false), (35.5, false), (40.1, false),
    ];

    let mut subjects = Vec::new();
    for &(time, event) in &mutant {
        subjects.push(Subject::new(time, event, "TP53 mutant"));
    }
    for &(time, event) in &wild_type {
        subjects.push(Subject::new(time, event, "TP53 wild-type"));
    }

    println!("Dataset Information:");
    println!("  - Number of subjects: {}", subjects.len());
    println!("  - Number of events: {}", subjects.iter().filter(|s| s.event).count());
    println!("  - Number of censored: {}", subjects.iter().filter(|s| !s.event).count());
    println!();

    // Example 1: curves w/ 95% bands
    println!("Example 1: Kaplan-Meier Curves");
    println!("------------------------------");

    let groups = compute_kaplan_meier(&subjects, None)?;
    for group in &groups {
        println!("{} (n = {}, events = {})", group.name, group.n, group.events);
        println!(
            "{:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "time", "at risk", "events", "S(t)", "lower", "upper"
        );
        for point in &group.curve {
            println!(
                "{:>8.1} {:>8} {:>8} {:>8.3} {:>8.3} {:>8.3}",
                point.time,
                point.at_risk,
                point.events,
                point.survival,
                point.lower.unwrap_or(point.survival),
                point.upper.unwrap_or(point.survival),
            );
        }

        match extract_median(&group.curve) {
            Some(median) => println!("median survival: {:.1} months\n", median),
            None => println!("median survival: not reached\n"),
        }
    }

    // Example 2: log-rank
    println!("Example 2: Log-Rank Test");
    println!("------------------------");

    let log_rank = compute_log_rank(&subjects, None)?;
    for group in &log_rank.groups {
        println!(
            "{:<16} observed {:>5.1}  expected {:>6.2}",
            group.name, group.observed, group.expected
        );
    }
    println!(
        "chi2 = {:.4}, df = {}, p = {:.4} ({})\n",
        log_rank.chi_square,
        log_rank.degrees_of_freedom,
        log_rank.p_value,
        if log_rank.significant { "significant" } else { "not significant" }
    );

    // Example 3: at-risk table at yearly checkpoints
    println!("Example 3: Number at Risk");
    println!("-------------------------");

    let checkpoints = [0.0, 12.0, 24.0, 36.0, 48.0];
    for row in compute_at_risk_table(&subjects, Some(&checkpoints[..]))? {
        let counts: Vec<String> = row
            .at_risk
            .iter()
            .map(|(name, n)| format!("{}: {}", name, n))
            .collect();
        println!("month {:>4.0}  {}", row.time, counts.join(", "));
    }

    Ok(())
}
