use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::Cohort,
    error::{Result, SurvivalError},
};

/// number of evenly spaced checkpoints when the caller doesn't pick any
pub const DEFAULT_CHECKPOINT_COUNT: usize = 6;

/// one row of the "number at risk" table printed under a km plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskRow {
    pub time: f64,
    pub at_risk: BTreeMap<String, usize>, // group name -> subjects with time >= checkpoint
}

/// `count` evenly spaced checkpoints from 0 to `max_time` inclusive
pub fn even_checkpoints(max_time: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(SurvivalError::invalid_parameter("checkpoint_count", "0"));
    }
    if !max_time.is_finite() || max_time < 0.0 {
        return Err(SurvivalError::invalid_input(format!(
            "can't space checkpoints up to {}",
            max_time
        )));
    }
    if count == 1 || max_time == 0.0 {
        return Ok(vec![0.0]);
    }

    let last = (count - 1) as f64;
    Ok((0..count).map(|i| max_time * i as f64 / last).collect())
}

fn validate_checkpoints(checkpoints: &[f64]) -> Result<()> {
    if checkpoints.is_empty() {
        return Err(SurvivalError::invalid_input("need at least one checkpoint"));
    }
    if checkpoints.iter().any(|&t| !t.is_finite() || t < 0.0) {
        return Err(SurvivalError::invalid_input(
            "checkpoints must be non-negative & finite",
        ));
    }
    if checkpoints.windows(2).any(|w| w[1] < w[0]) {
        return Err(SurvivalError::invalid_input("checkpoints must be ascending"));
    }
    Ok(())
}

/// at-risk counts for every group at each checkpoint: subjects with
/// `time >= checkpoint`. a checkpoint equal to an observed time reports the
/// same count as the km point at that time; between observed times it is
/// smaller than the preceding km point's `at_risk`, since the subjects that
/// left at that point are no longer counted
pub fn at_risk_table(cohort: &Cohort, checkpoints: &[f64]) -> Result<Vec<AtRiskRow>> {
    validate_checkpoints(checkpoints)?;

    let rows: Vec<AtRiskRow> = checkpoints
        .iter()
        .map(|&time| AtRiskRow {
            time,
            at_risk: cohort
                .groups()
                .iter()
                .map(|g| (g.name().to_string(), g.at_risk_at(time)))
                .collect(),
        })
        .collect();

    debug!(
        checkpoints = rows.len(),
        groups = cohort.n_groups(),
        "built at-risk table"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Subject, kaplan_meier::kaplan_meier};

    fn create_test_cohort() -> Cohort {
        Cohort::new(&[
            Subject::event(10.0, "A"),
            Subject::censored(20.0, "A"),
            Subject::event(15.0, "B"),
            Subject::event(30.0, "B"),
            Subject::censored(30.0, "B"),
        ])
        .unwrap()
    }

    #[test]
    fn test_even_checkpoints() {
        assert_eq!(even_checkpoints(30.0, 4).unwrap(), vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(even_checkpoints(30.0, 1).unwrap(), vec![0.0]);
        assert_eq!(even_checkpoints(0.0, 5).unwrap(), vec![0.0]);
        assert!(even_checkpoints(30.0, 0).is_err());
        assert!(even_checkpoints(f64::NAN, 3).is_err());
    }

    #[test]
    fn test_at_risk_counts() {
        let cohort = create_test_cohort();
        let table = at_risk_table(&cohort, &[0.0, 10.0, 12.0, 30.0]).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table[0].at_risk["A"], 2);
        assert_eq!(table[0].at_risk["B"], 3);

        assert_eq!(table[1].at_risk["A"], 2); // the subject at 10 is still at risk at 10
        assert_eq!(table[2].at_risk["A"], 1);
        assert_eq!(table[2].at_risk["B"], 3);

        assert_eq!(table[3].at_risk["A"], 0);
        assert_eq!(table[3].at_risk["B"], 2);
    }

    #[test]
    fn test_between_observed_times_counts_remaining_subjects() {
        let cohort = create_test_cohort();
        let group = cohort.group("A").unwrap();
        let curve = kaplan_meier(group).unwrap();
        let table = at_risk_table(&cohort, &[12.0]).unwrap();

        // last km point at or before 12 is t = 10 with 2 at risk; only the
        // subject censored at 20 is still under observation at 12
        let previous = curve.iter().rev().find(|p| p.time <= 12.0).unwrap();
        assert_eq!(previous.at_risk, 2);
        assert_eq!(table[0].at_risk["A"], 1);
    }

    #[test]
    fn test_beyond_last_time_is_zero() {
        let cohort = create_test_cohort();
        let table = at_risk_table(&cohort, &[31.0, 1000.0]).unwrap();

        for row in &table {
            assert!(row.at_risk.values().all(|&n| n == 0));
        }
    }

    #[test]
    fn test_agrees_with_curve() {
        let cohort = create_test_cohort();
        for group in cohort.groups() {
            let curve = kaplan_meier(group).unwrap();
            let times: Vec<f64> = curve.iter().map(|p| p.time).collect();
            let table = at_risk_table(&cohort, &times).unwrap();

            for (point, row) in curve.iter().zip(table.iter()) {
                assert_eq!(point.at_risk, row.at_risk[group.name()]);
            }
        }
    }

    #[test]
    fn test_invalid_checkpoints() {
        let cohort = create_test_cohort();
        assert!(at_risk_table(&cohort, &[]).is_err());
        assert!(at_risk_table(&cohort, &[-1.0]).is_err());
        assert!(at_risk_table(&cohort, &[f64::INFINITY]).is_err());
        assert!(matches!(
            at_risk_table(&cohort, &[10.0, 5.0]),
            Err(SurvivalError::InvalidInput { .. })
        ));
    }
}
