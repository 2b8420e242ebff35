use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::{debug, warn};

use crate::{
    data::Cohort,
    error::{Result, SurvivalError},
};

pub const DEFAULT_ALPHA: f64 = 0.05;

/// observed vs expected events for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRankGroup {
    pub name: String,
    pub observed: f64,
    pub expected: f64,
    pub variance: f64, // hypergeometric variance of observed - expected
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRankResult {
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub significant: bool, // p_value < alpha
    pub alpha: f64,
    pub groups: Vec<LogRankGroup>,
}

/// per-group observed/expected/covariance accumulated over pooled event times
struct LogRankTally {
    observed: Array1<f64>,
    expected: Array1<f64>,
    covariance: Array2<f64>,
}

impl LogRankTally {
    fn accumulate(cohort: &Cohort) -> Self {
        let k = cohort.n_groups();
        let mut tally = Self {
            observed: Array1::zeros(k),
            expected: Array1::zeros(k),
            covariance: Array2::zeros((k, k)),
        };

        let mut cursors = vec![0usize; k]; // first subject with time >= current t
        let mut at_risk = vec![0usize; k];
        let mut events = vec![0usize; k];

        for t in cohort.event_times() {
            for (j, group) in cohort.groups().iter().enumerate() {
                let subjects = group.subjects();
                while cursors[j] < subjects.len() && subjects[cursors[j]].time < t {
                    cursors[j] += 1;
                }
                at_risk[j] = subjects.len() - cursors[j];
                events[j] = subjects[cursors[j]..]
                    .iter()
                    .take_while(|s| s.time == t)
                    .filter(|s| s.event)
                    .count();
            }

            let n_total: usize = at_risk.iter().sum();
            let d_total: usize = events.iter().sum();
            if n_total == 0 || d_total == 0 {
                continue;
            }

            let n = n_total as f64;
            let d = d_total as f64;
            // (N - D) / (N - 1); a lone subject carries no variance
            let ties = if n_total > 1 { (n - d) / (n - 1.0) } else { 0.0 };

            for j in 0..k {
                if at_risk[j] == 0 {
                    continue;
                }
                let share_j = at_risk[j] as f64 / n;

                tally.observed[j] += events[j] as f64;
                tally.expected[j] += share_j * d;
                tally.covariance[[j, j]] += share_j * (1.0 - share_j) * ties * d;

                for l in (0..k).filter(|&l| l != j && at_risk[l] > 0) {
                    let share_l = at_risk[l] as f64 / n;
                    tally.covariance[[j, l]] -= share_j * share_l * ties * d;
                }
            }
        }

        tally
    }

    /// (O - E)^T V^-1 (O - E) over the first k - 1 groups; the last one is
    /// redundant since O - E sums to zero
    fn chi_square(&self) -> f64 {
        let m = self.observed.len() - 1;
        let diff = (&self.observed - &self.expected).slice(s![..m]).to_owned();
        let v = self.covariance.slice(s![..m, ..m]).to_owned();

        match solve_linear_system(&v, &diff) {
            Ok(x) => diff.dot(&x).max(0.0),
            Err(e) => {
                warn!(error = %e, "log-rank covariance is singular, no evidence of a difference");
                0.0
            }
        }
    }
}

/// log-rank test across every group in the cohort
pub fn log_rank_test(cohort: &Cohort, alpha: f64) -> Result<LogRankResult> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(SurvivalError::invalid_parameter("alpha", alpha.to_string()));
    }
    if cohort.n_groups() < 2 {
        return Err(SurvivalError::insufficient_groups(format!(
            "log-rank needs at least 2 groups, got {}",
            cohort.n_groups()
        )));
    }
    if let Some(group) = cohort.groups().iter().find(|g| g.n_events() == 0) {
        return Err(SurvivalError::insufficient_groups(format!(
            "group '{}' has no observed events",
            group.name()
        )));
    }

    let tally = LogRankTally::accumulate(cohort);
    let chi_square = tally.chi_square();
    let degrees_of_freedom = cohort.n_groups() - 1;
    let p_value = chi_square_p_value(chi_square, degrees_of_freedom)?;

    let groups = cohort
        .groups()
        .iter()
        .enumerate()
        .map(|(j, g)| LogRankGroup {
            name: g.name().to_string(),
            observed: tally.observed[j],
            expected: tally.expected[j],
            variance: tally.covariance[[j, j]],
        })
        .collect();

    debug!(
        chi_square,
        degrees_of_freedom,
        p_value,
        "log-rank test done"
    );

    Ok(LogRankResult {
        chi_square,
        degrees_of_freedom,
        p_value,
        significant: p_value < alpha,
        alpha,
        groups,
    })
}

/// upper tail of chi-square(df) beyond `chi_square`
pub fn chi_square_p_value(chi_square: f64, degrees_of_freedom: usize) -> Result<f64> {
    if chi_square <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(degrees_of_freedom as f64)
        .map_err(|e| SurvivalError::numerical_error(e.to_string()))?;
    Ok(dist.sf(chi_square).clamp(0.0, 1.0))
}

/// solve Ax = b by gaussian elimination w/ partial pivoting
fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return Err(SurvivalError::numerical_error("matrix dimensions mismatch"));
    }

    let mut a = a.clone();
    let mut b = b.clone();

    // forward elimination
    for i in 0..n {
        let max_row = (i..n)
            .max_by(|&x, &y| a[[x, i]].abs().total_cmp(&a[[y, i]].abs()))
            .unwrap_or(i);

        if a[[max_row, i]].abs() < 1e-12 {
            return Err(SurvivalError::numerical_error("matrix is singular"));
        }

        if max_row != i {
            for j in 0..n {
                a.swap([i, j], [max_row, j]);
            }
            b.swap(i, max_row);
        }

        for k in i + 1..n {
            let factor = a[[k, i]] / a[[i, i]];
            for j in i..n {
                a[[k, j]] -= factor * a[[i, j]];
            }
            b[k] -= factor * b[i];
        }
    }

    // back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = b[i];
        for j in i + 1..n {
            x[i] -= a[[i, j]] * x[j];
        }
        x[i] /= a[[i, i]];
    }

    Ok(x)
}
