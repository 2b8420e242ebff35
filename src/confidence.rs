use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::{
    error::{Result, SurvivalError},
    kaplan_meier::SurvivalPoint,
};

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// pointwise confidence band for a kaplan-meier curve: greenwood variance,
/// log-log transformed so the bounds stay inside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceBand {
    confidence_level: f64,
    z: f64, // two-sided normal quantile for the level
}

impl Default for ConfidenceBand {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            z: 1.959_963_984_540_054,
        }
    }
}

impl ConfidenceBand {
    /// band at `confidence_level` (0.95 -> z ~ 1.96)
    pub fn new(confidence_level: f64) -> Result<Self> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(SurvivalError::invalid_parameter(
                "confidence_level",
                confidence_level.to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| SurvivalError::numerical_error(e.to_string()))?;
        let z = normal.inverse_cdf((1.0 + confidence_level) / 2.0);

        Ok(Self { confidence_level, z })
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// copy of `curve` with `lower`/`upper` filled in at every point
    pub fn apply(&self, curve: &[SurvivalPoint]) -> Vec<SurvivalPoint> {
        curve
            .iter()
            .zip(greenwood_sums(curve))
            .map(|(point, var_sum)| {
                let (lower, upper) = log_log_bounds(point.survival, var_sum, self.z);
                SurvivalPoint {
                    lower: Some(lower),
                    upper: Some(upper),
                    ..*point
                }
            })
            .collect()
    }
}

/// running greenwood sum  Σ d / (n (n - d))  at each point. steps where
/// everybody left at risk has the event contribute nothing
fn greenwood_sums(curve: &[SurvivalPoint]) -> Vec<f64> {
    let mut var_sum = 0.0;
    curve
        .iter()
        .map(|point| {
            if point.events > 0 && point.at_risk > point.events {
                let n = point.at_risk as f64;
                let d = point.events as f64;
                var_sum += d / (n * (n - d));
            }
            var_sum
        })
        .collect()
}

/// greenwood variance of S(t) at each point: S^2 * Σ d / (n (n - d))
pub fn greenwood_variance(curve: &[SurvivalPoint]) -> Vec<f64> {
    curve
        .iter()
        .zip(greenwood_sums(curve))
        .map(|(point, var_sum)| point.survival * point.survival * var_sum)
        .collect()
}

/// S^exp(∓ z·σ / ln S). collapses to S where the log is undefined (S = 1,
/// S = 0) or there is no variance yet
fn log_log_bounds(survival: f64, var_sum: f64, z: f64) -> (f64, f64) {
    if survival >= 1.0 || survival <= 0.0 || var_sum <= 0.0 {
        return (survival, survival);
    }

    let spread = z * var_sum.sqrt() / survival.ln(); // negative: ln S < 0
    let lower = survival.powf((-spread).exp());
    let upper = survival.powf(spread.exp());

    (
        lower.clamp(0.0, 1.0).min(survival),
        upper.clamp(0.0, 1.0).max(survival),
    )
}

/// confidence interval for the median survival time, read off the band:
/// lower = first time the lower bound reaches 0.5, upper = first time the
/// upper bound does. either end may be not reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedianInterval {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// median interval from a curve already passed through [`ConfidenceBand::apply`];
/// points without bounds fall back to the point estimate
pub fn median_confidence_interval(curve: &[SurvivalPoint]) -> MedianInterval {
    let first_at_or_below_half = |bound: fn(&SurvivalPoint) -> f64| {
        curve
            .iter()
            .find(|point| bound(point) <= 0.5)
            .map(|point| point.time)
    };

    MedianInterval {
        lower: first_at_or_below_half(|p| p.lower.unwrap_or(p.survival)),
        upper: first_at_or_below_half(|p| p.upper.unwrap_or(p.survival)),
    }
}
