use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::{GroupSeries, Subject},
    error::{Result, SurvivalError},
};

/// one step of a kaplan-meier curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalPoint {
    pub time: f64,
    pub survival: f64,       // S(t) after this step
    pub at_risk: usize,      // at risk just before this step
    pub events: usize,       // events observed at exactly `time`
    pub censored: usize,     // censored at exactly `time`
    #[serde(default)]
    pub lower: Option<f64>,  // filled in by the greenwood band
    #[serde(default)]
    pub upper: Option<f64>,
}

impl SurvivalPoint {
    /// synthetic first point: everybody alive & at risk
    pub fn origin(n: usize) -> Self {
        Self {
            time: 0.0,
            survival: 1.0,
            at_risk: n,
            events: 0,
            censored: 0,
            lower: None,
            upper: None,
        }
    }
}

/// kaplan-meier curve for one group. first point is the synthetic origin,
/// then one point per distinct observed time (censor-only times included so
/// they can be drawn as tick marks)
pub fn kaplan_meier(series: &GroupSeries) -> Result<Vec<SurvivalPoint>> {
    estimate_curve(series.n(), series.subjects())
}

/// product-limit walk over time-sorted subjects, starting with `n` at risk
pub(crate) fn estimate_curve(n: usize, subjects: &[Subject]) -> Result<Vec<SurvivalPoint>> {
    let mut curve = Vec::with_capacity(subjects.len() + 1);
    curve.push(SurvivalPoint::origin(n));

    let mut at_risk = n;
    let mut survival = 1.0;
    let mut i = 0;

    while i < subjects.len() {
        let time = subjects[i].time;
        if i > 0 && time < subjects[i - 1].time {
            return Err(SurvivalError::invalid_input(
                "subjects must be sorted by time before estimating a curve",
            ));
        }

        // everyone tied at this time goes into one step
        let mut events = 0;
        let mut censored = 0;
        let mut j = i;
        while j < subjects.len() && subjects[j].time == time {
            if subjects[j].event {
                events += 1;
            } else {
                censored += 1;
            }
            j += 1;
        }

        if events + censored > at_risk {
            return Err(SurvivalError::inconsistent_at_risk(format!(
                "{} subjects leave at t={} but only {} at risk",
                events + censored,
                time,
                at_risk
            )));
        }

        if events > 0 {
            survival *= 1.0 - events as f64 / at_risk as f64;
        }

        curve.push(SurvivalPoint {
            time,
            survival,
            at_risk,
            events,
            censored,
            lower: None,
            upper: None,
        });

        at_risk -= events + censored;
        i = j;
    }

    debug!(
        n,
        steps = curve.len() - 1,
        final_survival = survival,
        "estimated kaplan-meier curve"
    );
    Ok(curve)
}

/// S(t) read off the step function: 1.0 before the first step, the last
/// value after the end of follow-up
pub fn survival_at(curve: &[SurvivalPoint], time: f64) -> f64 {
    match curve.partition_point(|p| p.time <= time) {
        0 => 1.0,
        idx => curve[idx - 1].survival,
    }
}

/// median survival: first time the curve is at or below 0.5. read at the
/// step, no interpolation. `None` = not reached
pub fn extract_median(curve: &[SurvivalPoint]) -> Option<f64> {
    first_time_at_or_below(curve, 0.5)
}

/// time by which a fraction `p` of the group has had the event
/// (first time with S(t) <= 1 - p). `p = 0.5` is the median
pub fn survival_quantile(curve: &[SurvivalPoint], p: f64) -> Result<Option<f64>> {
    if !(p > 0.0 && p < 1.0) {
        return Err(SurvivalError::invalid_parameter("quantile", p.to_string()));
    }
    Ok(first_time_at_or_below(curve, 1.0 - p))
}

fn first_time_at_or_below(curve: &[SurvivalPoint], threshold: f64) -> Option<f64> {
    curve
        .iter()
        .find(|point| point.survival <= threshold)
        .map(|point| point.time)
}
