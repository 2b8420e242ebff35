use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    at_risk::{at_risk_table, even_checkpoints, AtRiskRow, DEFAULT_CHECKPOINT_COUNT},
    confidence::{
        median_confidence_interval, ConfidenceBand, MedianInterval, DEFAULT_CONFIDENCE_LEVEL,
    },
    data::{Cohort, Subject},
    error::{Result, SurvivalError},
    kaplan_meier::{extract_median, kaplan_meier, SurvivalPoint},
    log_rank::{log_rank_test, LogRankResult, DEFAULT_ALPHA},
};

/// knobs for an analysis run - deserializable so it can sit in a request body or config file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub confidence_level: f64, // for the greenwood band
    pub alpha: f64,            // log-rank significance threshold
    pub checkpoint_count: usize, // auto at-risk checkpoints
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            alpha: DEFAULT_ALPHA,
            checkpoint_count: DEFAULT_CHECKPOINT_COUNT,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        ConfidenceBand::new(self.confidence_level)?;
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SurvivalError::invalid_parameter("alpha", self.alpha.to_string()));
        }
        if self.checkpoint_count == 0 {
            return Err(SurvivalError::invalid_parameter("checkpoint_count", "0"));
        }
        Ok(())
    }
}

/// everything the engine knows about one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub name: String,
    pub n: usize,
    pub events: usize,
    pub curve: Vec<SurvivalPoint>,
    pub median_survival: Option<f64>, // None = not reached
    pub median_interval: MedianInterval,
    #[serde(default)]
    pub color: Option<String>, // caller's business, passed through
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl GroupResult {
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// curves, log-rank & at-risk table for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurvivalReport {
    pub groups: Vec<GroupResult>,
    pub log_rank: LogRankResult,
    pub at_risk: Vec<AtRiskRow>,
}

impl SurvivalReport {
    /// print a plain-text summary
    pub fn print(&self) {
        println!("Survival Analysis Summary");
        println!("=========================");
        println!("{:<20} {:>8} {:>8} {:>14}", "group", "n", "events", "median");
        println!("{:-<53}", "");

        for group in &self.groups {
            let median = match group.median_survival {
                Some(t) => format!("{:.2}", t),
                None => "not reached".to_string(),
            };
            println!("{:<20} {:>8} {:>8} {:>14}", group.name, group.n, group.events, median);
        }
        println!();

        let verdict = if self.log_rank.significant { "significant" } else { "not significant" };
        println!(
            "log-rank: chi2 = {:.4} (df = {}), p = {:.4} - {} at alpha = {}",
            self.log_rank.chi_square,
            self.log_rank.degrees_of_freedom,
            self.log_rank.p_value,
            verdict,
            self.log_rank.alpha
        );
        println!();

        println!("number at risk");
        print!("{:<10}", "time");
        for group in &self.groups {
            print!(" {:>12}", group.name);
        }
        println!();
        for row in &self.at_risk {
            print!("{:<10.2}", row.time);
            for group in &self.groups {
                print!(" {:>12}", row.at_risk.get(&group.name).copied().unwrap_or(0));
            }
            println!();
        }
    }
}

/// survival engine w/ its settings. pure: no state survives between calls,
/// so one instance can serve many threads
#[derive(Debug, Clone, Default)]
pub struct SurvivalAnalysis {
    config: AnalysisConfig,
}

impl SurvivalAnalysis {
    /// defaults: 95% band, alpha 0.05, 6 checkpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// build from a (possibly deserialized) config, rejecting bad values up front
    pub fn from_config(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.config.confidence_level = level;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    pub fn with_checkpoint_count(mut self, count: usize) -> Self {
        self.config.checkpoint_count = count;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// one `GroupResult` per distinct group, curves annotated w/ the band
    pub fn kaplan_meier(&self, subjects: &[Subject]) -> Result<Vec<GroupResult>> {
        self.kaplan_meier_cohort(&Cohort::new(subjects)?)
    }

    /// same as [`Self::kaplan_meier`] for an already partitioned cohort
    pub fn kaplan_meier_cohort(&self, cohort: &Cohort) -> Result<Vec<GroupResult>> {
        let band = ConfidenceBand::new(self.config.confidence_level)?;

        cohort
            .groups()
            .iter()
            .map(|group| -> Result<GroupResult> {
                let curve = band.apply(&kaplan_meier(group)?);
                Ok(GroupResult {
                    name: group.name().to_string(),
                    n: group.n(),
                    events: group.n_events(),
                    median_survival: extract_median(&curve),
                    median_interval: median_confidence_interval(&curve),
                    curve,
                    color: None,
                    metadata: None,
                })
            })
            .collect()
    }

    pub fn log_rank(&self, subjects: &[Subject]) -> Result<LogRankResult> {
        log_rank_test(&Cohort::new(subjects)?, self.config.alpha)
    }

    /// at-risk table at `checkpoints`, or at evenly spaced ones over the
    /// observed range if none are given
    pub fn at_risk_table(
        &self,
        subjects: &[Subject],
        checkpoints: Option<&[f64]>,
    ) -> Result<Vec<AtRiskRow>> {
        self.at_risk_table_cohort(&Cohort::new(subjects)?, checkpoints)
    }

    pub fn at_risk_table_cohort(
        &self,
        cohort: &Cohort,
        checkpoints: Option<&[f64]>,
    ) -> Result<Vec<AtRiskRow>> {
        match checkpoints {
            Some(times) => at_risk_table(cohort, times),
            None => {
                let times = even_checkpoints(cohort.max_time(), self.config.checkpoint_count)?;
                at_risk_table(cohort, &times)
            }
        }
    }

    /// full comparison: curves, log-rank & at-risk table. all or nothing
    pub fn analyze(&self, subjects: &[Subject]) -> Result<SurvivalReport> {
        self.analyze_cohort(&Cohort::new(subjects)?)
    }

    pub fn analyze_cohort(&self, cohort: &Cohort) -> Result<SurvivalReport> {
        self.config.validate()?;

        let groups = self.kaplan_meier_cohort(cohort)?;
        let log_rank = log_rank_test(cohort, self.config.alpha)?;
        let at_risk = self.at_risk_table_cohort(cohort, None)?;

        debug!(
            groups = groups.len(),
            p_value = log_rank.p_value,
            "survival analysis complete"
        );

        Ok(SurvivalReport {
            groups,
            log_rank,
            at_risk,
        })
    }
}

/// km curves for every group, each annotated w/ a confidence band
/// (default level 0.95)
pub fn compute_kaplan_meier(
    subjects: &[Subject],
    confidence_level: Option<f64>,
) -> Result<Vec<GroupResult>> {
    SurvivalAnalysis::new()
        .with_confidence_level(confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL))
        .kaplan_meier(subjects)
}

/// log-rank test across all groups (default alpha 0.05)
pub fn compute_log_rank(subjects: &[Subject], alpha: Option<f64>) -> Result<LogRankResult> {
    SurvivalAnalysis::new()
        .with_alpha(alpha.unwrap_or(DEFAULT_ALPHA))
        .log_rank(subjects)
}

/// at-risk counts at the given checkpoints, or at evenly spaced ones
pub fn compute_at_risk_table(
    subjects: &[Subject],
    checkpoints: Option<&[f64]>,
) -> Result<Vec<AtRiskRow>> {
    SurvivalAnalysis::new().at_risk_table(subjects, checkpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_subjects() -> Vec<Subject> {
        vec![
            Subject::event(10.0, "A"),
            Subject::censored(20.0, "A"),
            Subject::event(15.0, "B"),
            Subject::event(30.0, "B"),
        ]
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = AnalysisConfig::default();
        assert_eq!(config.confidence_level, 0.95);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.checkpoint_count, 6);
        assert!(config.validate().is_ok());

        let bad = AnalysisConfig { alpha: 2.0, ..config };
        assert!(matches!(
            SurvivalAnalysis::from_config(bad),
            Err(SurvivalError::InvalidParameter { .. })
        ));
        let bad = AnalysisConfig { checkpoint_count: 0, ..config };
        assert!(bad.validate().is_err());
        let bad = AnalysisConfig { confidence_level: 1.0, ..config };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"alpha": 0.01}"#).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.confidence_level, 0.95);

        let engine = SurvivalAnalysis::from_config(config).unwrap();
        assert_eq!(engine.config().alpha, 0.01);
    }

    #[test]
    fn test_builder() {
        let engine = SurvivalAnalysis::new()
            .with_confidence_level(0.9)
            .with_alpha(0.1)
            .with_checkpoint_count(3);
        assert_eq!(engine.config().confidence_level, 0.9);
        assert_eq!(engine.config().alpha, 0.1);
        assert_eq!(engine.config().checkpoint_count, 3);
    }

    #[test]
    fn test_group_results() {
        let results = compute_kaplan_meier(&create_test_subjects(), None).unwrap();
        assert_eq!(results.len(), 2);

        let a = &results[0];
        assert_eq!(a.name, "A");
        assert_eq!(a.n, 2);
        assert_eq!(a.events, 1);
        assert_eq!(a.median_survival, Some(10.0));
        assert!(a.curve.iter().all(|p| p.lower.is_some() && p.upper.is_some()));

        let b = &results[1];
        assert_eq!(b.median_survival, Some(15.0));
        assert_eq!(b.curve.last().unwrap().survival, 0.0);
    }

    #[test]
    fn test_bad_confidence_level_fails() {
        assert!(compute_kaplan_meier(&create_test_subjects(), Some(1.5)).is_err());
    }

    #[test]
    fn test_log_rank_defaults() {
        let result = compute_log_rank(&create_test_subjects(), None).unwrap();
        assert_eq!(result.alpha, 0.05);
        assert_relative_eq!(result.chi_square, 1.0 / 17.0, epsilon = 1e-12);
    }

    #[test]
    fn test_auto_checkpoints() {
        let engine = SurvivalAnalysis::new().with_checkpoint_count(4);
        let table = engine.at_risk_table(&create_test_subjects(), None).unwrap();

        let times: Vec<f64> = table.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 10.0, 20.0, 30.0]);
        assert_eq!(table[3].at_risk["B"], 1);
        assert_eq!(table[3].at_risk["A"], 0);
    }

    #[test]
    fn test_explicit_checkpoints() {
        let table = compute_at_risk_table(&create_test_subjects(), Some(&[5.0, 50.0][..])).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].at_risk["A"], 2);
        assert_eq!(table[1].at_risk["B"], 0);
    }

    #[test]
    fn test_analyze_report() {
        let report = SurvivalAnalysis::new().analyze(&create_test_subjects()).unwrap();
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.log_rank.degrees_of_freedom, 1);
        assert_eq!(report.at_risk.len(), DEFAULT_CHECKPOINT_COUNT);
        report.print();
    }

    #[test]
    fn test_analyze_is_all_or_nothing() {
        let one_group = vec![Subject::event(1.0, "A"), Subject::censored(2.0, "A")];
        assert!(matches!(
            SurvivalAnalysis::new().analyze(&one_group),
            Err(SurvivalError::InsufficientGroups { .. })
        ));
    }

    #[test]
    fn test_caller_fields_pass_through() {
        let results = compute_kaplan_meier(&create_test_subjects(), None).unwrap();
        let a = results[0]
            .clone()
            .with_color("#d62728")
            .with_metadata(serde_json::json!({ "gene": "TP53" }));

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["color"], "#d62728");
        assert_eq!(json["metadata"]["gene"], "TP53");
        assert_eq!(json["medianSurvival"], 10.0);
        assert!(json["curve"][0]["atRisk"].is_number());
    }
}
