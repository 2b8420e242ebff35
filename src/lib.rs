//! # survival engine
//!
//! kaplan-meier curves & log-rank tests for comparing cohorts - e.g. mutant vs wild-type
//!
//! ## what you get
//!
//! - kaplan-meier curves w/ proper tie handling
//! - greenwood confidence bands (log-log, always inside [0, 1])
//! - median survival (plus a confidence interval for it)
//! - number-at-risk tables that agree with the curves
//! - k-group log-rank test w/ chi-square p-values
//! - pure functions over value objects, so call it from as many threads as you like
//!
//! ## quick start
//!
//! ```rust
//! use survival_engine::{SurvivalAnalysis, Subject};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // (time, event?, group) - event = false means censored
//! let subjects = vec![
//!     Subject::event(10.0, "TP53 mutant"),
//!     Subject::censored(20.0, "TP53 mutant"),
//!     Subject::event(15.0, "wild-type"),
//!     Subject::event(30.0, "wild-type"),
//! ];
//!
//! let report = SurvivalAnalysis::new()
//!     .with_confidence_level(0.95)
//!     .with_alpha(0.05)
//!     .analyze(&subjects)?;
//!
//! assert_eq!(report.groups[0].median_survival, Some(10.0));
//! assert!(report.log_rank.p_value > 0.05);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod at_risk;
pub mod confidence;
pub mod data;
pub mod error;
pub mod kaplan_meier;
pub mod log_rank;

pub use analysis::{
    compute_at_risk_table, compute_kaplan_meier, compute_log_rank, AnalysisConfig, GroupResult,
    SurvivalAnalysis, SurvivalReport,
};
pub use at_risk::AtRiskRow;
pub use data::{Cohort, Subject};
pub use error::{Result, SurvivalError};
pub use kaplan_meier::{extract_median, SurvivalPoint};
pub use log_rank::LogRankResult;
