use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SurvivalError};

/// one observed patient/sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub time: f64,     // time from origin to event/censoring
    pub event: bool,   // true = event observed, false = censored
    pub group: String, // cohort label
}

impl Subject {
    pub fn new(time: f64, event: bool, group: impl Into<String>) -> Self {
        Self {
            time,
            event,
            group: group.into(),
        }
    }

    /// subject whose event was observed at `time`
    pub fn event(time: f64, group: impl Into<String>) -> Self {
        Self::new(time, true, group)
    }

    /// subject lost to follow-up (or study end) at `time`
    pub fn censored(time: f64, group: impl Into<String>) -> Self {
        Self::new(time, false, group)
    }
}

fn validate_time(time: f64) -> Result<()> {
    if !time.is_finite() || time < 0.0 {
        return Err(SurvivalError::invalid_input(format!(
            "times must be non-negative & finite, got {}",
            time
        )));
    }
    Ok(())
}

/// one group's subjects, sorted ascending by time (stable, so input order
/// survives among ties)
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSeries {
    name: String,
    subjects: Vec<Subject>,
}

impl GroupSeries {
    fn new(name: String, mut subjects: Vec<Subject>) -> Result<Self> {
        if subjects.is_empty() {
            return Err(SurvivalError::invalid_input(format!(
                "group '{}' has no subjects",
                name
            )));
        }
        subjects.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { name, subjects })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// sorted subjects
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// how many subjects in the group
    pub fn n(&self) -> usize {
        self.subjects.len()
    }

    /// how many observed events
    pub fn n_events(&self) -> usize {
        self.subjects.iter().filter(|s| s.event).count()
    }

    /// last observed time (event or censoring)
    pub fn max_time(&self) -> f64 {
        self.subjects.last().map_or(0.0, |s| s.time)
    }

    /// subjects still under observation at `time`, i.e. with `subject.time >= time`
    pub fn at_risk_at(&self, time: f64) -> usize {
        self.n() - self.subjects.partition_point(|s| s.time < time)
    }
}

/// validated dataset partitioned into groups - this is what every estimator consumes
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    groups: Vec<GroupSeries>, // in order of first appearance
}

impl Cohort {
    /// group raw subjects by their `group` label and sort each group by time.
    /// the input slice is left untouched
    pub fn new(subjects: &[Subject]) -> Result<Self> {
        if subjects.is_empty() {
            return Err(SurvivalError::invalid_input("dataset is empty"));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut partition: Vec<(String, Vec<Subject>)> = Vec::new();

        for subject in subjects {
            validate_time(subject.time)?;
            if subject.group.is_empty() {
                return Err(SurvivalError::invalid_input("subject is missing a group label"));
            }

            let slot = *index.entry(subject.group.as_str()).or_insert_with(|| {
                partition.push((subject.group.clone(), Vec::new()));
                partition.len() - 1
            });
            partition[slot].1.push(subject.clone());
        }

        Self::from_partition(partition)
    }

    /// build a cohort from a partition computed upstream (expression quartiles,
    /// threshold splits, ...). each entry is `(group name, [(time, event)])`
    pub fn from_groups<I, S>(groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<(f64, bool)>)>,
        S: Into<String>,
    {
        let mut partition: Vec<(String, Vec<Subject>)> = Vec::new();
        for (name, records) in groups {
            let name = name.into();
            if name.is_empty() {
                return Err(SurvivalError::invalid_input("group name can't be empty"));
            }
            if partition.iter().any(|(existing, _)| *existing == name) {
                return Err(SurvivalError::invalid_input(format!(
                    "group '{}' appears twice",
                    name
                )));
            }

            let mut subjects = Vec::with_capacity(records.len());
            for (time, event) in records {
                validate_time(time)?;
                subjects.push(Subject::new(time, event, name.clone()));
            }
            partition.push((name, subjects));
        }

        if partition.is_empty() {
            return Err(SurvivalError::invalid_input("dataset is empty"));
        }

        Self::from_partition(partition)
    }

    fn from_partition(partition: Vec<(String, Vec<Subject>)>) -> Result<Self> {
        let groups = partition
            .into_iter()
            .map(|(name, subjects)| GroupSeries::new(name, subjects))
            .collect::<Result<Vec<_>>>()?;

        let cohort = Self { groups };
        debug!(
            groups = cohort.n_groups(),
            subjects = cohort.n_subjects(),
            "normalized cohort"
        );
        Ok(cohort)
    }

    pub fn groups(&self) -> &[GroupSeries] {
        &self.groups
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// total subjects across all groups
    pub fn n_subjects(&self) -> usize {
        self.groups.iter().map(GroupSeries::n).sum()
    }

    /// look a group up by name
    pub fn group(&self, name: &str) -> Option<&GroupSeries> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// latest observed time over every group
    pub fn max_time(&self) -> f64 {
        self.groups
            .iter()
            .map(GroupSeries::max_time)
            .fold(0.0, f64::max)
    }

    /// pooled, deduplicated, ascending event times (censor-only times left out)
    pub fn event_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .groups
            .iter()
            .flat_map(|g| g.subjects.iter())
            .filter_map(|s| if s.event { Some(s.time) } else { None })
            .collect();

        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }
}
