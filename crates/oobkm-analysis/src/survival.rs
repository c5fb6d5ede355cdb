//! Survival analysis of right-censored outcomes per group
//!
//! Subjects whose event was not observed before follow-up ended are
//! right-censored: their true survival time is only known to exceed the
//! recorded time.
//!
//! ```text
//! Event:     |----x    (event observed at t)
//! Censored:  |------->  (still event-free at t, true time unknown)
//! ```
//!
//! Naive means over censored data underestimate survival. The Kaplan-Meier
//! estimator accounts for censoring, so each group's curve and median survival
//! are computed with it.
//!
//! # Examples
//!
//! ```
//! use oobkm_analysis::{cohort::Outcome, oob, risk_group::RiskGroup, survival::SurvivalStatsMap};
//!
//! let outcomes = vec![
//!     Outcome::new(true, 5.0).unwrap(),
//!     Outcome::new(false, 9.0).unwrap(),
//!     Outcome::new(true, 2.0).unwrap(),
//!     Outcome::new(true, 1.0).unwrap(),
//! ];
//! let predictions = vec![vec![0.1, 0.2, 0.9, 0.8], vec![0.2, 0.3, 0.8, 0.7]];
//! let in_bag = vec![vec![1, 1, 2, 3], vec![0, 0, 0, 0]];
//!
//! let aggregation = oob::aggregate(&outcomes, &predictions, &in_bag).unwrap();
//! let stats = SurvivalStatsMap::from_aggregation(&outcomes, &aggregation);
//!
//! let high = &stats.map[&RiskGroup::High];
//! assert_eq!(high.subjects_count, 2);
//! assert_eq!(high.median_km, Some(1.0));
//! ```

use std::collections::BTreeMap;

use oobkm_stats::survival::KaplanMeierCurve;

use crate::{cohort::Outcome, oob::Aggregation, risk_group::RiskGroup};

/// Survival statistics for a group of observations
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalStats {
    /// Total number of observations
    pub subjects_count: usize,
    /// Number of censored observations
    pub censored_count: usize,
    /// Mean survival time for complete observations only
    pub mean_complete: f64,
    /// Naive mean survival time for all observations
    pub mean_all: f64,
    /// Kaplan-Meier median survival time
    pub median_km: Option<f64>,
    /// Kaplan-Meier survival curve
    pub km_curve: KaplanMeierCurve,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalStatsMap<K> {
    pub map: BTreeMap<K, SurvivalStats>,
}

impl SurvivalStats {
    /// Calculate survival statistics from raw data
    ///
    /// # Arguments
    /// * `data` - Slice of (`survival_time`, `is_censored`) tuples
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(data: &[(f64, bool)]) -> Self {
        let subjects_count = data.len();
        let censored_count = data.iter().filter(|(_, c)| *c).count();

        let complete_times: Vec<f64> = data.iter().filter(|(_, c)| !*c).map(|(t, _)| *t).collect();

        let mean_complete = if complete_times.is_empty() {
            0.0
        } else {
            complete_times.iter().sum::<f64>() / complete_times.len() as f64
        };

        let mean_all = if data.is_empty() {
            0.0
        } else {
            data.iter().map(|(t, _)| *t).sum::<f64>() / subjects_count as f64
        };

        let km_curve = KaplanMeierCurve::from_data(data.to_vec());
        let median_km = km_curve.median_survival();

        Self {
            subjects_count,
            censored_count,
            mean_complete,
            mean_all,
            median_km,
            km_curve,
        }
    }

    /// Number of observations with an observed event
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.subjects_count - self.censored_count
    }

    /// Censoring rate as percentage
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn censoring_rate(&self) -> f64 {
        if self.subjects_count == 0 {
            return 0.0;
        }
        100.0 * self.censored_count as f64 / self.subjects_count as f64
    }
}

impl<K> SurvivalStatsMap<K> {
    /// Collect survival statistics grouped by a custom key
    ///
    /// # Arguments
    ///
    /// * `observations` - `(key, outcome)` pairs, one per subject
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::{cohort::Outcome, survival::SurvivalStatsMap};
    ///
    /// let observations = [
    ///     ("a", Outcome::new(true, 3.0).unwrap()),
    ///     ("b", Outcome::new(false, 4.0).unwrap()),
    ///     ("a", Outcome::new(true, 6.0).unwrap()),
    /// ];
    /// let stats = SurvivalStatsMap::collect_by_group(observations);
    /// assert_eq!(stats.map["a"].subjects_count, 2);
    /// assert_eq!(stats.map["b"].censored_count, 1);
    /// ```
    pub fn collect_by_group<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (K, Outcome)>,
        K: Ord,
    {
        let mut data_map: BTreeMap<K, Vec<(f64, bool)>> = BTreeMap::new();
        for (key, outcome) in observations {
            data_map
                .entry(key)
                .or_default()
                .push(outcome.to_survival_datum());
        }

        Self {
            map: data_map
                .into_iter()
                .map(|(key, data)| (key, SurvivalStats::from_data(&data)))
                .collect(),
        }
    }
}

impl SurvivalStatsMap<RiskGroup> {
    /// Collect survival statistics of each risk group
    ///
    /// Excluded subjects are skipped, and a group without subjects has no entry.
    ///
    /// # Panics
    ///
    /// Panics if `outcomes` is shorter than the cohort of `aggregation`.
    #[must_use]
    pub fn from_aggregation(outcomes: &[Outcome], aggregation: &Aggregation) -> Self {
        Self::collect_by_group(
            aggregation
                .scored()
                .map(|(subject, _, group)| (group, outcomes[subject])),
        )
    }
}
