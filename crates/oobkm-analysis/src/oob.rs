//! Out-of-bag aggregation of bootstrap predictions
//!
//! Every bootstrap replicate trains a model on a resample of the cohort and
//! predicts the risk of every subject. A subject's out-of-bag (OOB) score is
//! the mean of the predictions made by the models that never saw it during
//! training:
//!
//! ```text
//! score[i] = mean { predictions[b][i] : i not in in_bag[b] }
//! ```
//!
//! # Algorithm
//!
//! 1. Validate shapes: `B` replicates in both predictions and in-bag lists,
//!    `n` entries in every inner sequence
//! 2. Build an [`InBagMask`]: one presence row per replicate, O(n) each
//! 3. Accumulate the OOB mean per subject in replicate order, O(n·B)
//! 4. Split the cohort at the median score (see [`risk_group`](crate::risk_group))
//!
//! Subjects that were drawn into every replicate have no OOB prediction.
//! Depending on [`InsufficientPolicy`] they either fail the whole computation
//! or are excluded from scoring and stratification.
//!
//! # Examples
//!
//! ```
//! use oobkm_analysis::{cohort::Outcome, oob, risk_group::RiskGroup};
//!
//! let outcomes = vec![
//!     Outcome::new(true, 5.0).unwrap(),
//!     Outcome::new(false, 9.0).unwrap(),
//!     Outcome::new(true, 2.0).unwrap(),
//! ];
//! let predictions = vec![vec![0.1, 0.2, 0.9], vec![0.3, 0.4, 0.7]];
//! // Replicate 0 drew subjects 1 and 2, replicate 1 drew only subject 0
//! let in_bag = vec![vec![1, 1, 2], vec![0, 0, 0]];
//!
//! let aggregation = oob::aggregate(&outcomes, &predictions, &in_bag).unwrap();
//! assert_eq!(aggregation.score(0), Some(0.1));
//! assert_eq!(aggregation.score(1), Some(0.4));
//! assert_eq!(aggregation.score(2), Some(0.7));
//! assert_eq!(aggregation.median(), 0.4);
//! assert_eq!(aggregation.group(1), Some(RiskGroup::Low));
//! assert_eq!(aggregation.group(2), Some(RiskGroup::High));
//! ```

use crate::{
    cohort::Outcome,
    risk_group::{RiskGroup, Stratification},
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum AggregateError {
    #[display("Cohort is empty: no subject has an aggregated score")]
    EmptyCohort,
    #[display(
        "Shape mismatch: {predictions} prediction replicates but {in_bag} in-bag replicates"
    )]
    ReplicateCountMismatch { predictions: usize, in_bag: usize },
    #[display(
        "Shape mismatch: replicate {replicate} has {found} predictions, expected {expected} (one per subject)"
    )]
    PredictionLengthMismatch {
        replicate: usize,
        expected: usize,
        found: usize,
    },
    #[display(
        "Shape mismatch: replicate {replicate} has {found} in-bag indices, expected {expected} (bootstrap sample size)"
    )]
    InBagLengthMismatch {
        replicate: usize,
        expected: usize,
        found: usize,
    },
    #[display(
        "In-bag index {index} at position {position} of replicate {replicate} is out of range for {n_subjects} subjects"
    )]
    InBagIndexOutOfRange {
        replicate: usize,
        position: usize,
        index: usize,
        n_subjects: usize,
    },
    #[display("Non-finite prediction {value} for subject {subject} in replicate {replicate}")]
    NonFinitePrediction {
        replicate: usize,
        subject: usize,
        value: f64,
    },
    #[display(
        "Data insufficiency: subject {subject} is in-bag in all {n_replicates} replicates and has no out-of-bag prediction"
    )]
    DataInsufficiency { subject: usize, n_replicates: usize },
}

impl AggregateError {
    /// Returns `true` for errors caused by inconsistent input dimensions.
    #[must_use]
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Self::ReplicateCountMismatch { .. }
                | Self::PredictionLengthMismatch { .. }
                | Self::InBagLengthMismatch { .. }
                | Self::InBagIndexOutOfRange { .. }
        )
    }
}

/// What to do with subjects that are in-bag in every replicate
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::FromStr,
)]
pub enum InsufficientPolicy {
    /// Fail the whole computation
    #[default]
    Reject,
    /// Leave the subject without score and group, and report it
    Exclude,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub on_insufficient: InsufficientPolicy,
}

/// In-bag membership of every subject in every replicate.
///
/// Multiplicity in the bootstrap sample is dropped; only presence matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InBagMask {
    n_subjects: usize,
    // rows[replicate][subject]
    rows: Vec<Vec<bool>>,
}

impl InBagMask {
    /// Builds the mask from per-replicate in-bag index lists.
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::oob::InBagMask;
    ///
    /// let mask = InBagMask::from_indices(&[vec![0, 0, 2], vec![1, 1, 1]], 3).unwrap();
    /// assert!(mask.is_in_bag(0, 0));
    /// assert!(!mask.is_in_bag(1, 0));
    /// assert_eq!(mask.oob_count(1), 1);
    /// assert_eq!(mask.oob_replicates(2).collect::<Vec<_>>(), vec![1]);
    /// ```
    pub fn from_indices(in_bag: &[Vec<usize>], n_subjects: usize) -> Result<Self, AggregateError> {
        let rows = in_bag
            .iter()
            .enumerate()
            .map(|(replicate, indices)| {
                let mut row = vec![false; n_subjects];
                for (position, &index) in indices.iter().enumerate() {
                    let slot = row
                        .get_mut(index)
                        .ok_or(AggregateError::InBagIndexOutOfRange {
                            replicate,
                            position,
                            index,
                            n_subjects,
                        })?;
                    *slot = true;
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { n_subjects, rows })
    }

    #[must_use]
    pub fn n_subjects(&self) -> usize {
        self.n_subjects
    }

    #[must_use]
    pub fn n_replicates(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if `subject` was drawn at least once into `replicate`.
    ///
    /// # Panics
    ///
    /// Panics if `subject` or `replicate` is out of range.
    #[must_use]
    pub fn is_in_bag(&self, subject: usize, replicate: usize) -> bool {
        self.rows[replicate][subject]
    }

    /// Number of distinct subjects drawn into `replicate`.
    #[must_use]
    pub fn in_bag_count(&self, replicate: usize) -> usize {
        self.rows[replicate].iter().filter(|&&in_bag| in_bag).count()
    }

    /// Number of replicates in which `subject` is out-of-bag.
    #[must_use]
    pub fn oob_count(&self, subject: usize) -> usize {
        self.rows.iter().filter(|row| !row[subject]).count()
    }

    /// Replicates in which `subject` is out-of-bag, in ascending order.
    pub fn oob_replicates(&self, subject: usize) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(_, row)| !row[subject])
            .map(|(replicate, _)| replicate)
    }
}

/// Aggregated result for one subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectScore {
    /// Index of the subject in the cohort
    pub subject: usize,
    /// OOB-averaged prediction, `None` if the subject was excluded
    pub score: Option<f64>,
    /// Number of replicates the score was averaged over
    pub oob_count: usize,
    /// Risk group, `None` if the subject was excluded
    pub group: Option<RiskGroup>,
}

impl SubjectScore {
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.score.is_none()
    }
}

/// Per-subject scores and groups of a whole cohort
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One entry per subject, in cohort order
    pub subjects: Vec<SubjectScore>,
    /// Median split over all scored subjects
    pub stratification: Stratification,
}

impl Aggregation {
    #[must_use]
    pub fn n_subjects(&self) -> usize {
        self.subjects.len()
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.stratification.median
    }

    #[must_use]
    pub fn score(&self, subject: usize) -> Option<f64> {
        self.subjects.get(subject)?.score
    }

    #[must_use]
    pub fn group(&self, subject: usize) -> Option<RiskGroup> {
        self.subjects.get(subject)?.group
    }

    /// Iterates over `(subject, score, group)` of every scored subject.
    pub fn scored(&self) -> impl Iterator<Item = (usize, f64, RiskGroup)> + '_ {
        self.subjects
            .iter()
            .filter_map(|s| Some((s.subject, s.score?, s.group?)))
    }

    /// Subjects left without score because they were never out-of-bag
    pub fn excluded(&self) -> impl Iterator<Item = usize> + '_ {
        self.subjects
            .iter()
            .filter(|s| s.is_excluded())
            .map(|s| s.subject)
    }

    /// Subjects of `group`, in cohort order
    pub fn members(&self, group: RiskGroup) -> impl Iterator<Item = usize> + '_ {
        self.scored()
            .filter(move |(_, _, g)| *g == group)
            .map(|(subject, _, _)| subject)
    }
}

/// Computes OOB scores and risk groups, rejecting subjects without OOB predictions.
///
/// This is [`OobAggregator::aggregate`] with the default configuration.
pub fn aggregate(
    outcomes: &[Outcome],
    predictions: &[Vec<f64>],
    in_bag: &[Vec<usize>],
) -> Result<Aggregation, AggregateError> {
    OobAggregator::default().aggregate(outcomes, predictions, in_bag)
}

#[derive(Default, Debug, Clone)]
pub struct OobAggregator {
    config: AggregatorConfig,
}

impl OobAggregator {
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Computes OOB scores and risk groups.
    ///
    /// Only the number of outcomes is used here; the outcomes themselves are
    /// consumed by the survival analysis of each group.
    #[expect(clippy::cast_precision_loss)]
    pub fn aggregate(
        &self,
        outcomes: &[Outcome],
        predictions: &[Vec<f64>],
        in_bag: &[Vec<usize>],
    ) -> Result<Aggregation, AggregateError> {
        let n_subjects = outcomes.len();
        validate_shapes(n_subjects, predictions, in_bag)?;
        if n_subjects == 0 {
            return Err(AggregateError::EmptyCohort);
        }

        let mask = InBagMask::from_indices(in_bag, n_subjects)?;
        let n_replicates = mask.n_replicates();
        log::debug!("Built in-bag mask: {n_subjects} subjects x {n_replicates} replicates");

        // Running mean keeps a constant prediction exact
        let mut means = vec![0.0; n_subjects];
        let mut counts = vec![0_usize; n_subjects];
        for (replicate, row) in predictions.iter().enumerate() {
            log::trace!(
                "Replicate {replicate}: {} distinct in-bag subjects",
                mask.in_bag_count(replicate)
            );
            for (subject, &value) in row.iter().enumerate() {
                if mask.is_in_bag(subject, replicate) {
                    continue;
                }
                if !value.is_finite() {
                    return Err(AggregateError::NonFinitePrediction {
                        replicate,
                        subject,
                        value,
                    });
                }
                counts[subject] += 1;
                means[subject] += (value - means[subject]) / counts[subject] as f64;
            }
        }

        let mut subjects = Vec::with_capacity(n_subjects);
        for (subject, (mean, oob_count)) in means.into_iter().zip(counts).enumerate() {
            let score = if oob_count > 0 {
                Some(mean)
            } else {
                match self.config.on_insufficient {
                    InsufficientPolicy::Reject => {
                        return Err(AggregateError::DataInsufficiency {
                            subject,
                            n_replicates,
                        });
                    }
                    InsufficientPolicy::Exclude => {
                        log::warn!(
                            "Subject {subject} is in-bag in all {n_replicates} replicates; excluded"
                        );
                        None
                    }
                }
            };
            log::trace!("Subject {subject}: score={score:?}, oob_count={oob_count}");
            subjects.push(SubjectScore {
                subject,
                score,
                oob_count,
                group: None,
            });
        }

        let scores = subjects.iter().filter_map(|s| s.score).collect::<Vec<_>>();
        let stratification =
            Stratification::from_scores(&scores).ok_or(AggregateError::EmptyCohort)?;
        for subject in &mut subjects {
            subject.group = subject.score.map(|score| stratification.classify(score));
        }

        if stratification.is_degenerate() {
            log::warn!(
                "Degenerate median split: median={}, {} distinct scores, {} low / {} high",
                stratification.median,
                stratification.distinct_scores,
                stratification.low_count,
                stratification.high_count
            );
        }
        log::debug!(
            "Aggregated {} subjects: median={}, {} low / {} high",
            scores.len(),
            stratification.median,
            stratification.low_count,
            stratification.high_count
        );

        Ok(Aggregation {
            subjects,
            stratification,
        })
    }
}

fn validate_shapes(
    n_subjects: usize,
    predictions: &[Vec<f64>],
    in_bag: &[Vec<usize>],
) -> Result<(), AggregateError> {
    if predictions.len() != in_bag.len() {
        return Err(AggregateError::ReplicateCountMismatch {
            predictions: predictions.len(),
            in_bag: in_bag.len(),
        });
    }
    for (replicate, (row, indices)) in predictions.iter().zip(in_bag).enumerate() {
        if row.len() != n_subjects {
            return Err(AggregateError::PredictionLengthMismatch {
                replicate,
                expected: n_subjects,
                found: row.len(),
            });
        }
        if indices.len() != n_subjects {
            return Err(AggregateError::InBagLengthMismatch {
                replicate,
                expected: n_subjects,
                found: indices.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn outcomes(n: usize) -> Vec<Outcome> {
        (0..n)
            .map(|i| Outcome {
                event: i % 2 == 0,
                time: 1.0 + i as f64,
            })
            .collect()
    }

    fn random_bootstrap(
        rng: &mut Pcg64Mcg,
        n_subjects: usize,
        n_replicates: usize,
    ) -> (Vec<Vec<f64>>, Vec<Vec<usize>>) {
        let predictions = (0..n_replicates)
            .map(|_| {
                (0..n_subjects)
                    .map(|_| rng.random_range(-3.0..3.0))
                    .collect()
            })
            .collect();
        let in_bag = (0..n_replicates)
            .map(|_| {
                (0..n_subjects)
                    .map(|_| rng.random_range(0..n_subjects))
                    .collect()
            })
            .collect();
        (predictions, in_bag)
    }

    #[test]
    fn test_oob_sets_from_worked_example() {
        let in_bag = vec![vec![0, 0, 1, 3], vec![1, 2, 2, 3], vec![0, 1, 2, 2]];
        let predictions = vec![
            vec![0.11, 0.12, 0.13, 0.14],
            vec![0.21, 0.22, 0.23, 0.24],
            vec![0.31, 0.32, 0.33, 0.34],
        ];

        let mask = InBagMask::from_indices(&in_bag, 4).unwrap();
        assert_eq!(mask.oob_replicates(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(mask.oob_replicates(3).collect::<Vec<_>>(), vec![2]);

        // Subject 1 is in-bag in every replicate
        let aggregator = OobAggregator::new(AggregatorConfig {
            on_insufficient: InsufficientPolicy::Exclude,
        });
        let aggregation = aggregator
            .aggregate(&outcomes(4), &predictions, &in_bag)
            .unwrap();
        assert_eq!(aggregation.excluded().collect::<Vec<_>>(), vec![1]);
        assert_eq!(aggregation.score(0), Some(predictions[1][0]));
        assert_eq!(aggregation.score(3), Some(predictions[2][3]));
        assert_eq!(aggregation.subjects[0].oob_count, 1);
        assert_eq!(aggregation.subjects[1].oob_count, 0);
        assert_eq!(aggregation.subjects[3].oob_count, 1);
    }

    #[test]
    fn test_subject_in_bag_everywhere_is_rejected() {
        // Subject 1 is in-bag in every replicate of the worked example
        let in_bag = vec![vec![0, 0, 1, 3], vec![1, 2, 2, 3], vec![0, 1, 2, 2]];
        let predictions = vec![vec![0.5; 4]; 3];
        let error = aggregate(&outcomes(4), &predictions, &in_bag).unwrap_err();
        assert_eq!(
            error,
            AggregateError::DataInsufficiency {
                subject: 1,
                n_replicates: 3
            }
        );
    }

    #[test]
    fn test_subject_in_bag_everywhere_is_excluded() {
        let in_bag = vec![vec![0, 0, 1, 3], vec![1, 2, 2, 3], vec![0, 1, 2, 2]];
        let predictions = vec![
            vec![1.0, 9.0, 1.0, 1.0],
            vec![2.0, 9.0, 1.0, 2.0],
            vec![3.0, 9.0, 1.0, 3.0],
        ];
        let aggregator = OobAggregator::new(AggregatorConfig {
            on_insufficient: InsufficientPolicy::Exclude,
        });
        let aggregation = aggregator
            .aggregate(&outcomes(4), &predictions, &in_bag)
            .unwrap();

        assert_eq!(aggregation.excluded().collect::<Vec<_>>(), vec![1]);
        assert_eq!(aggregation.score(1), None);
        assert_eq!(aggregation.group(1), None);
        assert!(
            aggregation
                .scored()
                .all(|(_, score, _)| score.is_finite())
        );
        // Scores 2.0 (subject 0), 1.0 (subject 2), 3.0 (subject 3)
        assert_eq!(aggregation.median(), 2.0);
        assert_eq!(aggregation.group(0), Some(RiskGroup::Low));
        assert_eq!(aggregation.group(3), Some(RiskGroup::High));
    }

    #[test]
    fn test_replicate_count_mismatch() {
        let predictions = vec![vec![0.0; 2]; 3];
        let in_bag = vec![vec![0, 1]; 2];
        let error = aggregate(&outcomes(2), &predictions, &in_bag).unwrap_err();
        assert_eq!(
            error,
            AggregateError::ReplicateCountMismatch {
                predictions: 3,
                in_bag: 2
            }
        );
        assert!(error.is_shape_mismatch());
    }

    #[test]
    fn test_shape_checked_before_nan_predictions() {
        // A NaN would fail accumulation; the shape error must win
        let predictions = vec![vec![f64::NAN; 2]; 3];
        let in_bag = vec![vec![0, 0]; 2];
        let error = aggregate(&outcomes(2), &predictions, &in_bag).unwrap_err();
        assert!(error.is_shape_mismatch());
    }

    #[test]
    fn test_inner_length_mismatch() {
        let error = aggregate(&outcomes(3), &[vec![0.0; 2]], &[vec![0, 1, 2]]).unwrap_err();
        assert_eq!(
            error,
            AggregateError::PredictionLengthMismatch {
                replicate: 0,
                expected: 3,
                found: 2
            }
        );

        let error = aggregate(&outcomes(3), &[vec![0.0; 3]], &[vec![0, 1]]).unwrap_err();
        assert_eq!(
            error,
            AggregateError::InBagLengthMismatch {
                replicate: 0,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let error = aggregate(&outcomes(2), &[vec![0.0; 2]], &[vec![0, 2]]).unwrap_err();
        assert_eq!(
            error,
            AggregateError::InBagIndexOutOfRange {
                replicate: 0,
                position: 1,
                index: 2,
                n_subjects: 2
            }
        );
        assert!(error.is_shape_mismatch());
    }

    #[test]
    fn test_non_finite_oob_prediction() {
        let predictions = vec![vec![1.0, f64::INFINITY]];
        let error = aggregate(&outcomes(2), &predictions, &[vec![0, 0]]).unwrap_err();
        assert!(matches!(
            error,
            AggregateError::NonFinitePrediction {
                replicate: 0,
                subject: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_non_finite_in_bag_prediction_is_ignored() {
        let predictions = vec![vec![f64::NAN, 0.5], vec![0.25, 0.5]];
        let in_bag = vec![vec![0, 0], vec![1, 1]];
        let aggregation = aggregate(&outcomes(2), &predictions, &in_bag).unwrap();
        assert_eq!(aggregation.score(0), Some(0.25));
        assert_eq!(aggregation.score(1), Some(0.5));
    }

    #[test]
    fn test_empty_cohort() {
        assert_eq!(
            aggregate(&[], &[], &[]).unwrap_err(),
            AggregateError::EmptyCohort
        );
    }

    #[test]
    fn test_all_excluded_is_empty_cohort() {
        let aggregator = OobAggregator::new(AggregatorConfig {
            on_insufficient: InsufficientPolicy::Exclude,
        });
        let error = aggregator
            .aggregate(&outcomes(1), &[vec![0.3]], &[vec![0]])
            .unwrap_err();
        assert_eq!(error, AggregateError::EmptyCohort);
    }

    #[test]
    fn test_constant_predictions_are_exact() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let (_, in_bag) = random_bootstrap(&mut rng, 20, 60);
        let predictions = (0..60)
            .map(|_| (0..20_u32).map(|i| 0.1 * f64::from(i)).collect())
            .collect::<Vec<Vec<f64>>>();
        let aggregation = aggregate(&outcomes(20), &predictions, &in_bag).unwrap();
        for (subject, score, _) in aggregation.scored() {
            assert_eq!(score, predictions[0][subject]);
        }
    }

    #[test]
    fn test_score_is_mean_over_oob_replicates() {
        let mut rng = Pcg64Mcg::seed_from_u64(42);
        let (predictions, in_bag) = random_bootstrap(&mut rng, 30, 80);
        let mask = InBagMask::from_indices(&in_bag, 30).unwrap();
        let aggregation = aggregate(&outcomes(30), &predictions, &in_bag).unwrap();

        for subject in &aggregation.subjects {
            let oob = mask.oob_replicates(subject.subject).collect::<Vec<_>>();
            assert_eq!(subject.oob_count, oob.len());
            let expected = oob
                .iter()
                .map(|&b| predictions[b][subject.subject])
                .sum::<f64>()
                / oob.len() as f64;
            assert_relative_eq!(subject.score.unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_group_follows_median() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let (predictions, in_bag) = random_bootstrap(&mut rng, 41, 100);
        let aggregation = aggregate(&outcomes(41), &predictions, &in_bag).unwrap();
        let median = aggregation.median();

        for (_, score, group) in aggregation.scored() {
            assert_eq!(group.is_high(), score > median);
        }
        assert_eq!(aggregation.members(RiskGroup::Low).count(), 21);
        assert_eq!(aggregation.members(RiskGroup::High).count(), 20);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let (predictions, in_bag) = random_bootstrap(&mut rng, 25, 50);
        let first = aggregate(&outcomes(25), &predictions, &in_bag).unwrap();
        let second = aggregate(&outcomes(25), &predictions, &in_bag).unwrap();

        assert_eq!(first, second);
        for (a, b) in first.subjects.iter().zip(&second.subjects) {
            assert_eq!(a.score.map(f64::to_bits), b.score.map(f64::to_bits));
        }
    }

    #[test]
    fn test_degenerate_split_is_reported() {
        let predictions = vec![vec![0.4; 3], vec![0.4; 3]];
        let in_bag = vec![vec![0, 0, 0], vec![1, 1, 2]];
        let aggregation = aggregate(&outcomes(3), &predictions, &in_bag).unwrap();
        assert!(aggregation.stratification.is_degenerate());
        assert_eq!(aggregation.stratification.distinct_scores, 1);
        assert_eq!(aggregation.members(RiskGroup::High).count(), 0);
    }
}
