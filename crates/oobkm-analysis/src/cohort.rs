//! Cohort data handed over by a bootstrap validation run
//!
//! A bootstrap validation run produces three arrays:
//!
//! - **Outcomes**: one `(event_flag, time)` pair per subject
//! - **Predictions**: for every replicate, the predicted risk of every subject
//! - **In-bag indices**: for every replicate, the subject indices drawn into
//!   the bootstrap sample (with repetition)
//!
//! # Serialization
//!
//! [`BootstrapOutputs`] deserializes from a JSON object:
//!
//! ```json
//! {
//!   "outcomes": [[1, 12.5], [0, 30.0]],
//!   "predictions": [[0.4, -1.2], [0.3, -0.8]],
//!   "in_bag": [[0, 0], [1, 0]]
//! }
//! ```
//!
//! or from a JSON array holding the same three fields in that fixed order:
//!
//! ```json
//! [[[1, 12.5], [0, 30.0]], [[0.4, -1.2], [0.3, -0.8]], [[0, 0], [1, 0]]]
//! ```

use serde::{Deserialize, Serialize};

use crate::oob::{AggregateError, Aggregation, AggregatorConfig, OobAggregator};

/// Observed survival outcome of a single subject.
///
/// Serialized as the pair `[event_flag, time]` where `event_flag` is `1` if the
/// event was observed and `0` if the observation was censored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Outcome {
    /// Whether the event was observed (`false` means right-censored)
    pub event: bool,
    /// Time of the event or of censoring
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InvalidOutcomeError {
    #[display("event flag must be 0 or 1, got {flag}")]
    EventFlag { flag: f64 },
    #[display("survival time must be finite and non-negative, got {time}")]
    Time { time: f64 },
}

impl Outcome {
    /// Creates an outcome, validating the time.
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::cohort::Outcome;
    ///
    /// let outcome = Outcome::new(true, 14.0).unwrap();
    /// assert!(!outcome.is_censored());
    /// assert!(Outcome::new(false, -1.0).is_err());
    /// ```
    pub fn new(event: bool, time: f64) -> Result<Self, InvalidOutcomeError> {
        if !time.is_finite() || time < 0.0 {
            return Err(InvalidOutcomeError::Time { time });
        }
        Ok(Self { event, time })
    }

    #[must_use]
    pub fn is_censored(&self) -> bool {
        !self.event
    }

    /// Returns the `(time, is_censored)` pair consumed by the Kaplan-Meier estimator.
    #[must_use]
    pub fn to_survival_datum(self) -> (f64, bool) {
        (self.time, self.is_censored())
    }
}

impl TryFrom<(f64, f64)> for Outcome {
    type Error = InvalidOutcomeError;

    fn try_from((flag, time): (f64, f64)) -> Result<Self, Self::Error> {
        let event = if flag == 1.0 {
            true
        } else if flag == 0.0 {
            false
        } else {
            return Err(InvalidOutcomeError::EventFlag { flag });
        };
        Self::new(event, time)
    }
}

impl From<Outcome> for (f64, f64) {
    fn from(outcome: Outcome) -> Self {
        (if outcome.event { 1.0 } else { 0.0 }, outcome.time)
    }
}

/// Raw outputs of a bootstrap validation run.
///
/// `predictions[b][i]` is the risk predicted for subject `i` by the model
/// trained on replicate `b`, and `in_bag[b]` lists the subjects drawn into
/// replicate `b`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BootstrapOutputs {
    /// Observed outcome per subject
    pub outcomes: Vec<Outcome>,
    /// Predicted risk per replicate and subject
    pub predictions: Vec<Vec<f64>>,
    /// In-bag subject indices per replicate
    pub in_bag: Vec<Vec<usize>>,
}

impl BootstrapOutputs {
    /// Number of subjects in the cohort
    #[must_use]
    pub fn n_subjects(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of bootstrap replicates, as seen by the predictions
    #[must_use]
    pub fn n_replicates(&self) -> usize {
        self.predictions.len()
    }

    /// Number of subjects whose event was observed
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.event).count()
    }

    /// Runs the out-of-bag aggregation over these outputs.
    pub fn aggregate(&self, config: &AggregatorConfig) -> Result<Aggregation, AggregateError> {
        OobAggregator::new(config.clone()).aggregate(
            &self.outcomes,
            &self.predictions,
            &self.in_bag,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_pair() {
        let outcome: Outcome = serde_json::from_str("[1, 12.5]").unwrap();
        assert_eq!(
            outcome,
            Outcome {
                event: true,
                time: 12.5
            }
        );

        let outcome: Outcome = serde_json::from_str("[0.0, 3]").unwrap();
        assert!(outcome.is_censored());
        assert_eq!(outcome.to_survival_datum(), (3.0, true));
    }

    #[test]
    fn test_outcome_rejects_invalid_values() {
        assert!(serde_json::from_str::<Outcome>("[2, 12.5]").is_err());
        assert!(serde_json::from_str::<Outcome>("[1, -0.5]").is_err());
        assert_eq!(
            Outcome::try_from((0.5, 1.0)),
            Err(InvalidOutcomeError::EventFlag { flag: 0.5 })
        );
        assert_eq!(
            Outcome::new(true, f64::INFINITY),
            Err(InvalidOutcomeError::Time {
                time: f64::INFINITY
            })
        );
    }

    #[test]
    fn test_outcome_serializes_as_pair() {
        let outcome = Outcome::new(false, 7.0).unwrap();
        assert_eq!(serde_json::to_string(&outcome).unwrap(), "[0.0,7.0]");
    }

    #[test]
    fn test_bootstrap_outputs_from_object() {
        let json = r#"{
            "outcomes": [[1, 12.5], [0, 30.0]],
            "predictions": [[0.4, -1.2], [0.3, -0.8]],
            "in_bag": [[0, 0], [1, 0]]
        }"#;
        let outputs: BootstrapOutputs = serde_json::from_str(json).unwrap();
        assert_eq!(outputs.n_subjects(), 2);
        assert_eq!(outputs.n_replicates(), 2);
        assert_eq!(outputs.event_count(), 1);
        assert_eq!(outputs.in_bag[1], vec![1, 0]);
    }

    #[test]
    fn test_bootstrap_outputs_from_fixed_order_array() {
        let json = "[[[1, 12.5], [0, 30.0]], [[0.4, -1.2], [0.3, -0.8]], [[0, 0], [1, 0]]]";
        let outputs: BootstrapOutputs = serde_json::from_str(json).unwrap();
        assert_eq!(outputs.outcomes[1].time, 30.0);
        assert_eq!(outputs.predictions[0], vec![0.4, -1.2]);
    }

    #[test]
    fn test_bootstrap_outputs_aggregate() {
        let outputs = BootstrapOutputs {
            outcomes: vec![
                Outcome::new(true, 1.0).unwrap(),
                Outcome::new(false, 2.0).unwrap(),
            ],
            predictions: vec![vec![0.4, -1.2], vec![0.3, -0.8]],
            in_bag: vec![vec![0, 0], vec![1, 1]],
        };
        let aggregation = outputs.aggregate(&AggregatorConfig::default()).unwrap();
        assert_eq!(aggregation.score(0), Some(0.3));
        assert_eq!(aggregation.score(1), Some(-1.2));
    }
}
