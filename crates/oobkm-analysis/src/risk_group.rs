//! Median-split risk stratification
//!
//! Subjects are split into two groups by comparing their aggregated score
//! with the cohort median:
//!
//! - **Low**: `score <= median`
//! - **High**: `score > median`
//!
//! A split is degenerate when one of the groups ends up empty. This always
//! happens when all scores are equal, and also when more than half of the
//! cohort shares the maximum score.

use std::fmt;

use oobkm_stats::descriptive;
use serde::{Deserialize, Serialize};

/// Binary risk group label
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskGroup {
    Low,
    High,
}

impl fmt::Display for RiskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.label(), f)
    }
}

impl RiskGroup {
    pub const ALL: [Self; 2] = [Self::Low, Self::High];

    /// Classifies a score against the cohort median.
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::risk_group::RiskGroup;
    ///
    /// assert_eq!(RiskGroup::classify(0.5, 0.5), RiskGroup::Low);
    /// assert_eq!(RiskGroup::classify(0.51, 0.5), RiskGroup::High);
    /// ```
    #[must_use]
    pub fn classify(score: f64, median: f64) -> Self {
        if score > median {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Short machine-readable name
    #[must_use]
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }

    /// Legend label used in survival plots
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::High => "High Risk",
        }
    }
}

/// Result of splitting a set of scores at their median
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratification {
    /// Median of the scores (average of the two middle values for even counts)
    pub median: f64,
    /// Number of scores at or below the median
    pub low_count: usize,
    /// Number of scores above the median
    pub high_count: usize,
    /// Number of distinct scores
    pub distinct_scores: usize,
}

impl Stratification {
    /// Computes the median split of `scores`.
    ///
    /// Returns `None` if `scores` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::risk_group::{RiskGroup, Stratification};
    ///
    /// let split = Stratification::from_scores(&[0.1, 0.9, 0.4, 0.6]).unwrap();
    /// assert_eq!(split.median, 0.5);
    /// assert_eq!(split.classify(0.4), RiskGroup::Low);
    /// assert_eq!(split.count(RiskGroup::High), 2);
    /// assert!(!split.is_degenerate());
    /// ```
    #[must_use]
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = descriptive::median(&sorted)?;
        let high_count = sorted.iter().filter(|&&s| s > median).count();

        Some(Self {
            median,
            low_count: sorted.len() - high_count,
            high_count,
            distinct_scores: descriptive::count_distinct(&sorted),
        })
    }

    #[must_use]
    pub fn classify(&self, score: f64) -> RiskGroup {
        RiskGroup::classify(score, self.median)
    }

    #[must_use]
    pub fn count(&self, group: RiskGroup) -> usize {
        match group {
            RiskGroup::Low => self.low_count,
            RiskGroup::High => self.high_count,
        }
    }

    /// Returns `true` if the split leaves one of the groups empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use oobkm_analysis::risk_group::Stratification;
    ///
    /// let split = Stratification::from_scores(&[0.2, 0.2, 0.2]).unwrap();
    /// assert!(split.is_degenerate());
    /// assert_eq!(split.distinct_scores, 1);
    /// ```
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.low_count == 0 || self.high_count == 0
    }
}
