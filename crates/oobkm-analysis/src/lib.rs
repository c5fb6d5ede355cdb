//! Out-of-bag risk aggregation and survival stratification
//!
//! This crate turns the raw outputs of a bootstrap validation run into one
//! held-out risk score per subject, splits the cohort into low and high risk
//! groups, and summarizes the survival of each group.
//!
//! # Overview
//!
//! 1. **Load Bootstrap Outputs** ([`cohort::BootstrapOutputs`]): outcomes, per-replicate
//!    predictions and per-replicate in-bag indices
//! 2. **Aggregate** ([`oob::OobAggregator`]): average each subject's predictions over
//!    the replicates that did not train on it
//! 3. **Stratify** ([`risk_group::Stratification`]): split at the median score
//! 4. **Survival Analysis** ([`survival::SurvivalStatsMap`]): Kaplan-Meier curve per group
//!
//! # Examples
//!
//! ```
//! use oobkm_analysis::{
//!     cohort::BootstrapOutputs,
//!     oob::AggregatorConfig,
//!     risk_group::RiskGroup,
//!     survival::SurvivalStatsMap,
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! // Outcomes, predictions and in-bag indices in fixed order
//! let outputs: BootstrapOutputs = serde_json::from_str(
//!     "[[[1, 4.0], [0, 8.0], [1, 2.0], [1, 6.0]],
//!       [[0.2, 0.1, 0.9, 0.4], [0.3, 0.2, 0.8, 0.5]],
//!       [[0, 0, 2, 2], [1, 1, 3, 3]]]",
//! )?;
//!
//! let aggregation = outputs.aggregate(&AggregatorConfig::default())?;
//! assert_eq!(aggregation.score(0), Some(0.3));
//! assert_eq!(aggregation.score(3), Some(0.4));
//! assert_eq!(aggregation.group(1), Some(RiskGroup::Low));
//! assert_eq!(aggregation.group(2), Some(RiskGroup::High));
//! for subject in &aggregation.subjects {
//!     println!(
//!         "subject {}: score={:?} over {} replicates",
//!         subject.subject, subject.score, subject.oob_count
//!     );
//! }
//!
//! let stats = SurvivalStatsMap::from_aggregation(&outputs.outcomes, &aggregation);
//! for group in RiskGroup::ALL {
//!     if let Some(median) = stats.map.get(&group).and_then(|s| s.median_km) {
//!         println!("{group}: KM median survival = {median:.1}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cohort;
pub mod oob;
pub mod risk_group;
pub mod survival;
