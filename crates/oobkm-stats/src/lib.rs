//! Statistical utilities for out-of-bag risk stratification.
//!
//! This crate provides the generic statistics the analysis layer builds on:
//!
//! - **Descriptive statistics**: min, max, mean, median, variance, standard deviation
//! - **Survival analysis**: Kaplan-Meier estimator for time-to-event data with censoring
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics and the standard median
//! - [`survival`]: Kaplan-Meier survival curves for analyzing time-to-event data
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use oobkm_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 2.5);
//! assert_eq!(stats.median, 2.5);
//! ```
//!
//! ## Analyzing survival data
//!
//! ```
//! use oobkm_stats::survival::KaplanMeierCurve;
//!
//! // Data: (time, is_censored)
//! let data = vec![
//!     (1.5, false), // Event occurred at time 1.5
//!     (2.0, true),  // Censored at time 2.0
//!     (3.25, false), // Event occurred at time 3.25
//! ];
//! let curve = KaplanMeierCurve::from_data(data);
//! assert_eq!(curve.survival_at(1.0), 1.0);
//! ```

pub mod descriptive;
pub mod survival;
