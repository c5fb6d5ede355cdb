use chrono::{DateTime, Utc};
use oobkm_analysis::{
    cohort::BootstrapOutputs,
    oob::{AggregatorConfig, Aggregation},
    risk_group::RiskGroup,
};
use serde::{Deserialize, Serialize};

/// Out-of-bag scores and risk groups of a cohort, as written by `aggregate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Timestamp when the report was created (ISO 8601 format)
    pub generated_at: DateTime<Utc>,
    pub n_subjects: usize,
    pub n_replicates: usize,
    /// Policy applied to subjects that were never out-of-bag
    pub on_insufficient: String,
    /// Median of the aggregated scores
    pub median: f64,
    pub low_count: usize,
    pub high_count: usize,
    pub distinct_scores: usize,
    /// Whether the median split left one group empty
    pub degenerate: bool,
    /// Subjects left without score
    pub excluded: Vec<usize>,
    pub subjects: Vec<SubjectRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject: usize,
    pub score: Option<f64>,
    /// Number of replicates the score was averaged over
    pub oob_count: usize,
    pub group: Option<RiskGroup>,
    pub event: bool,
    pub time: f64,
}

impl AggregationReport {
    pub fn new(
        outputs: &BootstrapOutputs,
        config: &AggregatorConfig,
        aggregation: &Aggregation,
    ) -> Self {
        let split = &aggregation.stratification;
        let subjects = aggregation
            .subjects
            .iter()
            .zip(&outputs.outcomes)
            .map(|(s, outcome)| SubjectRecord {
                subject: s.subject,
                score: s.score,
                oob_count: s.oob_count,
                group: s.group,
                event: outcome.event,
                time: outcome.time,
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            n_subjects: outputs.n_subjects(),
            n_replicates: outputs.n_replicates(),
            on_insufficient: config.on_insufficient.to_string().to_lowercase(),
            median: split.median,
            low_count: split.low_count,
            high_count: split.high_count,
            distinct_scores: split.distinct_scores,
            degenerate: split.is_degenerate(),
            excluded: aggregation.excluded().collect(),
            subjects,
        }
    }
}

#[cfg(test)]
mod tests {
    use oobkm_analysis::oob::InsufficientPolicy;

    use super::*;

    #[test]
    fn test_report_from_aggregation() {
        let outputs: BootstrapOutputs = serde_json::from_str(
            r#"{
                "outcomes": [[1, 4.0], [0, 8.0], [1, 2.0]],
                "predictions": [[0.2, 0.1, 0.9], [0.3, 0.2, 0.8]],
                "in_bag": [[0, 0, 0], [0, 2, 2]]
            }"#,
        )
        .unwrap();
        let config = AggregatorConfig {
            on_insufficient: InsufficientPolicy::Exclude,
        };
        let aggregation = outputs.aggregate(&config).unwrap();
        let report = AggregationReport::new(&outputs, &config, &aggregation);

        assert_eq!(report.on_insufficient, "exclude");
        assert_eq!(report.excluded, vec![0]);
        assert_eq!(report.n_replicates, 2);
        assert_eq!(report.subjects[0].score, None);
        assert_eq!(report.subjects[2].score, Some(0.9));
        assert_eq!(report.subjects[1].oob_count, 2);
        assert_eq!(report.subjects[2].group, Some(RiskGroup::High));
        assert!(!report.subjects[1].event);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["subjects"][1]["group"], "low");
        assert!(json["subjects"][0]["score"].is_null());
    }
}
