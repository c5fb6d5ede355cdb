//! CSV export of stratification results
//!
//! Writes the per-group Kaplan-Meier step functions and the per-subject
//! score table so that curves can be drawn with any plotting tool.

use std::{fmt::Write as _, fs, path::Path};

use anyhow::Context;
use oobkm_analysis::{
    cohort::BootstrapOutputs, oob::Aggregation, risk_group::RiskGroup,
    survival::SurvivalStatsMap,
};

const KM_CURVES_FILE: &str = "risk_groups_km.csv";
const SUBJECTS_FILE: &str = "subjects.csv";

/// Save KM step points of every risk group to `risk_groups_km.csv`
pub(super) fn save_km_curves(
    dir: &Path,
    group_stats: &SurvivalStatsMap<RiskGroup>,
) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let csv_path = dir.join(KM_CURVES_FILE);
    let csv_content = render_km_curves(group_stats)?;

    fs::write(&csv_path, csv_content)
        .with_context(|| format!("Failed to write CSV file: {}", csv_path.display()))?;
    println!("  KM curves saved to: {}", csv_path.display());

    Ok(())
}

/// Save per-subject scores, groups and outcomes to `subjects.csv`
pub(super) fn save_subjects(
    dir: &Path,
    outputs: &BootstrapOutputs,
    aggregation: &Aggregation,
) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let csv_path = dir.join(SUBJECTS_FILE);
    let csv_content = render_subjects(outputs, aggregation)?;

    fs::write(&csv_path, csv_content)
        .with_context(|| format!("Failed to write CSV file: {}", csv_path.display()))?;
    println!("  Subject scores saved to: {}", csv_path.display());

    Ok(())
}

fn render_km_curves(group_stats: &SurvivalStatsMap<RiskGroup>) -> anyhow::Result<String> {
    let mut csv_content = String::from("group,time,survival_prob,at_risk,events\n");

    for (group, stats) in &group_stats.map {
        for point in stats.km_curve.step_points() {
            writeln!(
                &mut csv_content,
                "{},{},{},{},{}",
                group.to_str(),
                point.time,
                point.survival_prob,
                point.at_risk,
                point.events
            )
            .with_context(|| format!("Failed to write CSV data for group {group}"))?;
        }
    }

    Ok(csv_content)
}

fn render_subjects(
    outputs: &BootstrapOutputs,
    aggregation: &Aggregation,
) -> anyhow::Result<String> {
    let mut csv_content = String::from("subject,score,oob_count,group,event,time\n");

    for (subject, outcome) in aggregation.subjects.iter().zip(&outputs.outcomes) {
        let score = subject.score.map_or(String::new(), |s| s.to_string());
        let group = subject.group.map_or("", RiskGroup::to_str);
        writeln!(
            &mut csv_content,
            "{},{},{},{},{},{}",
            subject.subject,
            score,
            subject.oob_count,
            group,
            u8::from(outcome.event),
            outcome.time
        )
        .with_context(|| format!("Failed to write CSV data for subject {}", subject.subject))?;
    }

    Ok(csv_content)
}

#[cfg(test)]
mod tests {
    use oobkm_analysis::oob::{AggregatorConfig, InsufficientPolicy};

    use super::*;

    fn sample_outputs() -> BootstrapOutputs {
        serde_json::from_str(
            r#"{
                "outcomes": [[1, 4.0], [0, 8.0], [1, 2.0], [1, 1.5]],
                "predictions": [[0.2, 0.1, 0.9, 0.4], [0.2, 0.1, 0.9, 0.4]],
                "in_bag": [[0, 0, 0, 0], [0, 1, 2, 3]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_render_subjects_marks_excluded() {
        let outputs = sample_outputs();
        let aggregation = outputs
            .aggregate(&AggregatorConfig {
                on_insufficient: InsufficientPolicy::Exclude,
            })
            .unwrap();
        let csv = render_subjects(&outputs, &aggregation).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "subject,score,oob_count,group,event,time");
        assert_eq!(lines[1], "0,,0,,1,4");
        assert_eq!(lines[2], "1,0.1,1,low,0,8");
        assert_eq!(lines[3], "2,0.9,1,high,1,2");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_render_km_curves() {
        let outputs = sample_outputs();
        let aggregation = outputs
            .aggregate(&AggregatorConfig {
                on_insufficient: InsufficientPolicy::Exclude,
            })
            .unwrap();
        let group_stats = SurvivalStatsMap::from_aggregation(&outputs.outcomes, &aggregation);
        let csv = render_km_curves(&group_stats).unwrap();
        let lines = csv.lines().collect::<Vec<_>>();

        // Low: subjects 1 (censored at 8) and 3 (event at 1.5); High: subject 2 (event at 2)
        assert_eq!(
            lines,
            vec![
                "group,time,survival_prob,at_risk,events",
                "low,0,1,2,0",
                "low,1.5,0.5,2,1",
                "high,0,1,1,0",
                "high,2,0,1,1",
            ]
        );
    }
}
