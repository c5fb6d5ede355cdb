use chrono::{DateTime, Utc};
use oobkm_analysis::{risk_group::RiskGroup, survival::SurvivalStatsMap};
use serde::{Deserialize, Serialize};

/// Two-group Kaplan-Meier chart, drawn by an external plotting tool
///
/// Each series is a "post" step function: the survival probability of a
/// point holds until the time of the next point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalPlot {
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub y_range: [f64; 2],
    pub series: Vec<PlotSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotSeries {
    pub group: RiskGroup,
    /// Legend label ("Low Risk" / "High Risk")
    pub label: String,
    pub subjects: usize,
    pub events: usize,
    pub median_survival: Option<f64>,
    pub steps: Vec<PlotStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotStep {
    pub time: f64,
    pub survival_prob: f64,
    pub at_risk: usize,
    pub events: usize,
}

impl SurvivalPlot {
    pub fn new(title: &str, stats: &SurvivalStatsMap<RiskGroup>) -> Self {
        let series = stats
            .map
            .iter()
            .map(|(&group, stats)| PlotSeries {
                group,
                label: group.label().to_owned(),
                subjects: stats.subjects_count,
                events: stats.event_count(),
                median_survival: stats.median_km,
                steps: stats
                    .km_curve
                    .step_points()
                    .into_iter()
                    .map(|p| PlotStep {
                        time: p.time,
                        survival_prob: p.survival_prob,
                        at_risk: p.at_risk,
                        events: p.events,
                    })
                    .collect(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            title: title.to_owned(),
            x_label: "Time".to_owned(),
            y_label: "Survival Probability".to_owned(),
            y_range: [0.0, 1.0],
            series,
        }
    }
}

#[cfg(test)]
mod tests {
    use oobkm_analysis::cohort::Outcome;

    use super::*;

    #[test]
    fn test_plot_series_per_group() {
        let observations = [
            (RiskGroup::High, Outcome::new(true, 2.0).unwrap()),
            (RiskGroup::Low, Outcome::new(false, 9.0).unwrap()),
            (RiskGroup::High, Outcome::new(true, 3.0).unwrap()),
            (RiskGroup::Low, Outcome::new(true, 7.0).unwrap()),
        ];
        let stats = SurvivalStatsMap::collect_by_group(observations);
        let plot = SurvivalPlot::new("OOB risk groups", &stats);

        assert_eq!(plot.y_range, [0.0, 1.0]);
        assert_eq!(plot.series.len(), 2);
        assert_eq!(plot.series[0].label, "Low Risk");
        assert_eq!(plot.series[1].label, "High Risk");

        let high = &plot.series[1];
        assert_eq!(high.events, 2);
        assert_eq!(high.steps.len(), 3);
        assert_eq!(high.steps[0].survival_prob, 1.0);
        assert_eq!(high.steps[2].survival_prob, 0.0);
    }
}
