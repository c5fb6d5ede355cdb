//! Risk stratification command
//!
//! Splits the cohort at the median out-of-bag score and performs Kaplan-Meier
//! survival analysis on each risk group.

mod export;
mod table;

use std::path::PathBuf;

use clap::Args;
use oobkm_analysis::{
    cohort::BootstrapOutputs, oob::Aggregation, risk_group::RiskGroup,
    survival::SurvivalStatsMap,
};
use oobkm_stats::descriptive::DescriptiveStats;

use crate::{command::AggregatorArg, schema::plot::SurvivalPlot, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct StratifyArg {
    /// Path to the bootstrap outputs JSON file
    pub input: PathBuf,

    #[clap(flatten)]
    pub aggregator: AggregatorArg,

    /// Output directory for KM curve and per-subject CSV files
    #[arg(long)]
    pub km_output_dir: Option<PathBuf>,

    /// Write a JSON description of the survival plot to this path
    #[arg(long)]
    pub plot_output: Option<PathBuf>,

    /// Title of the survival plot
    #[arg(long, default_value = "Kaplan-Meier Survival by Out-of-Bag Risk Group")]
    pub title: String,
}

pub(crate) fn run(arg: &StratifyArg) -> anyhow::Result<()> {
    let (outputs, aggregation) =
        util::load_and_aggregate(&arg.input, &arg.aggregator.to_config())?;

    println!("Out-of-Bag Risk Stratification Report");
    println!("=====================================\n");

    print_cohort_summary(&outputs, &aggregation);
    println!();

    print_score_statistics(&aggregation);
    println!();

    let group_stats = SurvivalStatsMap::from_aggregation(&outputs.outcomes, &aggregation);
    table::print_legend();
    println!();
    println!("Survival by Risk Group");
    table::print_survival_table(&group_stats);

    if let Some(dir) = &arg.km_output_dir {
        println!();
        export::save_km_curves(dir, &group_stats)?;
        export::save_subjects(dir, &outputs, &aggregation)?;
    }

    if let Some(path) = &arg.plot_output {
        let plot = SurvivalPlot::new(&arg.title, &group_stats);
        util::Output::save_json(&plot, Some(path.clone()))?;
        println!("  Plot description saved to: {}", path.display());
    }

    Ok(())
}

#[expect(clippy::cast_precision_loss)]
fn print_cohort_summary(outputs: &BootstrapOutputs, aggregation: &Aggregation) {
    let n_subjects = outputs.n_subjects();
    let events = outputs.event_count();
    let excluded = aggregation.excluded().collect::<Vec<_>>();

    println!("Cohort:");
    println!(
        "  Subjects: {} total, {} events ({:.1}%), {} censored ({:.1}%)",
        n_subjects,
        events,
        100.0 * events as f64 / n_subjects as f64,
        n_subjects - events,
        100.0 * (n_subjects - events) as f64 / n_subjects as f64
    );
    println!("  Bootstrap replicates: {}", outputs.n_replicates());
    if excluded.is_empty() {
        println!("  Excluded (never out-of-bag): none");
    } else {
        println!("  Excluded (never out-of-bag): {excluded:?}");
    }
}

#[expect(clippy::cast_precision_loss)]
fn print_score_statistics(aggregation: &Aggregation) {
    let split = &aggregation.stratification;
    let scores = DescriptiveStats::new(aggregation.scored().map(|(_, score, _)| score));
    let oob_counts = DescriptiveStats::new(
        aggregation
            .subjects
            .iter()
            .map(|s| s.oob_count as f64),
    );

    println!("Aggregated Scores:");
    if let Some(stats) = scores {
        println!(
            "  Min {:.4}  Median {:.4}  Mean {:.4}  Max {:.4}  Std {:.4}",
            stats.min, stats.median, stats.mean, stats.max, stats.std_dev
        );
    }
    if let Some(stats) = oob_counts {
        println!(
            "  Out-of-bag replicates per subject: min {}, mean {:.1}, max {}",
            stats.min, stats.mean, stats.max
        );
    }
    println!(
        "  Median split at {:.4}: {} {}, {} {}",
        split.median,
        split.count(RiskGroup::Low),
        RiskGroup::Low,
        split.count(RiskGroup::High),
        RiskGroup::High
    );
    if split.is_degenerate() {
        println!(
            "  ⚠ Degenerate split: {} distinct scores, one risk group is empty",
            split.distinct_scores
        );
    }
}
