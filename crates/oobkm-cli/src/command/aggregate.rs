use std::path::PathBuf;

use clap::Args;

use crate::{command::AggregatorArg, schema::aggregation::AggregationReport, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct AggregateArg {
    /// Path to the bootstrap outputs JSON file
    pub input: PathBuf,

    /// Output file path (stdout if omitted)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub aggregator: AggregatorArg,
}

pub(crate) fn run(arg: &AggregateArg) -> anyhow::Result<()> {
    let config = arg.aggregator.to_config();
    let (outputs, aggregation) = util::load_and_aggregate(&arg.input, &config)?;

    let report = AggregationReport::new(&outputs, &config, &aggregation);
    util::Output::save_json(&report, arg.output.clone())?;

    if let Some(path) = &arg.output {
        log::info!(
            "Wrote {} subject scores to {}",
            report.subjects.len(),
            path.display()
        );
    }
    Ok(())
}
