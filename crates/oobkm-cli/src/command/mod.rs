use clap::{Args, Parser, Subcommand};
use oobkm_analysis::oob::{AggregatorConfig, InsufficientPolicy};

use self::{aggregate::AggregateArg, stratify::StratifyArg};

mod aggregate;
mod stratify;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v: debug, -vv: trace); `RUST_LOG` takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Compute out-of-bag scores and risk groups, and write them as JSON
    Aggregate(#[clap(flatten)] AggregateArg),
    /// Report per-group survival and export Kaplan-Meier curves
    Stratify(#[clap(flatten)] StratifyArg),
}

/// Options shared by every command that runs the aggregator
#[derive(Debug, Clone, Args)]
pub(crate) struct AggregatorArg {
    /// What to do with subjects that are in-bag in every replicate (reject, exclude)
    #[arg(long, default_value = "reject")]
    pub on_insufficient: InsufficientPolicy,
}

impl AggregatorArg {
    pub(crate) fn to_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            on_insufficient: self.on_insufficient,
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.verbose);

    match args.mode {
        Mode::Aggregate(arg) => aggregate::run(&arg)?,
        Mode::Stratify(arg) => stratify::run(&arg)?,
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_on_insufficient() {
        let args = CommandArgs::try_parse_from([
            "oobkm",
            "aggregate",
            "in.json",
            "--on-insufficient",
            "exclude",
        ])
        .unwrap();
        let Mode::Aggregate(arg) = args.mode else {
            panic!("expected aggregate mode");
        };
        assert_eq!(arg.aggregator.on_insufficient, InsufficientPolicy::Exclude);

        let args = CommandArgs::try_parse_from(["oobkm", "-v", "stratify", "in.json"]).unwrap();
        assert_eq!(args.verbose, 1);
        let Mode::Stratify(arg) = args.mode else {
            panic!("expected stratify mode");
        };
        assert_eq!(arg.aggregator.on_insufficient, InsufficientPolicy::Reject);
    }
}
