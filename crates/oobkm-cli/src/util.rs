use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use oobkm_analysis::{
    cohort::BootstrapOutputs,
    oob::{AggregatorConfig, Aggregation},
};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Read bootstrap outputs from a JSON file
///
/// The file holds either an object with `outcomes`, `predictions` and
/// `in_bag` keys, or an array of those three fields in that order.
///
/// # Errors
///
/// Returns error if file cannot be opened or parsed
pub fn read_bootstrap_file<P>(path: P) -> anyhow::Result<BootstrapOutputs>
where
    P: AsRef<Path>,
{
    read_json_file("bootstrap outputs", path)
}

/// Load bootstrap outputs and run the out-of-bag aggregation on them
///
/// # Errors
///
/// Returns error if the file cannot be read, or if the aggregation rejects
/// the data (shape mismatch, subject never out-of-bag, ...)
pub fn load_and_aggregate<P>(
    path: P,
    config: &AggregatorConfig,
) -> anyhow::Result<(BootstrapOutputs, Aggregation)>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    log::info!("Loading bootstrap outputs from {}", path.display());
    let outputs = read_bootstrap_file(path)?;
    log::info!(
        "Loaded {} subjects ({} events), {} prediction replicates, {} in-bag replicates",
        outputs.n_subjects(),
        outputs.event_count(),
        outputs.n_replicates(),
        outputs.in_bag.len()
    );

    let aggregation = outputs.aggregate(config).with_context(|| {
        format!(
            "Failed to aggregate out-of-bag predictions from {}",
            path.display()
        )
    })?;

    let excluded = aggregation.excluded().count();
    if excluded > 0 {
        log::warn!(
            "{excluded} subjects were in-bag in every replicate and are excluded from stratification"
        );
    }
    if aggregation.stratification.is_degenerate() {
        log::warn!(
            "Median split is degenerate ({} distinct scores): all scored subjects share one risk group",
            aggregation.stratification.distinct_scores
        );
    }

    Ok((outputs, aggregation))
}
