use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use magic_knn::{
    DEFAULT_LEAF_SIZE, Metric, Pipeline, PipelineConfig, PipelineReport, TracingSink, describe,
    parse_strategy,
};

/// Classify MAGIC gamma telescope events with k-nearest neighbors.
#[derive(Parser, Debug)]
#[command(name = "magic-knn")]
#[command(version)]
#[command(about = "Train and evaluate a k-NN classifier on the MAGIC gamma telescope data")]
struct Cli {
    /// CSV file with an id column, the feature columns and a class column
    data: PathBuf,

    /// Number of neighbors that vote on each prediction
    #[arg(short, default_value_t = 3)]
    k: usize,

    /// Share of records used for training
    #[arg(long, default_value_t = 0.7)]
    train_ratio: f64,

    /// Seed of the shuffle that precedes the split
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Distance metric: euclidean, manhattan or chebyshev
    #[arg(long, default_value = "euclidean")]
    metric: Metric,

    /// Neighbor index: kdtree or linear
    #[arg(long, default_value = "kdtree")]
    index: String,

    /// Maximum records per k-d tree leaf
    #[arg(long, default_value_t = DEFAULT_LEAF_SIZE)]
    leaf_size: usize,

    /// Number of feature columns between the id and the class
    #[arg(long, default_value_t = 10)]
    features: usize,

    /// The first row is data, not column names
    #[arg(long)]
    no_header: bool,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Print per-column statistics of the loaded data
    #[arg(long)]
    describe: bool,

    /// Two feature columns to export as coordinate pairs
    #[arg(long, default_value = "fWidth,fSize")]
    projection: String,

    /// Where to write the projection CSV; nothing is written without it
    #[arg(long)]
    projection_out: Option<PathBuf>,

    /// Print `ID,class,predicted` for every test record
    #[arg(long)]
    print_predictions: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            n_features: self.features,
            has_header: !self.no_header,
            delimiter: self.delimiter,
            train_ratio: self.train_ratio,
            seed: self.seed,
            k: self.k,
            metric: self.metric,
            strategy: parse_strategy(&self.index, self.leaf_size)?,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    let raw = fs::read_to_string(&cli.data)
        .with_context(|| format!("failed to read {}", cli.data.display()))?;

    let report = Pipeline::new(config)
        .run(raw.lines(), TracingSink)
        .with_context(|| format!("failed to classify {}", cli.data.display()))?;

    if cli.describe {
        let summary = describe(&report.dataset).context("failed to summarize the dataset")?;
        println!("{summary}\n");
    }

    print_report(&report);

    if cli.print_predictions {
        write_predictions(&report, io::stdout().lock())?;
    }

    if let Some(path) = &cli.projection_out {
        write_projection(&report, &cli.projection, path)?;
        info!(path = %path.display(), "projection written");
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "records: {} (skipped {}), train: {}, test: {}",
        report.dataset.len(),
        report.skipped_rows,
        report.split.train.len(),
        report.split.test.len()
    );
    println!("\n{}\n", report.matrix);
    for class in report.matrix.class_reports() {
        println!("{class}");
    }
}

/// One line with the whole context chain.
fn failure_message(error: &anyhow::Error) -> String {
    format!("error: {error:#}")
}

fn write_predictions<W: Write>(report: &PipelineReport, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["ID", "class", "predicted"])?;
    for (id, truth, predicted) in report.labelled_predictions() {
        writer.write_record([id.to_string().as_str(), truth, predicted])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_projection(report: &PipelineReport, columns: &str, path: &Path) -> Result<()> {
    let (x, y) = columns
        .split_once(',')
        .ok_or_else(|| anyhow!("projection must name two columns as X,Y, got {columns:?}"))?;
    let dataset = &report.dataset;
    let i = dataset.feature_index(x)?;
    let j = dataset.feature_index(y)?;
    let points = dataset.projection(i, j)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([
        dataset.feature_names()[i].as_str(),
        dataset.feature_names()[j].as_str(),
        "class",
    ])?;
    for (record, (px, py)) in dataset.iter().zip(points) {
        writer.write_record([px.to_string(), py.to_string(), dataset.symbol_of(record).to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use magic_knn::CollectingSink;

    fn report() -> PipelineReport {
        let mut rows = vec!["ID,x:,class:".to_string()];
        rows.extend((0..10).map(|i| {
            let label = if i < 5 { "g" } else { "h" };
            format!("{i},{},{label}", i * 10)
        }));
        let config = PipelineConfig {
            n_features: 1,
            k: 1,
            ..PipelineConfig::default()
        };
        Pipeline::new(config)
            .run(&rows, CollectingSink::default())
            .unwrap()
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["magic-knn", "data.csv", "--print-predictions", "-k", "5"])
            .unwrap();
        assert!(cli.print_predictions);
        assert_eq!(cli.config().unwrap().k, 5);

        let cli = Cli::try_parse_from(["magic-knn", "data.csv"]).unwrap();
        assert!(!cli.print_predictions);
        assert_eq!(cli.config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_write_predictions() {
        let report = report();
        let mut out = Vec::new();
        write_predictions(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID,class,predicted");
        assert_eq!(lines.len(), report.split.test.len() + 1);
        let first = &report.split.test.records()[0];
        assert!(lines[1].starts_with(&format!("{},", first.id())));
    }

    #[test]
    fn test_failure_message_is_a_single_line() {
        let error = anyhow!("bad ratio").context("failed to classify data.csv");
        let message = failure_message(&error);
        assert_eq!(message, "error: failed to classify data.csv: bad ratio");
        assert_eq!(message.matches("bad ratio").count(), 1);
    }
}
