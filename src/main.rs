//! Run one active-learning labeling campaign.

use std::path::PathBuf;

use labelsim::campaign::ReingestPolicy;
use labelsim::config::RunConfig;
use labelsim::logging;
use labelsim::ml::metrics::PrecisionAverage;
use labelsim::runner::run_campaign;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let mut config = match &options.config {
        Some(path) => RunConfig::load(path),
        None => RunConfig::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    options.apply(&mut config);

    let report = run_campaign(&config).map_err(|err| err.to_string())?;
    println!("rounds: {}", report.rounds);
    println!("oracle-labeled: {}", report.people);
    println!("model-labeled: {}", report.model);
    match report.promoted_at {
        Some(round) => println!("promoted at round: {round}"),
        None => println!("promoted at round: never"),
    }
    if let Some(precision) = report.final_precision {
        println!("final precision: {precision:.4}");
    }
    println!("all metrics: {}", report.paths.all_metrics.display());
    println!("marked metrics: {}", report.paths.marked_metrics.display());
    println!("marked records: {}", report.paths.marked.display());
    Ok(())
}

/// Command-line overrides; unset fields keep the config value.
#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    pool: Option<PathBuf>,
    bootstrap: Option<PathBuf>,
    column: Option<String>,
    limit: Option<f64>,
    batch_size: Option<usize>,
    accept_precision: Option<f64>,
    average: Option<PrecisionAverage>,
    reingest: Option<ReingestPolicy>,
    out_dir: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    save_snapshot: Option<PathBuf>,
    neighbors: Option<usize>,
}

impl CliOptions {
    fn apply(&self, config: &mut RunConfig) {
        if let Some(path) = &self.pool {
            config.inputs.pool = path.clone();
        }
        if let Some(path) = &self.bootstrap {
            config.inputs.bootstrap = path.clone();
        }
        if let Some(column) = &self.column {
            config.inputs.bootstrap_column = column.clone();
        }
        if let Some(limit) = self.limit {
            config.campaign.limit = limit;
        }
        if let Some(batch_size) = self.batch_size {
            config.campaign.batch_size = batch_size;
        }
        if let Some(accept) = self.accept_precision {
            config.campaign.accept_precision = accept;
        }
        if let Some(average) = self.average {
            config.campaign.precision_average = average;
        }
        if let Some(reingest) = self.reingest {
            config.campaign.reingest = reingest;
        }
        if let Some(dir) = &self.out_dir {
            config.output.dir = dir.clone();
        }
        if let Some(path) = &self.checkpoint {
            config.output.checkpoint = path.clone();
        }
        if let Some(path) = &self.snapshot {
            config.classifier.snapshot = Some(path.clone());
        }
        if let Some(path) = &self.save_snapshot {
            config.classifier.save_snapshot = Some(path.clone());
        }
        if let Some(neighbors) = self.neighbors {
            config.classifier.neighbors = neighbors;
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            return Err(help_text());
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--config" => options.config = Some(PathBuf::from(value)),
            "--pool" => options.pool = Some(PathBuf::from(value)),
            "--bootstrap" => options.bootstrap = Some(PathBuf::from(value)),
            "--column" => options.column = Some(value.clone()),
            "--limit" => {
                options.limit = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --limit value: {value}"))?,
                );
            }
            "--batch-size" => {
                options.batch_size = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --batch-size value: {value}"))?,
                );
            }
            "--accept-precision" => {
                options.accept_precision = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --accept-precision value: {value}"))?,
                );
            }
            "--average" => {
                options.average = Some(match value.as_str() {
                    "weighted" => PrecisionAverage::Weighted,
                    "macro" => PrecisionAverage::Macro,
                    "micro" => PrecisionAverage::Micro,
                    _ => return Err(format!("Invalid --average value: {value}")),
                });
            }
            "--reingest" => {
                options.reingest = Some(match value.as_str() {
                    "full" => ReingestPolicy::Full,
                    "delta" => ReingestPolicy::Delta,
                    _ => return Err(format!("Invalid --reingest value: {value}")),
                });
            }
            "--out" => options.out_dir = Some(PathBuf::from(value)),
            "--checkpoint" => options.checkpoint = Some(PathBuf::from(value)),
            "--snapshot" => options.snapshot = Some(PathBuf::from(value)),
            "--save-snapshot" => options.save_snapshot = Some(PathBuf::from(value)),
            "--neighbors" => {
                options.neighbors = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --neighbors value: {value}"))?,
                );
            }
            _ => return Err(format!("Unknown argument: {flag}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "labelsim",
        "",
        "Simulate an active-learning labeling campaign and write its metrics.",
        "",
        "Usage:",
        "  labelsim [--config <file>] [overrides]",
        "",
        "Options:",
        "  --config <file>            TOML config (default: <app root>/config.toml).",
        "  --pool <file>              Training pool CSV (phrase, subtopic[, frequency]).",
        "  --bootstrap <file>         Taxonomy CSV seeding the label store.",
        "  --column <name>            Bootstrap column holding the vocabulary.",
        "  --limit <0..1>             Confidence threshold for model labels.",
        "  --batch-size <n>           Oracle batch size per round.",
        "  --accept-precision <0..1>  Precision needed to trust the model.",
        "  --average <kind>           weighted | macro | micro.",
        "  --reingest <policy>        full | delta.",
        "  --out <dir>                Artifact directory.",
        "  --checkpoint <file>        Label-store checkpoint CSV.",
        "  --snapshot <file>          Pre-trained classifier index (JSON).",
        "  --save-snapshot <file>     Save the classifier index when done.",
        "  --neighbors <n>            Neighbours voting per prediction.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let options = parse_args(args(&[
            "--limit",
            "0.7",
            "--batch-size",
            "25",
            "--reingest",
            "delta",
            "--out",
            "runs",
        ]))
        .unwrap();
        let mut config = RunConfig::default();
        options.apply(&mut config);
        assert_eq!(config.campaign.limit, 0.7);
        assert_eq!(config.campaign.batch_size, 25);
        assert_eq!(config.campaign.reingest, ReingestPolicy::Delta);
        assert_eq!(config.output.dir, PathBuf::from("runs"));
        assert_eq!(config.campaign.accept_precision, 0.98);
    }

    #[test]
    fn rejects_missing_and_bad_values() {
        assert!(parse_args(args(&["--limit"])).is_err());
        assert!(parse_args(args(&["--batch-size", "ten"])).is_err());
        assert!(parse_args(args(&["--average", "median"])).is_err());
        assert!(parse_args(args(&["--bogus", "1"])).is_err());
    }
}
