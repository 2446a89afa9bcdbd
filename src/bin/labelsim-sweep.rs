//! Run a grid of campaigns over confidence thresholds and batch sizes.
//!
//! Every configuration gets a fresh classifier and promotion state; the
//! artifacts of each run land next to each other in the output directory, and
//! each run logs to its own file tagged with its limit and batch size.

use std::path::PathBuf;

use labelsim::config::RunConfig;
use labelsim::logging;
use labelsim::runner::{RunReport, run_campaign};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let logs = logging::SweepLogs::open()
        .inspect_err(|err| eprintln!("Logging disabled: {err}"))
        .ok();
    let base = match &options.config {
        Some(path) => RunConfig::load(path),
        None => RunConfig::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let limits = if options.limits.is_empty() {
        vec![base.campaign.limit]
    } else {
        options.limits.clone()
    };
    let batch_sizes = if options.batch_sizes.is_empty() {
        vec![base.campaign.batch_size]
    } else {
        options.batch_sizes.clone()
    };

    let mut results = Vec::with_capacity(limits.len() * batch_sizes.len());
    for &limit in &limits {
        for &batch_size in &batch_sizes {
            let mut config = base.clone();
            config.campaign.limit = limit;
            config.campaign.batch_size = batch_size;
            if let Some(dir) = &options.out_dir {
                config.output.dir = dir.clone();
            }
            config.output.checkpoint = config
                .output
                .dir
                .join(format!("{limit:?}_{batch_size}_in_model.csv"));
            // Runs never share a classifier index.
            config.classifier.save_snapshot = None;
            let run_log = logs.as_ref().and_then(|logs| {
                logs.run(limit, batch_size)
                    .inspect_err(|err| eprintln!("Run log disabled: {err}"))
                    .ok()
            });
            let report = match &run_log {
                Some(log) => log.scope(|| {
                    tracing::info!(limit, batch_size, log = %log.path().display(), "sweep run");
                    run_campaign(&config)
                }),
                None => run_campaign(&config),
            }
            .map_err(|err| format!("limit={limit:?} batch_size={batch_size}: {err}"))?;
            results.push((limit, batch_size, report));
        }
    }

    print_table(&results);
    Ok(())
}

fn print_table(results: &[(f64, usize, RunReport)]) {
    println!(
        "{:>6}  {:>6}  {:>6}  {:>8}  {:>8}  {:>8}  {:>9}",
        "limit", "batch", "rounds", "people", "model", "promoted", "precision"
    );
    for (limit, batch_size, report) in results {
        let promoted = report
            .promoted_at
            .map(|round| round.to_string())
            .unwrap_or_else(|| "-".to_string());
        let precision = report
            .final_precision
            .map(|p| format!("{p:.4}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>6}  {:>6}  {:>6}  {:>8}  {:>8}  {:>8}  {:>9}",
            format!("{limit:?}"),
            batch_size,
            report.rounds,
            report.people,
            report.model,
            promoted,
            precision
        );
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    limits: Vec<f64>,
    batch_sizes: Vec<usize>,
    out_dir: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--limits" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--limits requires a value".to_string())?;
                options.limits = parse_list(value, "--limits")?;
            }
            "--batch-sizes" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--batch-sizes requires a value".to_string())?;
                options.batch_sizes = parse_list(value, "--batch-sizes")?;
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out_dir = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn parse_list<T: std::str::FromStr>(value: &str, flag: &str) -> Result<Vec<T>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|_| format!("Invalid {flag} entry: {item}"))
        })
        .collect()
}

fn help_text() -> String {
    [
        "labelsim-sweep",
        "",
        "Run one campaign per (limit, batch size) pair and compare labeling cost.",
        "",
        "Usage:",
        "  labelsim-sweep [--config <file>] --limits 0.7,0.8,0.9 --batch-sizes 100,500",
        "",
        "Options:",
        "  --config <file>        TOML config providing inputs and defaults.",
        "  --limits <list>        Comma-separated confidence thresholds.",
        "  --batch-sizes <list>   Comma-separated oracle batch sizes.",
        "  --out <dir>            Artifact directory for every run.",
    ]
    .join("\n")
}
