use std::path::Path;

use labelsim::config::RunConfig;
use labelsim::labeling::{LabelStore, Record, RecordPool};

const LABELS: [&str; 3] = ["citrus", "floral", "woody"];

/// `n` distinct records, most frequent first, labels cycling through three classes.
pub fn records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(format!("phrase {i}"), LABELS[i % LABELS.len()], (n - i) as f64))
        .collect()
}

pub fn pool(records: &[Record]) -> RecordPool {
    RecordPool::from_records(records.to_vec())
}

pub fn bootstrap_store() -> LabelStore {
    LabelStore::new(LABELS.iter().map(|label| Record::vocabulary(*label)).collect())
}

pub const BOOTSTRAP_LEN: usize = LABELS.len();

/// Write a pool and a bootstrap CSV under `dir` and point a config at them.
pub fn write_inputs(dir: &Path, records: &[Record], batch_size: usize) -> RunConfig {
    let pool_path = dir.join("train.csv");
    let mut pool = String::from("phrase,subtopic,frequency\n");
    for record in records {
        pool.push_str(&format!(
            "{},{},{}\n",
            record.phrase(),
            record.subtopic_true(),
            record.frequency()
        ));
    }
    std::fs::write(&pool_path, pool).expect("write pool");

    let bootstrap_path = dir.join("classifier.csv");
    let mut bootstrap = String::from("topic,subtopic\n");
    for label in LABELS {
        bootstrap.push_str(&format!("scent,{label}\n"));
    }
    std::fs::write(&bootstrap_path, bootstrap).expect("write bootstrap");

    let mut config = RunConfig::default();
    config.inputs.pool = pool_path;
    config.inputs.bootstrap = bootstrap_path;
    config.output.dir = dir.join("out");
    config.output.checkpoint = dir.join("out/in_model.csv");
    config.campaign.batch_size = batch_size;
    config.classifier.dimensions = 512;
    config
}
