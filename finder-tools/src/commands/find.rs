use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Args;
use futures::executor;
use log::{info, warn};

use cfa_crab::helpers::stop::{self, flatten};
use finder::{
    aggregate::{self, Aggregator, CaptureFile},
    oracle,
};

#[derive(Args, Clone)]
pub struct Params {
    #[clap(flatten)]
    pub aggregate: aggregate::Params,

    #[clap(flatten)]
    oracles: oracle::Params,

    /// File listing capture files, one per line, optionally followed by the vantage
    /// point name (otherwise taken from the file name)
    #[arg(long)]
    file_list: Option<PathBuf>,

    /// Where to write the accumulator dump
    #[arg(long, short)]
    out: PathBuf,

    /// Capture files (JSON lines of traces)
    files: Vec<PathBuf>,
}

pub fn handle(params: Params) -> Result<()> {
    let mut files: Vec<CaptureFile> = params.files.iter().cloned().map(CaptureFile::new).collect();
    if let Some(list) = &params.file_list {
        let content = fs::read_to_string(list).with_context(|| format!("Failed to read file list {:?}", list))?;
        files.extend(parse_file_list(&content));
    }
    if files.is_empty() {
        bail!("No capture files given");
    }

    let asns = params.oracles.read_as_table()?;
    let aggregator = Aggregator::new(Arc::new(asns), params.aggregate.clone());

    let sig_handler = stop::new();
    let stop_rx = sig_handler.subscribe_stop();
    let sig_handle = tokio::spawn(sig_handler.wait_for_signal());

    info!("Classifying {} capture files...", files.len());
    let run_result = executor::block_on(aggregator.run(files, stop_rx.clone()));
    stop_rx.cancel();
    executor::block_on(flatten(sig_handle))?;
    let report = run_result?;

    for failure in &report.failures {
        warn!("Skipped {}: {:#}", failure.file, failure.error);
    }
    if report.skipped > 0 {
        warn!(
            "Dump is partial, {} capture files were not classified.",
            report.skipped
        );
    }
    report
        .aggregate
        .dump(&params.out)
        .with_context(|| "Failed to persist accumulator")?;
    info!(
        "Done: {} files classified, {} failed.",
        report.processed - report.failures.len(),
        report.failures.len()
    );
    Ok(())
}

fn parse_file_list(content: &str) -> Vec<CaptureFile> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut fields = line.split_whitespace();
            let path = PathBuf::from(fields.next().unwrap_or_default());
            match fields.next() {
                Some(vantage_point) => CaptureFile::with_vantage_point(path, vantage_point.to_string()),
                None => CaptureFile::new(path),
            }
        })
        .collect()
}
