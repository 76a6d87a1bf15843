use std::{
    collections::BTreeMap,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use log::{debug, info, warn};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use trace_models::read_traces;

use crate::{
    classify::TraceClassifier,
    info::{Aggregate, FinderInfo},
    oracle::AsLookup,
};

#[derive(Args, Clone, Debug)]
#[group(id = "aggregate")]
pub struct Params {
    /// Maximum number of capture files classified at the same time
    #[arg(long, default_value = "40", env = "FINDER_POOLSIZE")]
    pub poolsize: usize,

    /// Keep one accumulator per vantage point instead of merging everything
    #[arg(long)]
    pub by_vantage_point: bool,

    /// Log a progress summary every N finished files
    #[arg(long, default_value = "100")]
    pub progress_every: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            poolsize: 40,
            by_vantage_point: false,
            progress_every: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFile {
    pub path: PathBuf,
    pub vantage_point: String,
}

impl CaptureFile {
    /// Vantage point is taken from the file name up to its first dot,
    /// e.g. `ams-nl.20190301.jsonl` belongs to `ams-nl`.
    pub fn new(path: PathBuf) -> Self {
        let vantage_point = path
            .file_name()
            .map(|it| it.to_string_lossy())
            .and_then(|name| name.split('.').next().map(str::to_string))
            .unwrap_or_default();
        Self {
            path,
            vantage_point,
        }
    }

    pub fn with_vantage_point(path: PathBuf, vantage_point: String) -> Self {
        Self {
            path,
            vantage_point,
        }
    }
}

impl Display for CaptureFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.vantage_point)
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub file: CaptureFile,
    pub error: anyhow::Error,
}

#[derive(Debug)]
pub struct AggregateReport {
    pub aggregate: Aggregate,
    pub failures: Vec<FileFailure>,
    /// Files that finished, successfully or not.
    pub processed: usize,
    /// Files never started because the batch was cancelled.
    pub skipped: usize,
}

type Outcome = (CaptureFile, Result<FinderInfo>);

/// Classifies capture files on the blocking pool, keeping at most `poolsize` files in
/// flight, and folds the results as they arrive.
pub struct Aggregator {
    asns: Arc<dyn AsLookup>,
    params: Params,
}

impl Aggregator {
    pub fn new(asns: Arc<dyn AsLookup>, params: Params) -> Self {
        Self { asns, params }
    }

    /// A failing file contributes nothing and is reported in the result. Cancelling
    /// `stop` prevents further files from being started; files in flight still finish.
    pub async fn run(&self, files: Vec<CaptureFile>, stop: CancellationToken) -> Result<AggregateReport> {
        let total = files.len();
        let mut pending = files.into_iter();
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        for file in pending.by_ref().take(self.params.poolsize.max(1)) {
            self.spawn(&mut tasks, file);
        }
        info!("Started {} of {} capture files in parallel.", tasks.len(), total);

        let mut aggregate = if self.params.by_vantage_point {
            Aggregate::PerVantagePoint(BTreeMap::new())
        } else {
            Aggregate::Global(FinderInfo::default())
        };
        let mut failures = vec![];
        let mut processed = 0;

        while let Some(joined) = tasks.join_next().await {
            let (file, result) = joined.context("classifier task did not complete")?;
            processed += 1;

            let part = match result {
                Ok(part) => {
                    debug!(" ... Classified {}", file);
                    part
                }
                Err(error) => {
                    warn!(" !!! Failed to classify {}: {:?}. Continuing.", file, error);
                    failures.push(FileFailure {
                        file: file.clone(),
                        error,
                    });
                    FinderInfo::default()
                }
            };
            fold(&mut aggregate, &file, part);

            if self.params.progress_every > 0 && processed % self.params.progress_every == 0 {
                info!("Processed {}/{} files: {}", processed, total, progress_of(&aggregate));
            }

            if stop.is_cancelled() {
                continue;
            }
            if let Some(next) = pending.next() {
                self.spawn(&mut tasks, next);
            }
        }

        let skipped = pending.len();
        if skipped > 0 {
            warn!("Stopped early, {} capture files were never started.", skipped);
        }
        info!(
            "Aggregation done: {} files, {} failed. {}",
            processed,
            failures.len(),
            progress_of(&aggregate)
        );

        Ok(AggregateReport {
            aggregate,
            failures,
            processed,
            skipped,
        })
    }

    fn spawn(&self, tasks: &mut JoinSet<Outcome>, file: CaptureFile) {
        let asns = Arc::clone(&self.asns);
        tasks.spawn_blocking(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| classify_file(asns.as_ref(), &file.path)))
                .unwrap_or_else(|_| Err(anyhow!("classifier panicked")));
            (file, result)
        });
    }
}

fn classify_file(asns: &dyn AsLookup, path: &Path) -> Result<FinderInfo> {
    let traces = read_traces(path).with_context(|| format!("while reading {:?}", path))?;
    Ok(TraceClassifier::new(asns).classify_all(&traces))
}

fn fold(aggregate: &mut Aggregate, file: &CaptureFile, part: FinderInfo) {
    match aggregate {
        Aggregate::Global(info) => info.merge(part),
        Aggregate::PerVantagePoint(by_vp) => by_vp
            .entry(file.vantage_point.clone())
            .or_default()
            .merge(part),
    }
}

fn progress_of(aggregate: &Aggregate) -> String {
    match aggregate {
        Aggregate::Global(info) => info.summary().to_string(),
        Aggregate::PerVantagePoint(by_vp) => format!("{} vantage points", by_vp.len()),
    }
}
