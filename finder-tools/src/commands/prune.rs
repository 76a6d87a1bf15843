use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use serde::Serialize;

use finder::{
    info::Aggregate,
    oracle,
    prune::{run_pipeline, Oracles},
};

#[derive(Args, Clone)]
pub struct Params {
    #[clap(flatten)]
    oracles: oracle::Params,

    /// Accumulator dump written by `find`
    input: PathBuf,

    /// CSV file for the final candidates with provenance
    #[arg(long, short)]
    out: PathBuf,

    /// CSV file for the candidate counts after each stage
    #[arg(long)]
    report: Option<PathBuf>,

    /// Also persist the pruned accumulator here
    #[arg(long)]
    pruned: Option<PathBuf>,
}

pub fn handle(params: Params) -> Result<()> {
    let out_file = File::create_new(&params.out)
        .with_context(|| format!("Failed to create output file {:?}", params.out))?;
    let report_file = params.report.as_ref().map(File::create_new).transpose()?;

    let info = Aggregate::load(&params.input)?.into_global();
    info!("Loaded accumulator: {}", info.summary());
    let oracles = Oracles::read(&params.oracles)?;

    let (pruned, report) = run_pipeline(info, &oracles);
    info!("Pipeline finished:\n{}", report);

    let records = pruned.cfa_records();
    info!("Writing {} candidates...", records.len());
    write_csv(out_file, records)?;
    if let Some(report_file) = report_file {
        write_csv(report_file, report.rows)?;
    }

    if let Some(path) = &params.pruned {
        pruned.into_inner().dump(path)?;
    }
    Ok(())
}

pub(crate) fn write_csv<T: Serialize>(out_file: File, rows: Vec<T>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out_file);
    for item in rows {
        writer.serialize(item)?;
    }
    writer.flush()?;
    Ok(())
}
