use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use finder::{
    info::Aggregate,
    oracle::{liveness, read::address_set},
};

#[derive(Args, Clone)]
pub struct Params {
    /// Accumulator dump written by `find`; its four-address candidates are scored
    input: PathBuf,

    /// Addresses that answered echo requests, one per line
    #[arg(long)]
    responsive: PathBuf,

    /// Where to write the liveness codes (JSON object)
    #[arg(long, short)]
    out: PathBuf,
}

pub fn handle(params: Params) -> Result<()> {
    let out_file = File::create_new(&params.out)
        .with_context(|| format!("Failed to create output file {:?}", params.out))?;

    let info = Aggregate::load(&params.input)?.into_global();
    let responsive = address_set(&params.responsive)?;
    let fours = info.fours();
    let scores = liveness::score(fours.keys(), &responsive);
    info!(
        "Scored {} candidates against {} responsive addresses",
        scores.len(),
        responsive.len()
    );

    let mut writer = BufWriter::new(out_file);
    serde_json::to_writer(&mut writer, &scores)?;
    writer.flush()?;
    Ok(())
}
