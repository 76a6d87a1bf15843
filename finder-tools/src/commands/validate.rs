use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use finder::{
    info::Aggregate,
    oracle::{self, AsOrgs},
    prune::{run_pipeline, Oracles},
    validate::{GroundTruth, Validator},
};

use super::prune::write_csv;

#[derive(Args, Clone)]
pub struct Params {
    #[clap(flatten)]
    oracles: oracle::Params,

    /// Accumulator dump written by `find`
    input: PathBuf,

    /// Known forwarding addresses of the target network, one per line
    #[arg(long)]
    positives: PathBuf,

    /// Known non-forwarding addresses of the target network, one per line
    #[arg(long)]
    negatives: PathBuf,

    /// ASN of the network the ground truth belongs to
    #[arg(long)]
    target_asn: u32,

    /// Count four-address candidates with a refuting liveness code as not detected,
    /// even if pruning kept them
    #[arg(long)]
    strict_liveness: bool,

    /// CSV file for the per-address breakdown
    #[arg(long, short)]
    out: PathBuf,

    /// CSV file for the summary row
    #[arg(long)]
    summary: Option<PathBuf>,
}

pub fn handle(params: Params) -> Result<()> {
    let out_file = File::create_new(&params.out)
        .with_context(|| format!("Failed to create output file {:?}", params.out))?;
    let summary_file = params.summary.as_ref().map(File::create_new).transpose()?;

    let asns = params.oracles.read_as_table()?;
    let truth = GroundTruth::read(&params.positives, &params.negatives)?;
    let oracles = Oracles::read(&params.oracles)?;

    let info = Aggregate::load(&params.input)?.into_global();
    let (pruned, _) = run_pipeline(info, &oracles);
    let prev = pruned.predecessors();

    let no_orgs = AsOrgs::default();
    let validator = Validator::new(
        &asns,
        oracles.as_orgs.as_ref().unwrap_or(&no_orgs),
        oracles.ixp_members.as_ref(),
    );
    let liveness = if params.strict_liveness {
        oracles.liveness.as_ref()
    } else {
        None
    };
    let verdicts = validator.validate(&pruned, &truth, &prev, params.target_asn, liveness);
    println!("{}", verdicts);

    let breakdown = verdicts.breakdown();
    info!("Writing breakdown of {} addresses...", breakdown.len());
    write_csv(out_file, breakdown)?;
    if let Some(summary_file) = summary_file {
        write_csv(summary_file, vec![verdicts.summary_row()])?;
    }
    Ok(())
}
