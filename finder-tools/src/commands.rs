use anyhow::Result;
use clap::Subcommand;
use log::debug;

mod find;
mod prune;
mod score_liveness;
mod validate;

pub fn handle(cmd: Commands) -> Result<()> {
    let command_result = match cmd {
        Commands::Find(data) => find::handle(data),
        Commands::Prune(data) => prune::handle(data),
        Commands::Validate(data) => validate::handle(data),
        Commands::ScoreLiveness(data) => score_liveness::handle(data),
    };
    debug!("Finished command execution. Result: {:?}", command_result);
    command_result
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify capture files in parallel and persist the merged accumulator.
    Find(find::Params),

    /// Run the pruning pipeline on a persisted accumulator and write the final CFAs.
    Prune(prune::Params),

    /// Prune, then score the result against ground truth for one target network.
    Validate(validate::Params),

    /// Turn echo-responsive addresses into liveness codes for four-address candidates.
    ScoreLiveness(score_liveness::Params),
}

impl Commands {
    /// Blocking workers the runtime should provide for this command.
    pub fn workers(&self) -> usize {
        match self {
            Commands::Find(params) => params.aggregate.poolsize,
            _ => 1,
        }
    }
}
