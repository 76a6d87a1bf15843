use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use flexi_logger::{
    colored_default_format, detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger,
    LoggerHandle, Naming, WriteMode,
};
use log::Level;

#[derive(Args, Debug)]
#[group(id = "logging")]
pub struct Params {
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Use a flexi_logger configuration file
    #[arg(long = "log-spec")]
    use_log_spec: bool,

    /// Path to log spec
    #[arg(long, value_name = "TOML FILE", default_value = "logspec.toml")]
    log_spec_file: PathBuf,

    /// Additionally write logs to rotated files in this directory. Batch runs over
    /// a few thousand capture files tend to outlive the terminal scrollback.
    #[arg(long, value_name = "DIR", env = "FINDER_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

pub fn configure_from(params: &Params) -> Result<LoggerHandle> {
    // log_level() returns None iff verbosity < 0, i.e. being most quiet seems reasonable
    let cli_level = params.verbose.log_level().unwrap_or(Level::Error);

    let mut log_builder = Logger::try_with_env_or_str(cli_level.to_string())
        .context("Failed to parse logger spec from env RUST_LOG or cli level")?
        .write_mode(WriteMode::Async)
        .format_for_stdout(colored_default_format)
        .format_for_files(detailed_format);

    if let Some(dir) = &params.log_dir {
        log_builder = log_builder
            .log_to_file(FileSpec::default().directory(dir))
            .rotate(
                Criterion::Size(64 * 1024 * 1024),
                Naming::Timestamps,
                Cleanup::KeepLogFiles(8),
            )
            .duplicate_to_stdout(Duplicate::All);
    }

    match params.use_log_spec {
        true => log_builder
            .start_with_specfile(&params.log_spec_file)
            .with_context(|| format!("Failed to start logger with specfile {:?}", params.log_spec_file)),
        false => log_builder
            .start()
            .context("Failed to start logger handle w/o specfile"),
    }
}
