//! Command-line surface: flags, config loading and the exit code.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgGroup, Parser};

use crate::banner::{BannerInfo, print_banner, print_summary};
use crate::config::{ChannelsFile, Settings};
use crate::consts::CHANNELS_ENV;
use crate::runner::{ExecutionMode, LiveServices, run_all};

/// Exit code when every channel succeeded.
pub const EXIT_OK: u8 = 0;
/// Exit code for a failed channel or a configuration error.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(
    name = "farecast",
    version,
    about = "Posts cheap-flight travel ideas to Telegram channels."
)]
#[command(group(ArgGroup::new("source").required(true).args(["config", "from_env"])))]
pub struct Cli {
    /// JSON file with the channel list
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Read the channel list from the CHANNELS_CONFIG environment variable
    #[arg(long, default_value_t = false)]
    pub from_env: bool,

    /// Process channels concurrently instead of one after another
    #[arg(short, long, default_value_t = false)]
    pub parallel: bool,

    /// Compose and print posts without sending them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Print the configured cron expression and exit
    #[arg(long, default_value_t = false)]
    pub print_cron: bool,

    /// Log filter (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON instead of human-readable
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,
}

impl Cli {
    pub fn mode(&self) -> ExecutionMode {
        if self.parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }
}

/// Load the configuration, run every channel and return the exit code.
///
/// `env` stands in for the process environment. Configuration problems are
/// returned as errors; failed channels are reported and yield
/// [`EXIT_FAILURE`].
pub async fn run<F>(cli: &Cli, env: F) -> anyhow::Result<u8>
where
    F: Fn(&str) -> Option<String>,
{
    let (file, source) = match &cli.config {
        Some(path) => (ChannelsFile::load(path)?, path.display().to_string()),
        None => (ChannelsFile::from_lookup(&env)?, format!("${CHANNELS_ENV}")),
    };

    if cli.print_cron {
        let Some(cron) = &file.cron else {
            anyhow::bail!("no cron expression configured in {source}");
        };
        println!("{cron}");
        return Ok(EXIT_OK);
    }

    let settings = Settings::from_lookup(&env)?;
    let mode = cli.mode();

    print_banner(&BannerInfo {
        source: &source,
        channels: file.channels.len(),
        mode,
        dry_run: cli.dry_run,
    });

    let factory = Arc::new(LiveServices::new(settings).dry_run(cli.dry_run));
    let report = run_all(file.channels, mode, factory).await;
    print_summary(&report);

    Ok(if report.succeeded() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    })
}
