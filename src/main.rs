use anyhow::Context;
use clap::Parser;
use fleetsave::{
    FleetScheduler, OrchestratorConfig, RespConnector, SaveError,
    load_endpoints, run_rng, shuffle,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Disables automatic persistence on a set of Redis hosts, then runs BGSAVE
/// on them one at a time in a loop, waiting for each save to finish so that
/// only one instance is saving at any moment.
#[derive(Parser, Debug)]
#[command(name = "fleetsave", version)]
struct Args {
    /// File with redis addresses (host:port), one per line
    #[arg(long, env = "FLEETSAVE_FILE")]
    file: PathBuf,

    /// Exit after working for this long (at least 1m)
    #[arg(long, env = "FLEETSAVE_DEADLINE", default_value = "1h")]
    deadline: humantime::Duration,

    /// Delay between LASTSAVE reads while a save is running
    #[arg(long, default_value = "10s")]
    poll_interval: humantime::Duration,

    /// Delay between two passes over the fleet
    #[arg(long, default_value = "10s")]
    pass_delay: humantime::Duration,

    /// Give up on a save after this many polls (unbounded by default)
    #[arg(long)]
    max_polls: Option<u32>,

    /// Seed for the endpoint shuffle (clock-seeded when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the run summary as JSON on stdout at exit
    #[arg(long)]
    summary_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = OrchestratorConfig::new()
        .with_deadline(args.deadline.into())
        .poll_interval(args.poll_interval.into())
        .pass_delay(args.pass_delay.into())
        .max_polls(args.max_polls);

    let mut endpoints = load_endpoints(&args.file).context("load addresses")?;
    let mut rng = run_rng(args.seed);
    shuffle(&mut endpoints, &mut rng);

    let deadline = config.deadline;
    let connector = RespConnector::new(config.command_timeout);
    let mut scheduler =
        FleetScheduler::new(connector, endpoints, config).context("invalid configuration")?;

    let interrupt = scheduler.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, stopping");
            interrupt.cancel();
        }
    });

    info!(
        endpoints = scheduler.endpoints().len(),
        deadline = %humantime::format_duration(deadline),
        "starting"
    );
    let Err(stop) = scheduler.run().await;

    let stats = scheduler.into_stats();
    info!(
        passes = stats.passes_completed,
        saves = stats.total_saves(),
        failures = stats.total_failures(),
        "run finished"
    );
    if args.summary_json {
        println!("{}", stats.to_json().context("encode summary")?);
    }

    match stop {
        SaveError::DeadlineExceeded => {
            info!("deadline of {} reached", humantime::format_duration(deadline));
            Ok(())
        }
        SaveError::Cancelled => Ok(()),
        other => Err(other.into()),
    }
}
