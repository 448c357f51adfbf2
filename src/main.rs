// VPN reconciliation one-shot binary

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use vpn_autopilot::{
    config::{self, load_config},
    engine::{Engine, Outcome},
    journal::Journal,
    network_observer::SystemNetworkObserver,
    probe::PingProbe,
    state_store::StateStore,
    trust_store::TrustStore,
    vpn_controller::CliVpnController,
};

const JOURNAL_FILE: &str = "vpn-autopilot.log";
const TRUST_FILE: &str = "trusted_networks";

#[derive(Parser)]
#[command(name = "vpn-autopilot")]
#[command(about = "Reconciles VPN tunnel state against the active network", long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    // One reconciliation pass per process; 2 workers cover the main task
    // plus the external command spawns
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("vpn-autopilot")
        .enable_time()
        .enable_io()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("vpn-autopilot: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::ControllerError) => ExitCode::from(1),
        Err(e) => {
            eprintln!("vpn-autopilot: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Outcome> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.general.log_level),
    )
    .init();

    let data_dir = config::data_dir(&config);
    log::debug!("Using data directory {}", data_dir.display());

    let general = &config.general;
    let observer = SystemNetworkObserver::new(general.command_timeout());
    let probe = PingProbe::new(
        general.ping_path.clone(),
        general.probe_address.clone(),
        general.command_timeout(),
    );
    let controller = CliVpnController::new(general.vpn_cli.clone(), general.command_timeout());
    let state = StateStore::new(data_dir.clone());
    let trust = TrustStore::new(data_dir.join(TRUST_FILE));

    let engine = Engine::new(
        observer,
        probe,
        controller,
        state,
        trust,
        general.reset_timeout(),
    );

    let mut journal = Journal::new(data_dir.join(JOURNAL_FILE));
    Ok(engine.reconcile(&mut journal).await)
}
