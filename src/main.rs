//! Binary entry point: flags, logging, wiring, exit codes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lvs_ramp::config::{self, Settings};
use lvs_ramp::lifecycle::{self, Shutdown};
use lvs_ramp::lvs::{codec, LvsStore};
use lvs_ramp::membership::{KubeMembership, MembershipClient};
use lvs_ramp::ramp::{RampController, RampRegistry};
use lvs_ramp::reconciler::Reconciler;

/// Command-line flags. Everything else comes from the settings file.
#[derive(Debug, Parser)]
#[command(name = "lvs-ramp", about = "Ramps labeled pods into an LVS config gradually")]
struct Flags {
    /// Path to the settings file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Path to a kubeconfig file; the ambient environment is used when absent.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lvs_ramp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run(Flags::parse()).await {
        tracing::error!(%error, "fatal");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(flags: Flags) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("lvs-ramp starting");

    let settings: Settings = config::load_settings(&flags.config)?;
    tracing::info!(
        config_path = %settings.config_path.display(),
        selector = %settings.label,
        namespace = %settings.namespace,
        destination_port = settings.destination_port,
        step_secs = settings.sleep_secs,
        "settings loaded"
    );

    let membership: Arc<dyn MembershipClient> =
        Arc::new(KubeMembership::connect(flags.kubeconfig.as_deref()).await?);

    let table = codec::load(
        &settings.config_path,
        membership.as_ref(),
        &settings.namespace,
    )
    .await?;
    tracing::info!(services = table.len(), "base config loaded");
    let store = Arc::new(LvsStore::new(settings.config_path.clone(), table));

    let shutdown = Arc::new(Shutdown::new());
    lifecycle::listen_for_interrupt(Arc::clone(&shutdown));

    let registry = Arc::new(RampRegistry::new());
    let ramps = Arc::new(RampController::new(
        Arc::clone(&membership),
        Arc::clone(&store),
        Arc::clone(&registry),
        &settings,
    ));
    let reconciler = Reconciler::new(
        membership,
        store,
        ramps,
        Arc::clone(&registry),
        Arc::clone(&shutdown),
        &settings,
    );

    reconciler.run().await?;

    // Interrupt path: stop whatever ramps the broadcast missed.
    registry.cancel_all();
    tracing::info!("shutdown complete");
    Ok(())
}
