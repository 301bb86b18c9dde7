use tokio_util::sync::CancellationToken;

use gympulse::config::Settings;
use gympulse::logger;
use gympulse::state::AppState;
use gympulse::store::Stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    logger::init(&settings.log.level)?;
    tracing::info!("starting gympulse");

    let stores = Stores::in_memory();
    let state = AppState::new(stores, &settings);

    // Repair pass: assignment sets are derived data and may be stale
    // after a crash between a trigger and its sync.
    state.assignments.sync_all_branches().await?;

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(state.reminders.clone().run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    shutdown.cancel();
    scheduler_task.await?;
    Ok(())
}
