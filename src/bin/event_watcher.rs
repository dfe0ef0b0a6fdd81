//! Cluster-wide Event watcher running three concurrent reconciles

use tracing::info;

use builder_examples::config::ManagerConfig;
use builder_examples::controllers::ControllerOptions;
use builder_examples::manager::Manager;
use builder_examples::reconcilers::EventReconciler;
use builder_examples::telemetry;

/// Concurrent Event reconciles
const EVENT_WORKERS: u16 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    info!("Starting builder-examples cluster-wide event watcher");

    let config = ManagerConfig::cluster_wide().with_env_overrides()?;
    let mut manager = Manager::new(config).await?;

    let reconciler = EventReconciler::new(manager.client());
    manager.add_controller(
        reconciler,
        ControllerOptions::default().concurrency(EVENT_WORKERS),
    );

    manager.start().await?;

    info!("builder-examples cluster-wide event watcher stopped");
    Ok(())
}
