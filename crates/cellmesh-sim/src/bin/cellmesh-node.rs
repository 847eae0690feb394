//! Cellmesh Node binary
//!
//! Runs the cell allocation controller against a simulated link.
//!
//! The scenario is read from the file named by `CELLMESH_SCENARIO`; without
//! it a built-in parent-switch scenario is played. Controller settings from
//! `CELLMESH_*` variables override the scenario's.

use std::time::Duration;

use cellmesh_sim::Scenario;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cellmesh_node=info,cellmesh_control=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut scenario = match std::env::var("CELLMESH_SCENARIO") {
        Ok(path) => {
            tracing::info!("Loading scenario from {}", path);
            Scenario::load(&path)?
        }
        Err(_) => Scenario::parent_switch(),
    };
    scenario.controller = scenario.controller.overlay_env()?;

    tracing::info!("Starting Cellmesh Node");
    tracing::info!("  Node: {}", scenario.node_id);
    tracing::info!("  Coordinator: {}", scenario.is_coordinator());
    tracing::info!("  Max links: {}", scenario.controller.max_links);
    tracing::info!("  Duration: {} s", scenario.duration_secs);

    let mut service = scenario.build()?;
    let duration = Duration::from_secs(scenario.duration_secs);
    let last_change = service.routing().last_change_secs();
    if last_change >= scenario.duration_secs {
        tracing::warn!(
            last_change,
            duration = scenario.duration_secs,
            "Scenario ends before its last routing change"
        );
    }

    service
        .run_until(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
                _ = tokio::time::sleep(duration) => tracing::info!("Scenario complete"),
            }
        })
        .await;

    let stats = service.stats();
    let upstream = service.controller().upstream();
    tracing::info!(
        upstream = %upstream,
        requests = stats.requests(),
        "Final stats: {}",
        serde_json::to_string(&stats)?
    );
    if !scenario.is_coordinator() && !upstream.has_neighbor() {
        tracing::warn!("Ended without an upstream neighbor");
    } else if let Some(neighbor) = upstream.neighbor() {
        tracing::info!(%neighbor, "Ended attached to upstream neighbor");
    }

    Ok(())
}
