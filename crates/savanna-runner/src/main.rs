//! Headless runner hosting one or more savanna sessions.

mod telemetry;
mod runner;

use anyhow::Result;
use savanna_core::{RunnerConfig, SpeciesDocument};
use savanna_world::{PluginLoader, SessionRegistry, SpeciesRegistry};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RunnerConfig::from_env()?;

    telemetry::init_telemetry(config.otel_endpoint.as_deref())?;

    info!(
        width = config.field.width,
        height = config.field.height,
        sessions = config.sessions,
        ticks = config.ticks,
        "Starting savanna runner"
    );

    let document = SpeciesDocument::load(&config.species_config_path)?;

    let mut species = SpeciesRegistry::new();
    let report = PluginLoader::new(&config.plugin_dir).load(&document, &mut species)?;
    for (manifest, reason) in &report.skipped {
        warn!(manifest = %manifest, reason = %reason, "Plugin not loaded");
    }
    for plugin in species.plugin_info() {
        info!(
            plugin = %plugin.name,
            symbol = %plugin.symbol,
            version = %plugin.version,
            "Plugin available"
        );
    }

    let sessions = Arc::new(SessionRegistry::new(config.field.clone(), Arc::new(species)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tick_interval = Duration::from_millis(config.tick_interval_ms);

    let mut handles = vec![];
    for _ in 0..config.sessions {
        let id = sessions.create()?;
        let placed = sessions
            .with_field(id, |field| runner::populate(field, config.initial_per_species))
            .transpose()?
            .unwrap_or(0);
        info!(session_id = %id, placed = placed, "Session populated");

        let sessions = sessions.clone();
        let shutdown = shutdown_rx.clone();
        let ticks = config.ticks;
        let handle = tokio::spawn(async move {
            match runner::run_session(sessions, id, ticks, tick_interval, shutdown).await {
                Ok(stats) => runner::log_summary(id, &stats),
                Err(e) => error!(session_id = %id, "Session failed: {}", e),
            }
        });
        handles.push(handle);
    }

    let all_sessions = futures::future::join_all(handles);
    tokio::pin!(all_sessions);

    tokio::select! {
        _ = &mut all_sessions => {
            info!("All sessions completed");
        }
        _ = shutdown_signal() => {
            info!("Shutting down sessions");
            let _ = shutdown_tx.send(true);

            let timeout = tokio::time::sleep(Duration::from_secs(30));
            tokio::pin!(timeout);

            tokio::select! {
                _ = &mut all_sessions => {
                    info!("All sessions stopped");
                }
                _ = &mut timeout => {
                    warn!("Shutdown timeout reached");
                }
            }
        }
    }

    telemetry::shutdown_telemetry();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
