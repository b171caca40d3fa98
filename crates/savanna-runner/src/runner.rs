//! Session tick loops.

use anyhow::{anyhow, Result};
use savanna_core::SessionId;
use savanna_world::{Field, FieldStats, SessionRegistry};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Scatter `per_species` entities of every registered species over the field.
/// Returns how many were placed.
pub fn populate(field: &mut Field, per_species: usize) -> Result<usize> {
    let symbols = field.registry().available_symbols();
    let mut placed = 0;

    for symbol in symbols {
        for _ in 0..per_species {
            if field.add_entity_randomly(symbol)?.is_some() {
                placed += 1;
            }
        }
    }

    debug!(placed = placed, "Field populated");
    Ok(placed)
}

/// Advance one session every `tick_interval` until `ticks` have run, the
/// population dies out, or shutdown is signalled.
#[instrument(skip(sessions, shutdown), fields(session_id = %id))]
pub async fn run_session(
    sessions: Arc<SessionRegistry>,
    id: SessionId,
    ticks: u64,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<FieldStats> {
    let mut ticker = interval(tick_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stats = sessions
        .stats(id)
        .ok_or_else(|| anyhow!("session {} not found", id))?;

    while stats.tick < ticks {
        tokio::select! {
            biased;
            Ok(()) = shutdown.changed() => {
                info!(tick = stats.tick, "Shutdown requested, stopping session");
                break;
            }
            _ = ticker.tick() => {}
        }

        stats = sessions
            .with_field(id, |field| {
                field.update();
                field.stats()
            })
            .ok_or_else(|| anyhow!("session {} was removed while running", id))?;

        if stats.total_population() == 0 {
            warn!(tick = stats.tick, "Population extinct, stopping session");
            break;
        }
    }

    Ok(stats)
}

pub fn log_summary(id: SessionId, stats: &FieldStats) {
    info!(
        event = "session_summary",
        session_id = %id,
        final_tick = stats.tick,
        total_population = stats.total_population(),
        population = ?stats.population,
        births = stats.births,
        deaths = stats.deaths,
        catches = stats.catches,
        "Session complete"
    );

    crate::record_gauge!("final_population", stats.total_population(), tick = stats.tick);
    crate::record_counter!("births_total", stats.births);
    crate::record_counter!("catches_total", stats.catches);
}
