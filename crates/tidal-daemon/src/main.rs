//! tidal-daemon: runs a source and a destination ledger side by side.
//!
//! Single OS process running a Tokio async runtime. A keeper task drives the
//! source ledger on a fixed interval; a delivery task drains the in-memory
//! transport into the destination ledger. Every component event is
//! republished on the event bus.

mod config;
mod events;
mod node;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::events::{EventBus, Ledger};

/// Crates whose logs the configured level applies to.
const LOG_TARGETS: &[&str] = &[
    "tidal_daemon",
    "tidal_feed",
    "tidal_strategy",
    "tidal_oracle",
    "tidal_bridge",
    "tidal_transport",
];

/// Current ledger time in seconds.
fn ledger_now() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={}", config.advanced.log_level).parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Tidal daemon starting");

    // 3. Build ledgers
    let start = ledger_now();
    let (source, destination, mut inbox) = node::build(&config, start)?;
    info!(
        pools = source.pool_salts().len(),
        chain_id = config.destination.chain_id,
        "ledgers ready"
    );
    let source = Arc::new(Mutex::new(source));
    let destination = Arc::new(Mutex::new(destination));

    // 4. Create event bus
    let event_bus = EventBus::new(1000);
    {
        let mut initial = destination.lock().await;
        event_bus.publish(Ledger::Destination, start, initial.drain_events());
    }

    // 5. Event log task
    let mut subscriber = event_bus.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match subscriber.recv().await {
                Ok(bus_event) => match serde_json::to_string(&bus_event) {
                    Ok(json) => debug!(sequence = bus_event.sequence, %json, "event"),
                    Err(e) => warn!("event serialization failed: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event log lagging");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 6. Keeper task
    let keeper_source = source.clone();
    let keeper_bus = event_bus.clone();
    let interval = Duration::from_secs(config.source.tick_interval_secs);
    let keeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut rng = rand::rngs::StdRng::from_entropy();
        loop {
            ticker.tick().await;
            let now = ledger_now();
            let mut ledger = keeper_source.lock().await;
            ledger.drift_prices(now, &mut rng);
            let events = ledger.run_keeper(now);
            drop(ledger);
            keeper_bus.publish(Ledger::Source, now, events);
        }
    });

    // 7. Delivery task
    let delivery_destination = destination.clone();
    let delivery_bus = event_bus.clone();
    let delivery = tokio::spawn(async move {
        while let Some(received) = inbox.recv().await {
            let envelope = match received {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!("dropping malformed envelope: {}", e);
                    continue;
                }
            };
            let now = ledger_now();
            let mut ledger = delivery_destination.lock().await;
            match ledger.deliver(&envelope) {
                Ok(written) => debug!(written, "envelope delivered"),
                Err(e) => error!("delivery failed: {}", e),
            }
            let events = ledger.drain_events();
            drop(ledger);
            delivery_bus.publish(Ledger::Destination, now, events);
        }
        info!("transport closed");
    });

    // 8. Run until shutdown
    tokio::select! {
        result = keeper => {
            if let Err(e) = result {
                error!("keeper task failed: {}", e);
            }
        }
        result = delivery => {
            if let Err(e) = result {
                error!("delivery task failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    info!(events = event_bus.sequence(), "Daemon shutting down gracefully");
    event_log.abort();

    info!("Daemon stopped");
    Ok(())
}
