use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use tokio::signal;
use tracing::{error, info};

static IS_RUNNING: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(true));

/// Asks the block loop to stop after the block in flight.
pub fn initiate_shutdown() {
    if IS_RUNNING.swap(false, Ordering::SeqCst) {
        info!("Shutdown requested, finishing the block in flight...");
    }
}

pub fn is_running() -> bool {
    IS_RUNNING.load(Ordering::SeqCst)
}

/// Spawns a task that turns the first ctrl-c into a graceful shutdown.
pub fn shutdown_on_ctrl_c() {
    tokio::spawn(async {
        match signal::ctrl_c().await {
            Ok(()) => initiate_shutdown(),
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
    });
}
