// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Event journaling.

pub mod logger;

pub use logger::JournalLogger;

use crate::events::EventBus;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

/// Write every event from `bus` to `logger` until all senders are gone.
///
/// Resolves to the number of events written.
pub fn spawn_journal(bus: &EventBus, mut logger: JournalLogger) -> JoinHandle<usize> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        let mut written = 0usize;
        loop {
            match rx.recv().await {
                Ok(event) => match logger.log(&event) {
                    Ok(()) => written += 1,
                    Err(e) => warn!("journal write failed: {e:#}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("journal lagged, {skipped} events skipped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        if let Err(e) = logger.flush() {
            warn!("journal flush failed: {e:#}");
        }
        written
    })
}
