// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent batch runner.
//!
//! Every start URL gets its own browser context, and the controller builds
//! a fresh registry and graph per run, so sessions share nothing but the
//! renderer and the configuration.

use crate::error::{DriverError, JourneyError};
use crate::journey::JourneySession;
use crate::navigation::NavigationController;
use crate::renderer::Renderer;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Sessions running at once when the caller does not say.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Why one journey of a batch produced no session.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("could not open browser context: {0}")]
    Context(#[from] DriverError),

    #[error(transparent)]
    Journey(#[from] JourneyError),

    #[error("journey task failed: {0}")]
    Task(String),
}

impl BatchError {
    /// The partial session of a fatally aborted journey, if any.
    pub fn partial_session(&self) -> Option<&JourneySession> {
        match self {
            BatchError::Journey(e) => e.partial_session(),
            _ => None,
        }
    }
}

/// Result of one journey within a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub start_url: String,
    pub result: Result<JourneySession, BatchError>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one journey per start URL, at most `concurrency` at a time.
///
/// Outcomes come back in the order of `start_urls`. A failure in one
/// journey never affects the others.
pub async fn run_batch(
    renderer: Arc<dyn Renderer>,
    controller: Arc<NavigationController>,
    start_urls: Vec<String>,
    concurrency: usize,
) -> Vec<BatchOutcome> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    info!(
        "batch of {} journeys, {} at a time",
        start_urls.len(),
        concurrency.max(1)
    );

    let handles: Vec<_> = start_urls
        .iter()
        .cloned()
        .map(|url| {
            let renderer = Arc::clone(&renderer);
            let controller = Arc::clone(&controller);
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| BatchError::Task(e.to_string()))?;
                run_one(renderer.as_ref(), &controller, &url).await
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (start_url, handle) in start_urls.into_iter().zip(handles) {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(BatchError::Task(e.to_string())),
        };
        if let Err(e) = &result {
            warn!("journey from {start_url} failed: {e}");
        }
        outcomes.push(BatchOutcome { start_url, result });
    }
    outcomes
}

async fn run_one(
    renderer: &dyn Renderer,
    controller: &NavigationController,
    url: &str,
) -> Result<JourneySession, BatchError> {
    let mut ctx = renderer.new_context().await?;
    let result = controller.run(ctx.as_mut(), url).await;
    if let Err(e) = ctx.close().await {
        warn!("closing context for {url}: {e}");
    }
    Ok(result?)
}
