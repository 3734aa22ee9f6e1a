// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! `journey batch <url>...`: run several journeys concurrently.

use crate::cli::crawl_cmd::{close_journal, CrawlOptions};
use crate::cli::output;
use crate::journey::{JourneyRecorder, JourneySession};
use crate::live::{run_batch, BatchOutcome};
use crate::navigation::NavigationController;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Run the batch command.
pub async fn run(
    urls: &[String],
    options: &CrawlOptions,
    concurrency: usize,
    out_dir: Option<&Path>,
) -> Result<()> {
    if urls.is_empty() {
        bail!("no start URLs given");
    }
    let config = options.resolve_config()?;
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
    }

    let journal = options.open_journal()?;
    let mut controller = NavigationController::new(config)?;
    let handle = match journal {
        Some((bus, handle)) => {
            controller = controller.with_events(bus);
            Some(handle)
        }
        None => None,
    };

    let renderer: Arc<dyn Renderer> = Arc::new(
        ChromiumRenderer::new(options.headful)
            .await
            .context("failed to launch Chromium (run `journey doctor`)")?,
    );
    let outcomes = run_batch(
        Arc::clone(&renderer),
        Arc::new(controller),
        urls.to_vec(),
        concurrency,
    )
    .await;
    if let Err(e) = renderer.shutdown().await {
        warn!("shutting down renderer: {e}");
    }
    close_journal(handle).await;

    let mut failed = 0usize;
    let mut traces = Vec::new();
    for outcome in &outcomes {
        let session = match &outcome.result {
            Ok(session) => Some(session),
            Err(e) => {
                failed += 1;
                if !output::is_quiet() {
                    eprintln!("  [!!] {}: {e}", outcome.start_url);
                }
                e.partial_session()
            }
        };
        if let Some(session) = session {
            match out_dir {
                Some(dir) => {
                    let path = trace_path(dir, session);
                    JourneyRecorder::write_to(session, &path)
                        .with_context(|| format!("cannot write trace {}", path.display()))?;
                    if !output::is_json() {
                        output::print_session_summary(session);
                    }
                }
                None => traces.push(JourneyRecorder::record(session)),
            }
        }
    }

    if out_dir.is_none() {
        output::print_json(&serde_json::to_value(&traces)?);
    } else if output::is_json() {
        output::print_json(&batch_report(&outcomes));
    }

    if failed > 0 {
        bail!("{failed} of {} journeys failed", outcomes.len());
    }
    Ok(())
}

fn trace_path(dir: &Path, session: &JourneySession) -> PathBuf {
    dir.join(format!("journey_{}.json", session.id()))
}

fn batch_report(outcomes: &[BatchOutcome]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(session) => output::session_summary_json(session),
            Err(e) => serde_json::json!({
                "start_url": o.start_url,
                "error": e.to_string(),
            }),
        })
        .collect();
    serde_json::json!({ "journeys": entries })
}
