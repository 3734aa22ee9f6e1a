// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! `journey crawl <url>`: run one journey against a live browser.

use crate::audit::{spawn_journal, JournalLogger};
use crate::cli::output;
use crate::config::CrawlConfig;
use crate::error::JourneyError;
use crate::events::EventBus;
use crate::journey::{DirectorySink, JourneyRecorder, JourneySession};
use crate::navigation::NavigationController;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Options shared by `crawl` and `batch`.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub config: Option<PathBuf>,
    pub max_steps: Option<usize>,
    pub retries: Option<u32>,
    pub settle_timeout_ms: Option<u64>,
    pub navigation_timeout_ms: Option<u64>,
    pub step_delay_ms: Option<u64>,
    pub journal: Option<PathBuf>,
    pub headful: bool,
}

impl CrawlOptions {
    /// Defaults, then the config file, then `JOURNEY_*` env, then flags.
    pub fn resolve_config(&self) -> Result<CrawlConfig> {
        let mut config = CrawlConfig::load(self.config.as_deref())?;
        if let Some(v) = self.max_steps {
            config.max_steps = v;
        }
        if let Some(v) = self.retries {
            config.action_retry_bound = v;
        }
        if let Some(v) = self.settle_timeout_ms {
            config.settle_timeout_ms = v;
        }
        if let Some(v) = self.navigation_timeout_ms {
            config.navigation_timeout_ms = v;
        }
        if let Some(v) = self.step_delay_ms {
            config.step_delay_ms = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Open the journal, if requested, and wire it to a fresh event bus.
    pub fn open_journal(&self) -> Result<Option<(EventBus, JoinHandle<usize>)>> {
        let Some(path) = &self.journal else {
            return Ok(None);
        };
        let logger = JournalLogger::open(path)
            .with_context(|| format!("cannot open journal {}", path.display()))?;
        let bus = EventBus::default();
        let handle = spawn_journal(&bus, logger);
        Ok(Some((bus, handle)))
    }
}

/// Wait for the journal task after every bus sender has been dropped.
pub async fn close_journal(handle: Option<JoinHandle<usize>>) {
    if let Some(handle) = handle {
        match handle.await {
            Ok(n) => {
                if output::is_verbose() {
                    eprintln!("  journal: {n} events written");
                }
            }
            Err(e) => warn!("journal task failed: {e}"),
        }
    }
}

/// Run the crawl command.
pub async fn run(
    url: &str,
    options: &CrawlOptions,
    out: Option<&Path>,
    snapshots: Option<&Path>,
) -> Result<()> {
    let config = options.resolve_config()?;
    let journal = options.open_journal()?;

    let mut controller = NavigationController::new(config)?;
    if let Some(dir) = snapshots {
        let sink = DirectorySink::create(dir)
            .with_context(|| format!("cannot create snapshot directory {}", dir.display()))?;
        controller = controller.with_sink(Arc::new(sink));
    }
    let handle = match journal {
        Some((bus, handle)) => {
            controller = controller.with_events(bus);
            Some(handle)
        }
        None => None,
    };

    if !output::is_quiet() && !output::is_json() {
        eprintln!("Crawling {url}...");
    }

    let renderer = ChromiumRenderer::new(options.headful)
        .await
        .context("failed to launch Chromium (run `journey doctor`)")?;
    let mut ctx = renderer
        .new_context()
        .await
        .context("failed to open a browser context")?;

    let result = controller.run(ctx.as_mut(), url).await;

    if let Err(e) = ctx.close().await {
        warn!("closing context: {e}");
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("shutting down renderer: {e}");
    }
    drop(controller);
    close_journal(handle).await;

    match result {
        Ok(session) => {
            emit_trace(&session, out)?;
            Ok(())
        }
        Err(JourneyError::SessionFatal { reason, partial }) => {
            emit_trace(&partial, out)?;
            bail!("journey aborted: {reason}")
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the trace to `out`, or print it to stdout.
fn emit_trace(session: &JourneySession, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            JourneyRecorder::write_to(session, path)
                .with_context(|| format!("cannot write trace {}", path.display()))?;
            output::print_session_summary(session);
            if !output::is_quiet() && !output::is_json() {
                println!("  trace:       {}", path.display());
            }
        }
        None => {
            let json = JourneyRecorder::to_json_pretty(session)?;
            println!("{json}");
        }
    }
    Ok(())
}
