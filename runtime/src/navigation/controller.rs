// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Navigation controller: the crawl loop.
//!
//! ```text
//! Arriving -> Scoring -> Acting -> Verifying -> Recording -> Arriving
//!                |         ^  |        |            |
//!                |         +--+--------+            +--> Terminated
//!                +--------------------------------------^
//! ```
//!
//! Every driver failure except a closed context is absorbed here and shows
//! up in the trace. A closed context aborts with
//! [`JourneyError::SessionFatal`], carrying what was recorded so far.

use super::act::{click_with_retry, navigate_with_retry, outcome_for, RetryPolicy};
use super::guard::{normalize_url, state_fingerprint, LoopGuard};
use crate::config::CrawlConfig;
use crate::discovery::dom::VIDEO_STATE_SCRIPT;
use crate::discovery::DiscoveryEngine;
use crate::error::{DriverError, JourneyError};
use crate::events::{now_timestamp, EventBus, JourneyEvent};
use crate::journey::{
    ActionAttempt, ActionOutcome, ArtifactKind, DiscardSink, JourneySession, JourneyStep,
    PageSnapshot, SnapshotSink, TerminationReason, VetoReason, VideoState,
};
use crate::renderer::{with_timeout, RenderContext};
use crate::scoring::{CandidateScorer, InteractiveCandidate};
use chrono::{DateTime, Utc};
use fnv::{FnvHashSet, FnvHasher};
use std::hash::Hasher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Condition polled after every click.
pub const SETTLE_CONDITION: &str = "document.readyState === 'complete'";

/// Extra time the outer timeout grants a call that has its own deadline.
const DEADLINE_SLACK_MS: u64 = 1_000;

/// Runs journeys with one configuration.
pub struct NavigationController {
    config: CrawlConfig,
    scorer: CandidateScorer,
    sink: Arc<dyn SnapshotSink>,
    events: Option<EventBus>,
}

impl NavigationController {
    /// Validate `config` and build a controller that discards snapshots.
    pub fn new(config: CrawlConfig) -> Result<Self, JourneyError> {
        config.validate()?;
        Ok(Self {
            scorer: config.scorer(),
            config,
            sink: Arc::new(DiscardSink),
            events: None,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl from `start_url` until a terminal condition.
    ///
    /// Always returns a finished session unless the browser context itself
    /// is lost.
    pub async fn run(
        &self,
        ctx: &mut dyn RenderContext,
        start_url: &str,
    ) -> Result<JourneySession, JourneyError> {
        let discovery = DiscoveryEngine::new(&self.config.known_provider_patterns)
            .map_err(|e| JourneyError::Config(format!("invalid provider pattern: {e}")))?;
        let session = JourneySession::new(start_url, discovery.registry().clone());
        let session_id = session.id().to_string();
        info!("journey {session_id} starting at {start_url}");
        self.emit(JourneyEvent::SessionStarted {
            session_id: session_id.clone(),
            start_url: start_url.to_string(),
            timestamp: now_timestamp(),
        });

        let mut run = Run {
            ctl: self,
            ctx,
            guard: LoopGuard::new(self.config.max_steps),
            discovery,
            session,
            session_id,
        };
        let outcome = run.drive(start_url).await;
        run.discovery.detach();
        let parse_errors = run.discovery.parse_errors();
        let mut session = run.session;

        match outcome {
            Ok(reason) => {
                session.finish(reason, parse_errors);
                self.emit_terminated(&session, reason);
                info!(
                    "journey {} finished: {} after {} steps, {} resources",
                    session.id(),
                    reason.label(),
                    session.steps().len(),
                    session.registry().len()
                );
                Ok(session)
            }
            Err(Fatal(reason)) => {
                session.finish(TerminationReason::SessionFatal, parse_errors);
                self.emit_terminated(&session, TerminationReason::SessionFatal);
                warn!("journey {} aborted: {reason}", session.id());
                Err(JourneyError::SessionFatal {
                    reason,
                    partial: Box::new(session),
                })
            }
        }
    }

    fn emit(&self, event: JourneyEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }

    fn emit_terminated(&self, session: &JourneySession, reason: TerminationReason) {
        self.emit(JourneyEvent::SessionTerminated {
            session_id: session.id().to_string(),
            reason: reason.label().to_string(),
            steps: session.steps().len(),
            resources: session.registry().len(),
            edges: session.graph().edge_count(),
        });
    }

    fn retry(&self, timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.action_retry_bound,
            timeout_ms,
        }
    }
}

/// The browser context is gone.
struct Fatal(String);

/// How the next arrival reaches its page.
enum Arrival {
    /// Load this URL first.
    Navigate(String),
    /// The browser is already showing this URL.
    At(String),
}

enum Phase {
    Arriving(Arrival),
    Scoring(Box<StepDraft>),
    Acting(Box<StepDraft>),
    Verifying(Box<StepDraft>, usize),
    Recording(Box<StepDraft>, Option<TerminationReason>),
    Terminated(TerminationReason),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Arriving(_) => "arriving",
            Phase::Scoring(_) => "scoring",
            Phase::Acting(_) => "acting",
            Phase::Verifying(..) => "verifying",
            Phase::Recording(..) => "recording",
            Phase::Terminated(_) => "terminated",
        }
    }
}

/// A step under construction.
struct StepDraft {
    index: usize,
    url: String,
    title: Option<String>,
    video: Option<VideoState>,
    snapshot: PageSnapshot,
    candidates: Vec<InteractiveCandidate>,
    signatures: FnvHashSet<String>,
    cursor: usize,
    attempts: Vec<ActionAttempt>,
    chosen: Option<InteractiveCandidate>,
    state_changed: bool,
    landed_url: Option<String>,
    new_resources: Vec<String>,
    last_veto: Option<VetoReason>,
    timestamp: DateTime<Utc>,
    started: Instant,
}

impl StepDraft {
    fn add_resources(&mut self, ids: Vec<String>) {
        for id in ids {
            if !self.new_resources.contains(&id) {
                self.new_resources.push(id);
            }
        }
    }

    fn into_step(self) -> JourneyStep {
        JourneyStep {
            index: self.index,
            url: self.url,
            title: self.title,
            candidates: self.candidates,
            chosen: self.chosen,
            state_changed: self.state_changed,
            landed_url: self.landed_url,
            attempts: self.attempts,
            new_resources: self.new_resources,
            video: self.video,
            snapshot: self.snapshot,
            timestamp: self.timestamp,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// State of one running journey.
struct Run<'a> {
    ctl: &'a NavigationController,
    ctx: &'a mut dyn RenderContext,
    guard: LoopGuard,
    discovery: DiscoveryEngine,
    session: JourneySession,
    session_id: String,
}

impl Run<'_> {
    async fn drive(&mut self, start_url: &str) -> Result<TerminationReason, Fatal> {
        if let Err(e) = self.discovery.attach(&mut *self.ctx).await {
            if e.is_fatal() {
                return Err(Fatal(format!("attach network listener: {e}")));
            }
            warn!("network discovery unavailable: {e}");
        }

        let mut phase = Phase::Arriving(Arrival::Navigate(start_url.to_string()));
        loop {
            debug!("journey {} -> {}", self.session_id, phase.name());
            phase = match phase {
                Phase::Arriving(arrival) => match self.arrive(arrival).await? {
                    Some(draft) => Phase::Scoring(Box::new(draft)),
                    None => Phase::Terminated(TerminationReason::NavigationFailed),
                },
                Phase::Scoring(draft) => self.score(draft).await?,
                Phase::Acting(draft) => self.act(draft).await?,
                Phase::Verifying(draft, rank) => self.verify(draft, rank).await?,
                Phase::Recording(draft, termination) => self.record(*draft, termination),
                Phase::Terminated(reason) => return Ok(reason),
            };
        }
    }

    async fn arrive(&mut self, arrival: Arrival) -> Result<Option<StepDraft>, Fatal> {
        let index = self.session.steps().len();
        let ctl = self.ctl;
        let cfg = &ctl.config;
        if index > 0 && cfg.step_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(cfg.step_delay_ms)).await;
        }
        let started = Instant::now();
        let timestamp = Utc::now();

        let url = match arrival {
            Arrival::Navigate(target) => {
                self.discovery.begin_step(index, &target);
                let policy = ctl.retry(cfg.navigation_timeout_ms);
                match navigate_with_retry(&mut *self.ctx, &target, policy).await {
                    Ok(nav) => {
                        debug!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);
                        let current = self.read_url().await?;
                        current.unwrap_or(nav.final_url)
                    }
                    Err(e) if e.is_fatal() => return Err(Fatal(format!("navigate {target}: {e}"))),
                    Err(e) => {
                        warn!("navigation to {target} failed: {e}");
                        return Ok(None);
                    }
                }
            }
            Arrival::At(url) => url,
        };

        self.guard.mark_visited(&url);
        self.discovery.begin_step(index, &url);

        let timeout = cfg.action_timeout_ms;
        let title = absorb("title", with_timeout("title", timeout, self.ctx.title()).await)?;
        let html = absorb("content", with_timeout("content", timeout, self.ctx.get_html()).await)?;
        let png = absorb(
            "screenshot",
            with_timeout("screenshot", timeout, self.ctx.screenshot()).await,
        )?;
        let snapshot = self.store_snapshot(index, html, png);
        let video = absorb(
            "video state",
            with_timeout("video state", timeout, self.ctx.execute_js(VIDEO_STATE_SCRIPT)).await,
        )?
        .and_then(|v| serde_json::from_value::<VideoState>(v).ok());
        let found = absorb(
            "media scan",
            self.discovery.scan_dom(&*self.ctx, index, &url, timeout).await,
        )?
        .unwrap_or_default();

        let mut draft = StepDraft {
            index,
            url,
            title: title.filter(|t| !t.is_empty()),
            video,
            snapshot,
            candidates: Vec::new(),
            signatures: FnvHashSet::default(),
            cursor: 0,
            attempts: Vec::new(),
            chosen: None,
            state_changed: false,
            landed_url: None,
            new_resources: Vec::new(),
            last_veto: None,
            timestamp,
            started,
        };
        draft.add_resources(found);
        // Responses from the load belong to the arrival, not to the next click.
        draft.add_resources(self.discovery.drain_network());
        Ok(Some(draft))
    }

    async fn score(&mut self, mut draft: Box<StepDraft>) -> Result<Phase, Fatal> {
        draft.candidates = self.query_candidates().await?;
        draft.signatures = draft.candidates.iter().map(|c| c.signature()).collect();
        let signatures: Vec<&str> = draft.signatures.iter().map(String::as_str).collect();
        self.guard
            .remember_state(state_fingerprint(&draft.url, &signatures));

        debug!(
            "step {} at {}: {} candidates",
            draft.index,
            draft.url,
            draft.candidates.len()
        );
        if draft.candidates.is_empty() {
            return Ok(Phase::Recording(draft, Some(TerminationReason::DeadEnd)));
        }
        if self.guard.is_last_step(draft.index) {
            return Ok(Phase::Recording(draft, Some(TerminationReason::StepBudget)));
        }
        Ok(Phase::Acting(draft))
    }

    async fn act(&mut self, mut draft: Box<StepDraft>) -> Result<Phase, Fatal> {
        let rank = draft.cursor;
        let Some(candidate) = draft.candidates.get(rank).cloned() else {
            let reason = match draft.last_veto {
                Some(veto) => TerminationReason::GuardVeto(veto),
                None => TerminationReason::DeadEnd,
            };
            return Ok(Phase::Recording(draft, Some(reason)));
        };
        draft.cursor += 1;

        if let Some(target) = candidate
            .href
            .as_deref()
            .and_then(|href| resolve_href(&draft.url, href))
        {
            if self.guard.check_transition(&draft.url, &target).is_err() {
                draft.last_veto = Some(VetoReason::RevisitedUrl);
                self.attempt(
                    &mut draft,
                    rank,
                    &candidate,
                    ActionOutcome::Vetoed,
                    Some(format!("{target} already visited")),
                );
                return Ok(Phase::Acting(draft));
            }
        }

        let Some(handle) = candidate.handle.as_ref() else {
            self.attempt(
                &mut draft,
                rank,
                &candidate,
                ActionOutcome::DriverFailed,
                Some("no element handle".into()),
            );
            return Ok(Phase::Acting(draft));
        };

        let policy = self.ctl.retry(self.ctl.config.action_timeout_ms);
        match click_with_retry(&mut *self.ctx, handle, policy).await {
            Ok(()) => Ok(Phase::Verifying(draft, rank)),
            Err(e) if e.is_fatal() => Err(Fatal(format!("click: {e}"))),
            Err(e) => {
                self.attempt(&mut draft, rank, &candidate, outcome_for(&e), Some(e.to_string()));
                Ok(Phase::Acting(draft))
            }
        }
    }

    async fn verify(&mut self, mut draft: Box<StepDraft>, rank: usize) -> Result<Phase, Fatal> {
        let cfg = &self.ctl.config;
        let action_timeout = cfg.action_timeout_ms;
        let candidate = draft.candidates[rank].clone();

        // readyState is already complete on the old document when the click
        // returns, so navigations and reveals get a quiet period first.
        let settle = cfg.settle_timeout_ms;
        let quiet = cfg.min_settle_ms.min(settle);
        if quiet > 0 {
            tokio::time::sleep(Duration::from_millis(quiet)).await;
        }
        let remaining = (settle - quiet).max(1);
        let settled = absorb(
            "settle",
            with_timeout(
                "settle",
                remaining.saturating_add(DEADLINE_SLACK_MS),
                self.ctx.wait_for(SETTLE_CONDITION, remaining),
            )
            .await,
        )?;
        if settled == Some(false) {
            debug!("page did not settle within {settle}ms");
        }

        let after = self.read_url().await?.unwrap_or_else(|| draft.url.clone());
        if normalize_url(&after) != normalize_url(&draft.url) {
            draft.add_resources(self.discovery.drain_network());
            draft.chosen = Some(candidate.clone());
            draft.state_changed = true;
            draft.landed_url = Some(after.clone());
            return Ok(match self.guard.check_transition(&draft.url, &after) {
                Ok(()) => {
                    self.attempt(&mut draft, rank, &candidate, ActionOutcome::Changed, None);
                    Phase::Recording(draft, None)
                }
                Err(veto) => {
                    self.attempt(
                        &mut draft,
                        rank,
                        &candidate,
                        ActionOutcome::Vetoed,
                        Some(format!("landed on visited {after}")),
                    );
                    Phase::Recording(draft, Some(TerminationReason::GuardVeto(veto)))
                }
            });
        }

        // Same URL: look for new resources or new candidates.
        let mut fresh = self.discovery.drain_network();
        let scanned = absorb(
            "media scan",
            self.discovery
                .scan_dom(&*self.ctx, draft.index, &draft.url, action_timeout)
                .await,
        )?
        .unwrap_or_default();
        fresh.extend(scanned);
        let found_resources = !fresh.is_empty();
        draft.add_resources(fresh);

        let after_candidates = self.query_candidates().await?;
        let after_signatures: Vec<String> = after_candidates.iter().map(|c| c.signature()).collect();
        let new_candidates = after_signatures
            .iter()
            .any(|s| !draft.signatures.contains(s));

        if !found_resources && !new_candidates {
            self.attempt(&mut draft, rank, &candidate, ActionOutcome::NoEffect, None);
            return Ok(Phase::Acting(draft));
        }

        let fingerprint = state_fingerprint(&draft.url, &after_signatures);
        if !self.guard.remember_state(fingerprint) && !found_resources {
            draft.last_veto = Some(VetoReason::RepeatedState);
            self.attempt(
                &mut draft,
                rank,
                &candidate,
                ActionOutcome::Vetoed,
                Some("page state already seen".into()),
            );
            return Ok(Phase::Acting(draft));
        }

        self.attempt(&mut draft, rank, &candidate, ActionOutcome::Changed, None);
        draft.chosen = Some(candidate);
        draft.state_changed = true;
        Ok(Phase::Recording(draft, None))
    }

    fn record(&mut self, mut draft: StepDraft, termination: Option<TerminationReason>) -> Phase {
        draft.add_resources(self.discovery.drain_network());
        let step = draft.into_step();
        let from = step.url.clone();
        let landed = step.landed_url.clone();

        if termination.is_none() {
            if let Some(to) = &landed {
                self.session.add_edge(&from, to);
            }
        }

        info!(
            "step {} at {}: {} candidates, chosen {:?}, {} new resources",
            step.index,
            step.url,
            step.candidates.len(),
            step.chosen.as_ref().map(|c| c.text.as_str()),
            step.new_resources.len()
        );
        self.ctl.emit(JourneyEvent::StepCommitted {
            session_id: self.session_id.clone(),
            index: step.index,
            url: step.url.clone(),
            candidates: step.candidates.len(),
            chosen: step.chosen.as_ref().map(|c| c.text.clone()),
            state_changed: step.state_changed,
            landed_url: step.landed_url.clone(),
            elapsed_ms: step.elapsed_ms,
        });
        for id in &step.new_resources {
            if let Some(resource) = self.discovery.registry().get(id) {
                self.ctl.emit(JourneyEvent::ResourceDiscovered {
                    session_id: self.session_id.clone(),
                    canonical_id: resource.canonical_id,
                    provider: resource.provider.to_string(),
                    channel: resource.channel.as_str().to_string(),
                    step: step.index,
                });
            }
        }
        self.session.push_step(step);

        if let Some(reason) = termination {
            return Phase::Terminated(reason);
        }
        if self.guard.remaining(self.session.steps().len()) == 0 {
            return Phase::Terminated(TerminationReason::StepBudget);
        }
        Phase::Arriving(Arrival::At(landed.unwrap_or(from)))
    }

    async fn query_candidates(&self) -> Result<Vec<InteractiveCandidate>, Fatal> {
        let cfg = &self.ctl.config;
        let raw = absorb(
            "query candidates",
            with_timeout(
                "query candidates",
                cfg.action_timeout_ms,
                self.ctx.query_interactive(&cfg.selector_tiers),
            )
            .await,
        )?;
        Ok(raw.map(|r| self.ctl.scorer.rank(r)).unwrap_or_default())
    }

    async fn read_url(&self) -> Result<Option<String>, Fatal> {
        let timeout = self.ctl.config.action_timeout_ms;
        absorb(
            "current url",
            with_timeout("current url", timeout, self.ctx.current_url()).await,
        )
    }

    fn store_snapshot(&self, index: usize, html: Option<String>, png: Option<Vec<u8>>) -> PageSnapshot {
        let mut snapshot = PageSnapshot::default();
        if let Some(html) = html {
            let mut hasher = FnvHasher::default();
            hasher.write(html.as_bytes());
            snapshot.html_fingerprint = Some(format!("{:016x}", hasher.finish()));
            snapshot.html_bytes = html.len();
            snapshot.html_ref = self.store_artifact(index, ArtifactKind::Html, html.as_bytes());
        }
        if let Some(png) = png {
            snapshot.screenshot_bytes = png.len();
            snapshot.screenshot_ref = self.store_artifact(index, ArtifactKind::Screenshot, &png);
        }
        snapshot
    }

    fn store_artifact(&self, index: usize, kind: ArtifactKind, bytes: &[u8]) -> Option<String> {
        match self.ctl.sink.store(index, kind, bytes) {
            Ok(reference) => reference,
            Err(e) => {
                warn!("could not store {} snapshot for step {index}: {e}", kind.extension());
                None
            }
        }
    }

    fn attempt(
        &self,
        draft: &mut StepDraft,
        rank: usize,
        candidate: &InteractiveCandidate,
        outcome: ActionOutcome,
        detail: Option<String>,
    ) {
        if outcome.is_failure() {
            warn!(
                "step {} candidate #{rank} {:?}: {}{}",
                draft.index,
                candidate.text,
                outcome.as_str(),
                detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
            );
            self.ctl.emit(JourneyEvent::ActionFailed {
                session_id: self.session_id.clone(),
                step: draft.index,
                rank,
                outcome: outcome.as_str().to_string(),
                detail: detail.clone(),
            });
        }
        draft.attempts.push(ActionAttempt {
            rank,
            text: candidate.text.clone(),
            href: candidate.href.clone(),
            outcome,
            detail,
        });
    }
}

/// Log and drop a recoverable driver error; escalate a closed context.
fn absorb<T>(op: &str, result: Result<T, DriverError>) -> Result<Option<T>, Fatal> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(Fatal(format!("{op}: {e}"))),
        Err(e) => {
            warn!("{op} failed: {e}");
            Ok(None)
        }
    }
}

/// Resolve a candidate href against the page URL. Only http(s) targets
/// count as destinations.
fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(page_url).ok()?;
    let target = base.join(href.trim()).ok()?;
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}
