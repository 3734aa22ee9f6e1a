// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end journeys against a scripted site.

mod common;

use common::{assert_graph_consistent, url, Effect, FakeElement, FakePage, FakeRenderer, FakeSite};
use journey_runtime::discovery::{DiscoveryChannel, ProviderKind};
use journey_runtime::events::{EventBus, JourneyEvent};
use journey_runtime::journey::{ActionOutcome, DirectorySink, TerminationReason, VetoReason};
use journey_runtime::live::{run_batch, BatchError};
use journey_runtime::renderer::RenderContext;
use journey_runtime::scoring::{SelectorTier, TierScores};
use journey_runtime::{CrawlConfig, JourneyError, JourneySession, NavigationController};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn controller(max_steps: usize) -> NavigationController {
    NavigationController::new(CrawlConfig {
        max_steps,
        settle_timeout_ms: 200,
        min_settle_ms: 0,
        ..Default::default()
    })
    .unwrap()
}

async fn crawl(site: &FakeSite, start: &str, max_steps: usize) -> JourneySession {
    let mut ctx = site.context();
    controller(max_steps).run(&mut ctx, &url(start)).await.unwrap()
}

/// Page A offers a shaped "continue" link and a generic button.
fn two_page_site() -> FakeSite {
    FakeSite::new()
        .page(
            "/a",
            FakePage::new("A")
                .with(FakeElement::button("Menu", Effect::Nothing))
                .with(FakeElement::link("Continuar", "/continue/b").tier(SelectorTier::Primary)),
        )
        .page("/continue/b", FakePage::new("B"))
}

#[tokio::test]
async fn test_shaped_link_leads_to_dead_end_in_two_steps() {
    let session = crawl(&two_page_site(), "/a", 25).await;

    assert_eq!(session.termination(), Some(TerminationReason::DeadEnd));
    assert_eq!(session.steps().len(), 2);

    let first = &session.steps()[0];
    assert_eq!(first.url, url("/a"));
    assert_eq!(first.candidates[0].text, "Continuar");
    assert_eq!(first.candidates[1].text, "Menu");
    assert_eq!(first.chosen.as_ref().map(|c| c.text.as_str()), Some("Continuar"));
    assert!(first.state_changed);
    assert_eq!(first.landed_url.as_deref(), Some(url("/continue/b").as_str()));
    assert_eq!(first.title.as_deref(), Some("A"));

    let second = &session.steps()[1];
    assert_eq!(second.url, url("/continue/b"));
    assert!(second.candidates.is_empty());
    assert!(second.chosen.is_none());

    assert!(session.graph().contains_edge(&url("/a"), &url("/continue/b")));
    assert_eq!(session.graph().edge_count(), 1);
    assert!(session.registry().is_empty());
    assert_graph_consistent(&session);
}

#[tokio::test]
async fn test_resource_seen_on_both_channels_is_stored_once() {
    let site = FakeSite::new().page(
        "/watch",
        FakePage::new("Watch")
            .fetch("https://player.vimeo.com/video/383005433/config")
            .embed("https://player.vimeo.com/video/383005433"),
    );
    let session = crawl(&site, "/watch", 25).await;

    let resources = session.resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].canonical_id, "383005433");
    assert_eq!(resources[0].provider, ProviderKind::Vimeo);
    // The network response fires while the page loads, before the DOM scan.
    assert_eq!(resources[0].channel, DiscoveryChannel::Network);
    assert_eq!(resources[0].first_seen_step, 0);
    assert_eq!(session.steps()[0].new_resources, vec!["383005433".to_string()]);
}

#[tokio::test]
async fn test_dom_only_resource_keeps_dom_channel() {
    let site = FakeSite::new().page(
        "/watch",
        FakePage::new("Watch").embed("https://www.youtube.com/embed/dQw4w9WgXcQ"),
    );
    let session = crawl(&site, "/watch", 25).await;

    let resources = session.resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].channel, DiscoveryChannel::Dom);
    assert_eq!(resources[0].provider, ProviderKind::Youtube);
    assert_eq!(
        session.steps()[0].video.as_ref().map(|v| v.has_embedded_player),
        Some(true)
    );
}

#[tokio::test]
async fn test_step_budget_bounds_every_run() {
    let site = FakeSite::chain(10);
    for max_steps in 1..=5 {
        let session = crawl(&site, "/p0", max_steps).await;
        assert_eq!(session.steps().len(), max_steps);
        assert_eq!(session.termination(), Some(TerminationReason::StepBudget));
        assert_eq!(session.graph().edge_count(), max_steps - 1);
        assert!(session.steps().last().unwrap().chosen.is_none());
        assert_graph_consistent(&session);
    }
}

#[tokio::test]
async fn test_link_back_to_visited_page_is_vetoed_before_clicking() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A").with(FakeElement::link("Continuar", "/b").tier(SelectorTier::Primary)),
        )
        .page("/b", FakePage::new("B").with(FakeElement::link("Back", "/a")));
    let mut ctx = site.context();
    let counters = Arc::clone(&ctx.counters);
    let session = controller(25).run(&mut ctx, &url("/a")).await.unwrap();

    assert_eq!(
        session.termination(),
        Some(TerminationReason::GuardVeto(VetoReason::RevisitedUrl))
    );
    assert_eq!(session.steps().len(), 2);
    let attempts = &session.steps()[1].attempts;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, ActionOutcome::Vetoed);
    // Only the click on page A reached the browser.
    assert_eq!(counters.clicks.load(Ordering::SeqCst), 1);
    assert_eq!(session.graph().edge_count(), 1);
    assert_graph_consistent(&session);
}

#[tokio::test]
async fn test_click_landing_on_visited_page_terminates_without_edge() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A").with(FakeElement::link("Continuar", "/b").tier(SelectorTier::Primary)),
        )
        .page(
            "/b",
            FakePage::new("B").with(FakeElement::button("Home", Effect::Navigate(url("/a")))),
        );
    let session = crawl(&site, "/a", 25).await;

    assert_eq!(
        session.termination(),
        Some(TerminationReason::GuardVeto(VetoReason::RevisitedUrl))
    );
    let last = &session.steps()[1];
    assert_eq!(last.landed_url.as_deref(), Some(url("/a").as_str()));
    assert_eq!(last.attempts[0].outcome, ActionOutcome::Vetoed);
    assert!(!session.graph().contains_edge(&url("/b"), &url("/a")));
    assert_graph_consistent(&session);
}

#[tokio::test]
async fn test_failed_clicks_fall_back_to_next_candidate() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A")
                .with(
                    FakeElement::button("Continuar", Effect::Stale).tier(SelectorTier::Primary),
                )
                .with(
                    FakeElement::button("Siguiente", Effect::Nothing).tier(SelectorTier::Primary),
                )
                .with(FakeElement::button("Tapa", Effect::Obscured).tier(SelectorTier::Secondary))
                .with(FakeElement::button("Go", Effect::Navigate(url("/b")))),
        )
        .page("/b", FakePage::new("B"));
    let session = crawl(&site, "/a", 25).await;

    let outcomes: Vec<ActionOutcome> = session.steps()[0]
        .attempts
        .iter()
        .map(|a| a.outcome)
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ActionOutcome::Stale,
            ActionOutcome::NoEffect,
            ActionOutcome::Obscured,
            ActionOutcome::Changed,
        ]
    );
    assert_eq!(session.steps()[0].failed_attempts(), 3);
    assert_eq!(
        session.steps()[0].chosen.as_ref().map(|c| c.text.as_str()),
        Some("Go")
    );
    assert_eq!(session.termination(), Some(TerminationReason::DeadEnd));
}

#[tokio::test]
async fn test_same_page_reveal_counts_as_state_change() {
    let reveal = Effect::Reveal {
        elements: vec![FakeElement::link("Continuar", "/continue/b").tier(SelectorTier::Primary)],
        media: vec!["https://player.vimeo.com/video/76979871".into()],
        network: vec![],
    };
    let site = FakeSite::new()
        .page("/a", FakePage::new("A").with(FakeElement::button("Play", reveal)))
        .page("/continue/b", FakePage::new("B"));
    let session = crawl(&site, "/a", 25).await;

    assert_eq!(session.steps().len(), 3);
    let first = &session.steps()[0];
    assert!(first.state_changed);
    assert!(first.landed_url.is_none());
    assert_eq!(first.new_resources, vec!["76979871".to_string()]);

    // The revealed link is taken from the same URL on the next step.
    let second = &session.steps()[1];
    assert_eq!(second.url, url("/a"));
    assert_eq!(second.chosen.as_ref().map(|c| c.text.as_str()), Some("Continuar"));

    let resource = session.registry().get("76979871").unwrap();
    assert_eq!(resource.channel, DiscoveryChannel::Dom);
    assert_eq!(resource.first_seen_step, 0);

    assert_eq!(session.graph().edge_count(), 1);
    assert_graph_consistent(&session);
    assert_eq!(session.termination(), Some(TerminationReason::DeadEnd));
}

#[tokio::test]
async fn test_click_without_visible_change_is_no_effect_then_dead_end() {
    let site = FakeSite::new().page(
        "/a",
        FakePage::new("A")
            .with(FakeElement::button("Continuar", Effect::Nothing))
            .with(FakeElement::link("Hidden", "/x").hidden()),
    );
    let session = crawl(&site, "/a", 25).await;

    assert_eq!(session.steps().len(), 1);
    let step = &session.steps()[0];
    assert_eq!(step.candidates.len(), 1);
    assert_eq!(step.attempts[0].outcome, ActionOutcome::NoEffect);
    assert!(!step.state_changed);
    assert_eq!(session.termination(), Some(TerminationReason::DeadEnd));
}

#[tokio::test]
async fn test_media_fetched_during_load_is_not_a_click_effect() {
    let site = FakeSite::new().page(
        "/a",
        FakePage::new("A")
            .fetch("https://player.vimeo.com/video/383005433/config")
            .with(FakeElement::button("Menu", Effect::Nothing)),
    );
    let session = crawl(&site, "/a", 25).await;

    assert_eq!(session.steps().len(), 1);
    let step = &session.steps()[0];
    assert_eq!(step.new_resources, vec!["383005433".to_string()]);
    assert_eq!(step.attempts.len(), 1);
    assert_eq!(step.attempts[0].outcome, ActionOutcome::NoEffect);
    assert!(!step.state_changed);
    assert!(step.chosen.is_none());
    assert_eq!(session.termination(), Some(TerminationReason::DeadEnd));
}

#[tokio::test]
async fn test_slow_navigation_is_seen_after_quiet_period() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A")
                .with(FakeElement::button("Continuar", Effect::NavigateAfter(url("/b"), 100))),
        )
        .page("/b", FakePage::new("B"));
    let with_quiet = |min_settle_ms| {
        NavigationController::new(CrawlConfig {
            settle_timeout_ms: 1_000,
            min_settle_ms,
            ..Default::default()
        })
        .unwrap()
    };

    let mut ctx = site.context();
    let session = with_quiet(300).run(&mut ctx, &url("/a")).await.unwrap();
    assert_eq!(session.steps().len(), 2);
    let first = &session.steps()[0];
    assert_eq!(first.attempts[0].outcome, ActionOutcome::Changed);
    assert_eq!(first.landed_url.as_deref(), Some(url("/b").as_str()));
    assert_graph_consistent(&session);

    // Without the quiet period the old document is inspected too early.
    let mut ctx = site.context();
    let session = with_quiet(0).run(&mut ctx, &url("/a")).await.unwrap();
    assert_eq!(session.steps().len(), 1);
    assert_eq!(session.steps()[0].attempts[0].outcome, ActionOutcome::NoEffect);
}

#[tokio::test]
async fn test_transient_click_timeouts_are_retried_within_the_step() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A").with(FakeElement::button(
                "Continuar",
                Effect::TimeoutThen(2, Box::new(Effect::Navigate(url("/b")))),
            )),
        )
        .page("/b", FakePage::new("B"));
    let mut ctx = site.context();
    let counters = Arc::clone(&ctx.counters);
    let session = controller(25).run(&mut ctx, &url("/a")).await.unwrap();

    assert_eq!(counters.clicks.load(Ordering::SeqCst), 3);
    let first = &session.steps()[0];
    assert_eq!(first.attempts.len(), 1);
    assert_eq!(first.attempts[0].outcome, ActionOutcome::Changed);
    assert_eq!(first.landed_url.as_deref(), Some(url("/b").as_str()));
    assert_eq!(session.steps().len(), 2);
}

#[tokio::test]
async fn test_exhausted_click_retries_fall_back_to_next_candidate() {
    let bound = CrawlConfig::default().action_retry_bound as usize;
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A")
                .with(
                    FakeElement::button(
                        "Continuar",
                        Effect::TimeoutThen(bound + 2, Box::new(Effect::Navigate(url("/b")))),
                    )
                    .tier(SelectorTier::Primary),
                )
                .with(FakeElement::button("Go", Effect::Navigate(url("/c")))),
        )
        .page("/b", FakePage::new("B"))
        .page("/c", FakePage::new("C"));
    let mut ctx = site.context();
    let counters = Arc::clone(&ctx.counters);
    let session = controller(25).run(&mut ctx, &url("/a")).await.unwrap();

    assert_eq!(counters.clicks.load(Ordering::SeqCst), bound + 1);
    let outcomes: Vec<ActionOutcome> = session.steps()[0]
        .attempts
        .iter()
        .map(|a| a.outcome)
        .collect();
    assert_eq!(outcomes, vec![ActionOutcome::DriverFailed, ActionOutcome::Changed]);
    assert_eq!(
        session.steps()[0].landed_url.as_deref(),
        Some(url("/c").as_str())
    );
}

#[tokio::test]
async fn test_returning_to_seen_page_state_is_vetoed() {
    let gamma = FakeElement::button("Gamma", Effect::Show(vec![]));
    let beta = FakeElement::button("Beta", Effect::Show(vec![gamma]));
    let alpha = FakeElement::button("Alpha", Effect::Show(vec![beta]));
    let site = FakeSite::new().page("/a", FakePage::new("A").with(alpha));
    let session = crawl(&site, "/a", 25).await;

    assert_eq!(session.steps().len(), 3);
    assert!(session.steps().iter().all(|s| s.url == url("/a")));
    let chosen: Vec<Option<&str>> = session
        .steps()
        .iter()
        .map(|s| s.chosen.as_ref().map(|c| c.text.as_str()))
        .collect();
    assert_eq!(chosen, vec![Some("Alpha"), Some("Beta"), None]);

    // Alpha would bring Beta back: the {Alpha, Beta} state was already seen.
    let last = &session.steps()[2];
    assert_eq!(last.attempts[0].outcome, ActionOutcome::Vetoed);
    assert_eq!(last.attempts[0].text, "Alpha");
    assert_eq!(
        session.termination(),
        Some(TerminationReason::GuardVeto(VetoReason::RepeatedState))
    );
    assert_eq!(session.graph().edge_count(), 0);
}

#[tokio::test]
async fn test_equal_scores_follow_document_order_across_tiers() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A")
                .with(
                    FakeElement::button("Beta", Effect::Navigate(url("/b")))
                        .tier(SelectorTier::Secondary),
                )
                .with(
                    FakeElement::button("Alpha", Effect::Navigate(url("/c")))
                        .tier(SelectorTier::Primary),
                ),
        )
        .page("/b", FakePage::new("B"))
        .page("/c", FakePage::new("C"));
    let ctl = NavigationController::new(CrawlConfig {
        min_settle_ms: 0,
        tier_scores: TierScores {
            primary: 5,
            secondary: 5,
            fallback: 5,
        },
        ..Default::default()
    })
    .unwrap();
    let mut ctx = site.context();
    let session = ctl.run(&mut ctx, &url("/a")).await.unwrap();

    let texts: Vec<&str> = session.steps()[0]
        .candidates
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Beta", "Alpha"]);
    assert_eq!(
        session.steps()[0].landed_url.as_deref(),
        Some(url("/b").as_str())
    );
}

#[tokio::test]
async fn test_finished_session_ignores_late_responses() {
    let site = two_page_site();
    let mut ctx = site.context();
    let session = controller(25).run(&mut ctx, &url("/a")).await.unwrap();
    assert!(session.registry().is_empty());

    ctx.respond("https://cdn.example.com/media/late.mp4");
    assert!(session.registry().is_empty());
    assert!(session.resources().is_empty());
}

#[tokio::test]
async fn test_unreachable_start_url_ends_with_navigation_failed() {
    let site = FakeSite::new();
    let mut ctx = site.context();
    let counters = Arc::clone(&ctx.counters);
    let session = controller(25).run(&mut ctx, &url("/missing")).await.unwrap();

    assert!(session.steps().is_empty());
    assert_eq!(session.termination(), Some(TerminationReason::NavigationFailed));
    // Aborted navigations are retried up to the retry bound.
    assert_eq!(
        counters.navigations.load(Ordering::SeqCst),
        CrawlConfig::default().action_retry_bound as usize
    );
}

#[tokio::test]
async fn test_closed_context_surfaces_partial_session() {
    let site = FakeSite::new()
        .page(
            "/a",
            FakePage::new("A").with(FakeElement::link("Continuar", "/b").tier(SelectorTier::Primary)),
        )
        .page(
            "/b",
            FakePage::new("B").with(FakeElement::button("Crash", Effect::CloseContext)),
        );
    let mut ctx = site.context();
    let err = controller(25).run(&mut ctx, &url("/a")).await.unwrap_err();

    let partial = err.partial_session().expect("partial session");
    assert!(matches!(err, JourneyError::SessionFatal { .. }));
    assert_eq!(partial.steps().len(), 1);
    assert_eq!(partial.termination(), Some(TerminationReason::SessionFatal));
    assert!(partial.is_finished());
}

#[tokio::test]
async fn test_events_follow_the_session() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let ctl = controller(25).with_events(bus);
    let mut ctx = two_page_site().context();
    let session = ctl.run(&mut ctx, &url("/a")).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(JourneyEvent::SessionStarted { .. })));
    let committed = events
        .iter()
        .filter(|e| matches!(e, JourneyEvent::StepCommitted { .. }))
        .count();
    assert_eq!(committed, 2);
    match events.last() {
        Some(JourneyEvent::SessionTerminated { reason, steps, edges, .. }) => {
            assert_eq!(reason, "dead_end");
            assert_eq!(*steps, 2);
            assert_eq!(*edges, 1);
        }
        other => panic!("unexpected last event: {other:?}"),
    }
    let id = session.id().to_string();
    assert!(events.iter().all(|e| e.session_id() == id));
}

#[tokio::test]
async fn test_directory_sink_receives_arrival_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::create(dir.path()).unwrap();
    let ctl = controller(25).with_sink(Arc::new(sink.clone()));
    let mut ctx = two_page_site().context();
    let session = ctl.run(&mut ctx, &url("/a")).await.unwrap();

    for step in session.steps() {
        let snapshot = &step.snapshot;
        assert!(snapshot.html_ref.is_some());
        assert!(snapshot.screenshot_ref.is_some());
        assert!(snapshot.html_fingerprint.is_some());
        assert_eq!(snapshot.screenshot_bytes, 4);
    }
    assert!(dir.path().join("step_00_arrival.html").exists());
    assert!(dir.path().join("step_01_arrival.png").exists());
    let first = &session.steps()[0].snapshot;
    let second = &session.steps()[1].snapshot;
    assert_ne!(first.html_fingerprint, second.html_fingerprint);
}

#[tokio::test]
async fn test_batch_sessions_are_isolated() {
    let embed = "https://player.vimeo.com/video/383005433";
    let site = FakeSite::new()
        .page("/one", FakePage::new("One").embed(embed))
        .page("/two", FakePage::new("Two").embed(embed));
    let renderer = Arc::new(FakeRenderer::new(site));
    let outcomes = run_batch(
        renderer.clone(),
        Arc::new(controller(25)),
        vec![url("/one"), url("/missing"), url("/two")],
        2,
    )
    .await;

    assert_eq!(renderer.opened(), 3);
    assert_eq!(outcomes[0].start_url, url("/one"));
    assert_eq!(outcomes[2].start_url, url("/two"));

    let one = outcomes[0].result.as_ref().unwrap();
    let two = outcomes[2].result.as_ref().unwrap();
    assert_ne!(one.id(), two.id());
    // Each session keeps its own registry.
    assert_eq!(one.registry().len(), 1);
    assert_eq!(two.registry().len(), 1);

    let missing = outcomes[1].result.as_ref().unwrap();
    assert_eq!(missing.termination(), Some(TerminationReason::NavigationFailed));
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert!(!outcomes.iter().any(|o| matches!(o.result, Err(BatchError::Task(_)))));
}

#[tokio::test]
async fn test_context_is_usable_through_trait_object() {
    let site = two_page_site();
    let mut ctx: Box<dyn RenderContext> = Box::new(site.context());
    let session = controller(25).run(ctx.as_mut(), &url("/a")).await.unwrap();
    assert_eq!(session.steps().len(), 2);
    ctx.close().await.unwrap();
}
