// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! A scripted in-memory site that implements the driver traits, so the
//! whole controller can run without a browser.

#![allow(dead_code)]

use async_trait::async_trait;
use journey_runtime::discovery::dom::{MEDIA_SCAN_SCRIPT, VIDEO_STATE_SCRIPT};
use journey_runtime::error::{ActionError, DriverError};
use journey_runtime::journey::JourneySession;
use journey_runtime::navigation::SETTLE_CONDITION;
use journey_runtime::renderer::{
    ElementHandle, NavigationResult, NetworkResponse, RawElement, Rect, RenderContext, Renderer,
    ResponseCallback,
};
use journey_runtime::scoring::{SelectorTier, SelectorTiers};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ORIGIN: &str = "https://site.test";

/// Absolute URL on the test origin.
pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// What clicking an element does.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Load another page of the site.
    Navigate(String),
    /// Load another page once this many milliseconds have passed.
    NavigateAfter(String, u64),
    /// Same page: add elements, embedded media and network traffic.
    Reveal {
        elements: Vec<FakeElement>,
        media: Vec<String>,
        network: Vec<String>,
    },
    /// Same page: replace whatever was revealed before with these elements.
    Show(Vec<FakeElement>),
    /// Time out this many clicks, then behave like the inner effect.
    TimeoutThen(usize, Box<Effect>),
    Nothing,
    Stale,
    Obscured,
    /// The browser goes away.
    CloseContext,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
    pub tier: SelectorTier,
    pub visible: bool,
    pub effect: Effect,
}

impl FakeElement {
    /// An anchor that loads the page at `path`.
    pub fn link(text: &str, path: &str) -> Self {
        Self {
            tag: "A".into(),
            text: text.into(),
            href: Some(path.into()),
            tier: SelectorTier::Secondary,
            visible: true,
            effect: Effect::Navigate(url(path)),
        }
    }

    pub fn button(text: &str, effect: Effect) -> Self {
        Self {
            tag: "BUTTON".into(),
            text: text.into(),
            href: None,
            tier: SelectorTier::Fallback,
            visible: true,
            effect,
        }
    }

    pub fn tier(mut self, tier: SelectorTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub elements: Vec<FakeElement>,
    /// Embedded media visible to the DOM scan.
    pub media: Vec<String>,
    /// Responses fired while the page loads.
    pub network: Vec<String>,
}

impl FakePage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn embed(mut self, src: &str) -> Self {
        self.media.push(src.into());
        self
    }

    pub fn fetch(mut self, src: &str) -> Self {
        self.network.push(src.into());
        self
    }
}

/// Pages keyed by absolute URL.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, path: &str, page: FakePage) -> Self {
        self.pages.insert(url(path), page);
        self
    }

    /// A linear chain `/p0 -> /p1 -> ... -> /p{n-1}`, each with one
    /// "Continuar" link to the next page.
    pub fn chain(n: usize) -> Self {
        let mut site = Self::new();
        for i in 0..n {
            let mut page = FakePage::new(&format!("Page {i}"));
            if i + 1 < n {
                page = page.with(
                    FakeElement::link("Continuar", &format!("/p{}", i + 1))
                        .tier(SelectorTier::Primary),
                );
            }
            site = site.page(&format!("/p{i}"), page);
        }
        site
    }

    pub fn context(&self) -> FakeContext {
        FakeContext::new(Arc::new(self.clone()))
    }
}

/// Counters shared between a context and the test.
#[derive(Debug, Default)]
pub struct Counters {
    pub navigations: AtomicUsize,
    pub clicks: AtomicUsize,
    pub closed: AtomicUsize,
}

pub struct FakeContext {
    site: Arc<FakeSite>,
    current: Option<String>,
    revealed: HashMap<String, Revealed>,
    callback: Option<ResponseCallback>,
    pending: Option<(String, Instant)>,
    timeouts: HashMap<String, usize>,
    gone: bool,
    pub counters: Arc<Counters>,
}

#[derive(Debug, Clone, Default)]
struct Revealed {
    elements: Vec<FakeElement>,
    media: Vec<String>,
}

impl FakeContext {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            current: None,
            revealed: HashMap::new(),
            callback: None,
            pending: None,
            timeouts: HashMap::new(),
            gone: false,
            counters: Arc::new(Counters::default()),
        }
    }

    fn check_open(&self) -> Result<(), DriverError> {
        if self.gone {
            Err(DriverError::ContextClosed("fake browser closed".into()))
        } else {
            Ok(())
        }
    }

    /// The URL shown, counting a delayed navigation whose time has come.
    fn shown(&self) -> Option<&String> {
        match &self.pending {
            Some((target, at)) if Instant::now() >= *at => Some(target),
            _ => self.current.as_ref(),
        }
    }

    fn settle_pending(&mut self) {
        if let Some((target, at)) = self.pending.take() {
            if Instant::now() >= at {
                self.load(&target);
            } else {
                self.pending = Some((target, at));
            }
        }
    }

    fn page(&self) -> Option<&FakePage> {
        self.shown().and_then(|u| self.site.pages.get(u))
    }

    fn apply(&mut self, handle: &str, effect: Effect) -> Result<(), ActionError> {
        match effect {
            Effect::Navigate(target) => {
                if self.site.pages.contains_key(&target) {
                    self.load(&target);
                }
                Ok(())
            }
            Effect::NavigateAfter(target, delay_ms) => {
                self.pending = Some((target, Instant::now() + Duration::from_millis(delay_ms)));
                Ok(())
            }
            Effect::Reveal {
                elements,
                media,
                network,
            } => {
                if let Some(current) = self.current.clone() {
                    let r = self.revealed.entry(current).or_default();
                    r.elements.extend(elements);
                    r.media.extend(media);
                }
                self.fire(&network);
                Ok(())
            }
            Effect::Show(elements) => {
                if let Some(current) = self.current.clone() {
                    self.revealed.entry(current).or_default().elements = elements;
                }
                Ok(())
            }
            Effect::TimeoutThen(failures, then) => {
                let seen = self.timeouts.entry(handle.to_string()).or_insert(0);
                if *seen < failures {
                    *seen += 1;
                    return Err(DriverError::timeout("click", 50).into());
                }
                self.apply(handle, *then)
            }
            Effect::Nothing => Ok(()),
            Effect::Stale => Err(ActionError::Stale(handle.to_string())),
            Effect::Obscured => Err(ActionError::Obscured(format!("{handle} under overlay"))),
            Effect::CloseContext => {
                self.gone = true;
                Err(DriverError::ContextClosed("browser crashed".into()).into())
            }
        }
    }

    /// Deliver a response to the registered listener, as a browser would.
    pub fn respond(&self, url: &str) {
        self.fire(&[url.to_string()]);
    }

    /// Page elements plus anything revealed, each with a stable handle.
    fn elements(&self) -> Vec<(String, &FakeElement)> {
        let Some(current) = self.shown() else {
            return Vec::new();
        };
        let base = self.page().map(|p| p.elements.iter()).into_iter().flatten();
        let extra = self
            .revealed
            .get(current)
            .map(|r| r.elements.iter())
            .into_iter()
            .flatten();
        base.chain(extra)
            .enumerate()
            .map(|(i, e)| (format!("{current}#{i}"), e))
            .collect()
    }

    fn fire(&self, urls: &[String]) {
        if let Some(cb) = &self.callback {
            for u in urls {
                cb(NetworkResponse {
                    url: u.clone(),
                    status: 200,
                    mime_type: Some("text/html".into()),
                });
            }
        }
    }

    fn load(&mut self, target: &str) {
        self.current = Some(target.to_string());
        self.revealed.remove(target);
        let network = self
            .site
            .pages
            .get(target)
            .map(|p| p.network.clone())
            .unwrap_or_default();
        self.fire(&network);
    }
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, target: &str, _timeout_ms: u64) -> Result<NavigationResult, DriverError> {
        self.check_open()?;
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        if !self.site.pages.contains_key(target) {
            return Err(DriverError::NavigationAborted(format!("net::ERR_NAME_NOT_RESOLVED {target}")));
        }
        self.pending = None;
        self.load(target);
        Ok(NavigationResult {
            final_url: target.to_string(),
            status: 200,
            load_time_ms: 1,
        })
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self.shown().cloned().unwrap_or_else(|| "about:blank".into()))
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self.page().map(|p| p.title.clone()).unwrap_or_default())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.check_open()?;
        if script == MEDIA_SCAN_SCRIPT {
            let mut media: Vec<String> = self.page().map(|p| p.media.clone()).unwrap_or_default();
            if let Some(r) = self.shown().and_then(|u| self.revealed.get(u)) {
                media.extend(r.media.iter().cloned());
            }
            let hits: Vec<_> = media.iter().map(|src| json!({ "tag": "iframe", "src": src })).collect();
            return Ok(json!(hits));
        }
        if script == VIDEO_STATE_SCRIPT {
            let embedded = self.page().is_some_and(|p| !p.media.is_empty());
            return Ok(json!({ "has_video": false, "has_embedded_player": embedded }));
        }
        if script == SETTLE_CONDITION {
            return Ok(json!(true));
        }
        Ok(serde_json::Value::Null)
    }

    async fn query_interactive(&self, _tiers: &SelectorTiers) -> Result<Vec<RawElement>, DriverError> {
        self.check_open()?;
        let raw: Vec<RawElement> = self
            .elements()
            .into_iter()
            .map(|(handle, e)| RawElement {
                handle: ElementHandle(handle),
                tag: e.tag.clone(),
                role: None,
                input_type: None,
                text: e.text.clone(),
                href: e.href.clone(),
                rect: Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 100.0,
                    height: 30.0,
                },
                tier: e.tier,
                visible: e.visible,
                enabled: true,
            })
            .collect();
        Ok(raw)
    }

    async fn click(&mut self, handle: &ElementHandle) -> Result<(), ActionError> {
        self.check_open()?;
        self.settle_pending();
        self.counters.clicks.fetch_add(1, Ordering::SeqCst);
        let effect = self
            .elements()
            .into_iter()
            .find(|(h, _)| *h == handle.0)
            .map(|(_, e)| e.effect.clone())
            .ok_or_else(|| ActionError::Stale(handle.0.clone()))?;
        self.apply(&handle.0, effect)
    }

    async fn wait_for(&self, condition: &str, _timeout_ms: u64) -> Result<bool, DriverError> {
        self.check_open()?;
        Ok(condition == SETTLE_CONDITION)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.check_open()?;
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn get_html(&self) -> Result<String, DriverError> {
        self.check_open()?;
        let title = self.page().map(|p| p.title.as_str()).unwrap_or("");
        Ok(format!("<html><head><title>{title}</title></head><body></body></html>"))
    }

    async fn on_network_response(&mut self, callback: ResponseCallback) -> Result<(), DriverError> {
        self.callback = Some(callback);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Renderer handing out contexts on one site.
pub struct FakeRenderer {
    site: Arc<FakeSite>,
    opened: AtomicUsize,
}

impl FakeRenderer {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            opened: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, DriverError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext::new(Arc::clone(&self.site))))
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        0
    }
}

/// Every recorded edge `from -> to` is backed by consecutive steps
/// arriving at `from` then `to`.
pub fn assert_graph_consistent(session: &JourneySession) {
    let steps = session.steps();
    for (from, to) in session.graph().edges() {
        let backed = steps
            .windows(2)
            .any(|w| w[0].url == from && w[1].url == to);
        assert!(backed, "edge {from} -> {to} has no consecutive steps");
    }
}
