// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Browser driver adapter.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The journey
//! engine only ever talks to a page through these traits.

pub mod chromium;
pub mod scripts;

use crate::error::{ActionError, DriverError};
use crate::scoring::{SelectorTier, SelectorTiers};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status code, when the engine exposes it.
    pub status: u16,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A completed network response observed by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub url: String,
    pub status: u16,
    pub mime_type: Option<String>,
}

/// Callback invoked for every completed response. May run on any task.
pub type ResponseCallback = Arc<dyn Fn(NetworkResponse) + Send + Sync>;

/// Opaque reference to an element found by [`RenderContext::query_interactive`].
///
/// Only valid until the page changes; clicking a handle from an older DOM
/// yields [`ActionError::Stale`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

/// Bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// An interactive element as reported by the driver, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    pub handle: ElementHandle,
    /// Upper-case tag name (`A`, `BUTTON`, ...).
    pub tag: String,
    #[serde(default)]
    pub role: Option<String>,
    /// The `type` attribute for inputs and buttons.
    #[serde(default)]
    pub input_type: Option<String>,
    /// Visible text, trimmed.
    #[serde(default)]
    pub text: String,
    /// Raw `href` attribute, if any.
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub rect: Rect,
    /// The first selector tier the element matched.
    pub tier: SelectorTier,
    pub visible: bool,
    pub enabled: bool,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, DriverError>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<(), DriverError>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) the journey runs in.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL and wait for the page to settle, or time out.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult, DriverError>;
    /// The URL currently shown.
    async fn current_url(&self) -> Result<String, DriverError>;
    /// The document title.
    async fn title(&self) -> Result<String, DriverError>;
    /// Evaluate a script in the page and return its JSON result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value, DriverError>;
    /// Find interactive elements matching the selector tiers, in document
    /// order. Each element is reported once, under the first tier it matches.
    async fn query_interactive(&self, tiers: &SelectorTiers) -> Result<Vec<RawElement>, DriverError>;
    /// Click an element previously returned by `query_interactive`.
    async fn click(&mut self, handle: &ElementHandle) -> Result<(), ActionError>;
    /// Poll a boolean script until it returns true. `Ok(false)` on timeout.
    async fn wait_for(&self, condition: &str, timeout_ms: u64) -> Result<bool, DriverError>;
    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
    /// Serialized DOM.
    async fn get_html(&self) -> Result<String, DriverError>;
    /// Register a callback for every completed network response.
    async fn on_network_response(&mut self, callback: ResponseCallback) -> Result<(), DriverError>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Bound a driver call by a timeout, mapping expiry to [`DriverError::Timeout`].
pub async fn with_timeout<T, E, F>(op: &str, timeout_ms: u64, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DriverError>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::timeout(op, timeout_ms).into()),
    }
}
