// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.

use super::scripts::{click_script, query_interactive_script};
use super::{
    ElementHandle, NavigationResult, NetworkResponse, RawElement, RenderContext, Renderer,
    ResponseCallback,
};
use crate::error::{ActionError, DriverError};
use crate::scoring::SelectorTiers;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Environment variable pointing at a Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "JOURNEY_CHROMIUM_PATH";

const WAIT_POLL_MS: u64 = 100;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. JOURNEY_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.journey/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".journey/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".journey/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".journey/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".journey/chromium/chrome-linux64/chrome"),
                home.join(".journey/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Map a chromiumoxide error onto the driver taxonomy.
fn map_cdp(op: &str, err: CdpError) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::timeout(op, 0),
        CdpError::FrameNotFound(frame) => DriverError::DetachedFrame(format!("{frame:?}")),
        CdpError::JavascriptException(details) => DriverError::Script(details.text.clone()),
        CdpError::ChannelSendError(e) => DriverError::ContextClosed(e.to_string()),
        CdpError::Ws(e) => DriverError::ContextClosed(e.to_string()),
        CdpError::NoResponse => DriverError::ContextClosed(format!("{op}: no response")),
        other => {
            let msg = other.to_string();
            let lower = msg.to_lowercase();
            if lower.contains("target closed") || lower.contains("no target with given id") {
                DriverError::ContextClosed(msg)
            } else if lower.contains("navigation") && lower.contains("abort") {
                DriverError::NavigationAborted(msg)
            } else {
                DriverError::Protocol(format!("{op}: {msg}"))
            }
        }
    }
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch Chromium. Headless unless `headful` is set.
    pub async fn new(headful: bool) -> Result<Self, DriverError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            DriverError::ContextClosed(format!(
                "Chromium not found. Install Chrome or set {CHROMIUM_PATH_ENV}."
            ))
        })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--autoplay-policy=no-user-gesture-required");
        builder = if headful {
            builder.with_head()
        } else {
            builder.arg("--headless=new")
        };
        let config = builder
            .build()
            .map_err(|e| DriverError::Protocol(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| map_cdp("launch", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>, DriverError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| map_cdp("new_page", e))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            listener: None,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        self.handler.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    listener: Option<JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult, DriverError> {
        let start = Instant::now();

        let result = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        })
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                let final_url = self.current_url().await.unwrap_or_else(|_| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    // chromiumoxide does not surface the document status here
                    status: 200,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(match map_cdp("navigate", e) {
                DriverError::Protocol(msg) => DriverError::NavigationAborted(msg),
                other => other,
            }),
            Err(_) => Err(DriverError::timeout("navigate", timeout_ms)),
        }
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| map_cdp("current_url", e))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| map_cdp("title", e))?
            .unwrap_or_default())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| map_cdp("execute_js", e))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn query_interactive(&self, tiers: &SelectorTiers) -> Result<Vec<RawElement>, DriverError> {
        let value = self.execute_js(&query_interactive_script(tiers)).await?;
        serde_json::from_value(value)
            .map_err(|e| DriverError::Script(format!("unexpected element list: {e}")))
    }

    async fn click(&mut self, handle: &ElementHandle) -> Result<(), ActionError> {
        let value = self.execute_js(&click_script(&handle.0)).await?;
        match value.get("status").and_then(|s| s.as_str()) {
            Some("ok") => Ok(()),
            Some("stale") => Err(ActionError::Stale(handle.0.clone())),
            Some("obscured") => {
                let by = value.get("by").and_then(|b| b.as_str()).unwrap_or("?");
                Err(ActionError::Obscured(format!("{} covered by {by}", handle.0)))
            }
            _ => Err(DriverError::Script(format!("unexpected click result: {value}")).into()),
        }
    }

    async fn wait_for(&self, condition: &str, timeout_ms: u64) -> Result<bool, DriverError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match self.execute_js(condition).await {
                Ok(serde_json::Value::Bool(true)) => return Ok(true),
                Ok(_) | Err(DriverError::Script(_)) => {}
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(WAIT_POLL_MS)).await;
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| map_cdp("screenshot", e))
    }

    async fn get_html(&self) -> Result<String, DriverError> {
        let value = self.execute_js("document.documentElement.outerHTML").await?;
        match value {
            serde_json::Value::String(html) => Ok(html),
            other => Err(DriverError::Script(format!("unexpected HTML result: {other}"))),
        }
    }

    async fn on_network_response(&mut self, callback: ResponseCallback) -> Result<(), DriverError> {
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| map_cdp("network_enable", e))?;
        let mut stream = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| map_cdp("event_listener", e))?;

        if let Some(previous) = self.listener.take() {
            previous.abort();
        }
        self.listener = Some(tokio::spawn(async move {
            while let Some(evt) = stream.next().await {
                let response = &evt.response;
                callback(NetworkResponse {
                    url: response.url.clone(),
                    status: u16::try_from(response.status).unwrap_or(0),
                    mime_type: Some(response.mime_type.clone()).filter(|m| !m.is_empty()),
                });
            }
        }));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Some(listener) = &self.listener {
            listener.abort();
        }
        let _ = self.page.close().await;
        Ok(())
    }
}
