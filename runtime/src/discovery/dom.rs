// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Active discovery channel: scan the rendered DOM for embedded media.

use serde::Deserialize;

/// Collects provider iframes and native media sources from the page.
///
/// Returns `[{ tag, src }]` with absolute URLs (property access resolves
/// relative `src` attributes against the document).
pub const MEDIA_SCAN_SCRIPT: &str = r#"(() => {
    const out = [];
    const push = (tag, src) => { if (src && typeof src === 'string') out.push({ tag, src }); };
    document.querySelectorAll('iframe').forEach(f => push('iframe', f.src || f.getAttribute('data-src')));
    document.querySelectorAll('video').forEach(v => {
        push('video', v.currentSrc || v.src);
        v.querySelectorAll('source').forEach(s => push('source', s.src));
    });
    document.querySelectorAll('[data-vimeo-id]').forEach(el => {
        push('data-vimeo-id', 'https://vimeo.com/' + el.getAttribute('data-vimeo-id'));
    });
    return out;
})()"#;

/// Reports playback state of the first native video and whether overlay
/// interaction points are on screen.
pub const VIDEO_STATE_SCRIPT: &str = r#"(() => {
    const v = document.querySelector('video');
    const points = document.querySelectorAll(
        '[data-interaction], [class*="interaction"], [class*="decision"], #options'
    ).length;
    return {
        has_video: !!v,
        has_embedded_player: !!document.querySelector('iframe[src*="vimeo"], iframe[src*="youtube"]'),
        playing: v ? !v.paused && !v.ended : false,
        current_time: v ? v.currentTime || 0 : 0,
        duration: v && isFinite(v.duration) ? v.duration : 0,
        has_controls: v ? !!v.controls : false,
        has_interaction_points: points > 0
    };
})()"#;

/// One media reference found in the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DomMediaHit {
    pub tag: String,
    pub src: String,
}

/// Decode the scan script's result. Malformed entries are skipped.
pub fn parse_scan_result(value: serde_json::Value) -> Vec<DomMediaHit> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .filter(|hit: &DomMediaHit| !hit.src.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
