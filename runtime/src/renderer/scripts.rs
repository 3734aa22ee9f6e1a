// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page scripts the Chromium context injects.
//!
//! Interactive elements are tagged with a `data-journey-handle` attribute
//! when queried; clicks look the element up again by that attribute, so a
//! handle from a replaced DOM resolves to nothing and reports as stale.

use crate::scoring::{SelectorTier, SelectorTiers};

/// Attribute carrying element handles.
pub const HANDLE_ATTR: &str = "data-journey-handle";

/// Build the script that tags and reports interactive elements.
///
/// Elements come back in document order, each reported under the first tier
/// whose selectors it matches. Selectors the engine rejects are skipped.
pub fn query_interactive_script(tiers: &SelectorTiers) -> String {
    let mut groups = Vec::with_capacity(SelectorTier::ALL.len());
    for (tier, selectors) in tiers.iter() {
        let list: Vec<String> = selectors
            .iter()
            .map(|s| format!("'{}'", sanitize_js_string(s)))
            .collect();
        groups.push(format!("['{}', [{}]]", tier.as_str(), list.join(", ")));
    }
    format!(
        r#"(() => {{
    const ATTR = '{attr}';
    const tiers = [{groups}];
    window.__journeySeq = window.__journeySeq || 0;
    const matchers = [];
    for (const [tier, selectors] of tiers) {{
        const valid = selectors.filter(s => {{
            try {{ document.querySelector(s); return true; }} catch (e) {{ return false; }}
        }});
        if (valid.length) matchers.push([tier, valid.join(',')]);
    }}
    if (!matchers.length) return [];
    const out = [];
    for (const el of document.querySelectorAll(matchers.map(m => m[1]).join(','))) {{
        const tier = matchers.find(m => el.matches(m[1]))[0];
        let handle = el.getAttribute(ATTR);
        if (!handle) {{
            window.__journeySeq += 1;
            handle = String(window.__journeySeq);
            el.setAttribute(ATTR, handle);
        }}
        const r = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        const visible = r.width > 0 && r.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
        const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true';
        const text = (el.innerText || el.value || el.getAttribute('aria-label') || '').trim();
        out.push({{
            handle,
            tag: el.tagName,
            role: el.getAttribute('role'),
            input_type: el.getAttribute('type'),
            text,
            href: el.getAttribute('href'),
            rect: {{ x: r.x, y: r.y, width: r.width, height: r.height }},
            tier,
            visible,
            enabled,
        }});
    }}
    return out;
}})()"#,
        attr = HANDLE_ATTR,
        groups = groups.join(", "),
    )
}

/// Build the script that clicks a tagged element.
///
/// Returns `{status: "ok" | "stale" | "obscured", by?}`. The element is
/// scrolled into view first, then hit-tested at its center.
pub fn click_script(handle: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector('[{attr}="{handle}"]');
    if (!el || !el.isConnected) return {{ status: 'stale' }};
    el.scrollIntoView({{ block: 'center', inline: 'center' }});
    const r = el.getBoundingClientRect();
    const top = document.elementFromPoint(r.x + r.width / 2, r.y + r.height / 2);
    if (top && top !== el && !el.contains(top) && !top.contains(el)) {{
        return {{ status: 'obscured', by: top.tagName }};
    }}
    el.click();
    return {{ status: 'ok' }};
}})()"#,
        attr = HANDLE_ATTR,
        handle = sanitize_js_string(handle),
    )
}

/// Escape a string for use inside a single- or double-quoted JS literal.
///
/// `<` and `>` are hex-escaped so a value can never close a script tag.
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
