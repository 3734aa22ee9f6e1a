// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use crate::config::CrawlConfig;
use crate::renderer::chromium::{find_chromium, CHROMIUM_PATH_ENV};
use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Check Chromium availability, the effective configuration and memory.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("Journey Doctor");
    println!("==============");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set {CHROMIUM_PATH_ENV}."
        ),
    }

    let config_ok = match CrawlConfig::load(config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    }) {
        Ok(config) => {
            println!(
                "[OK] Configuration valid: max_steps={}, retries={}, settle={}ms, navigation={}ms",
                config.max_steps,
                config.action_retry_bound,
                config.settle_timeout_ms,
                config.navigation_timeout_ms
            );
            true
        }
        Err(e) => {
            println!("[!!] Configuration invalid: {e}");
            false
        }
    };

    match get_available_memory_mb() {
        Some(mb) if mb >= 256 => println!("[OK] Available memory: {mb}MB (>= 256MB required)"),
        Some(mb) => println!("[!!] Available memory: {mb}MB (< 256MB, may be insufficient)"),
        None => println!("[??] Could not determine available memory"),
    }

    println!();
    if chromium_path.is_some() && config_ok {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        if chromium_path.is_none() {
            println!("  Point {CHROMIUM_PATH_ENV} at a Chrome or Chromium binary.");
        }
    }

    Ok(())
}

/// Get available memory in MB (platform-specific).
fn get_available_memory_mb() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        let output = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        let bytes: u64 = s.trim().parse().ok()?;
        Some(bytes / 1_048_576)
    }
    #[cfg(target_os = "linux")]
    {
        let output = Command::new("free").args(["-m"]).output().ok()?;
        let s = String::from_utf8_lossy(&output.stdout);
        s.lines()
            .find(|line| line.starts_with("Mem:"))
            .and_then(|line| line.split_whitespace().nth(6))
            .and_then(|v| v.parse().ok())
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
