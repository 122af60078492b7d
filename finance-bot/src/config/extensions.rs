//! Dialogue extensions: templates, time zone for "Today", idle expiry, quick amounts.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_TZ_OFFSET_HOURS: i32 = 7;
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;

/// Tuning of the finance wizard, loaded from env.
#[derive(Debug, Clone)]
pub struct DialogueExtensions {
    /// TEMPLATE_DIR: directory with `<template>.hbs` overrides
    pub template_dir: Option<String>,
    /// TZ_OFFSET_HOURS: hours east of UTC used for "Today" and the calendar
    pub tz_offset_hours: i32,
    /// SESSION_IDLE_TIMEOUT_SECS: 0 disables expiry
    pub session_idle_timeout_secs: u64,
    /// QUICK_AMOUNTS: comma-separated one-tap amounts, e.g. `50,100,200`
    pub quick_amounts: Vec<String>,
}

impl DialogueExtensions {
    pub fn from_env() -> Result<Self> {
        let template_dir = env::var("TEMPLATE_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let tz_offset_hours = match env::var("TZ_OFFSET_HOURS") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("TZ_OFFSET_HOURS is not an integer: {}", s))?,
            Err(_) => DEFAULT_TZ_OFFSET_HOURS,
        };
        let session_idle_timeout_secs = match env::var("SESSION_IDLE_TIMEOUT_SECS") {
            Ok(s) => s
                .trim()
                .parse()
                .with_context(|| format!("SESSION_IDLE_TIMEOUT_SECS is not a number: {}", s))?,
            Err(_) => DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
        };
        let quick_amounts = env::var("QUICK_AMOUNTS")
            .map(|s| parse_quick_amounts(&s))
            .unwrap_or_default();

        Ok(Self {
            template_dir,
            tz_offset_hours,
            session_idle_timeout_secs,
            quick_amounts,
        })
    }

    /// Offset must be a real zone (-12..=14) and quick amounts must be positive numbers.
    pub fn validate(&self) -> Result<()> {
        if !(-12..=14).contains(&self.tz_offset_hours) {
            anyhow::bail!("TZ_OFFSET_HOURS out of range (-12..=14): {}", self.tz_offset_hours);
        }
        for amount in &self.quick_amounts {
            match amount.parse::<f64>() {
                Ok(v) if v > 0.0 => {}
                _ => anyhow::bail!("QUICK_AMOUNTS entry is not a positive number: {}", amount),
            }
        }
        Ok(())
    }

    /// `None` when expiry is disabled.
    pub fn session_idle_timeout(&self) -> Option<Duration> {
        match self.session_idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_quick_amounts(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}
