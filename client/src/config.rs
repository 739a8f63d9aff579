// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, Result, bail};
use common::DEFAULT_STREAK_THRESHOLD;
use tracing::{debug, info};

pub const API_URL_VAR: &str = "CHECKIN_API_URL";
pub const TIMEOUT_VAR: &str = "CHECKIN_TIMEOUT_SECS";
pub const THRESHOLD_VAR: &str = "CHECKIN_STREAK_THRESHOLD";
pub const TOKEN_VAR: &str = "CHECKIN_TOKEN";

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: &str = "10";

/// Client settings. The base URL and timeout shape every request, the
/// threshold decides which history days count towards a streak.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub streak_threshold: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            streak_threshold: DEFAULT_STREAK_THRESHOLD,
        }
    }
}

impl ClientConfig {
    /// Reads the settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let threshold_default = DEFAULT_STREAK_THRESHOLD.to_string();
        let api_url: String = try_load(API_URL_VAR, DEFAULT_API_URL)?;
        let timeout_secs: u64 = try_load(TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS)?;
        let streak_threshold: f64 = try_load(THRESHOLD_VAR, &threshold_default)?;

        Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            streak_threshold,
        }
        .validated()
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the values and normalizes the base URL (no trailing slash).
    pub fn validated(mut self) -> Result<Self> {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        if self.api_url.is_empty() {
            bail!("{API_URL_VAR} must not be empty");
        }
        if self.timeout.is_zero() {
            bail!("{TIMEOUT_VAR} must be at least one second");
        }
        if !(0.0..=100.0).contains(&self.streak_threshold) {
            bail!(
                "{THRESHOLD_VAR} must be between 0 and 100, got {}",
                self.streak_threshold
            );
        }
        Ok(self)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    debug!("{key}={raw}");

    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}
