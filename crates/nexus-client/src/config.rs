use std::time::Duration;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base url of the forum API, without a trailing slash.
    pub api_url: String,
    pub timeout: Duration,
    /// Run the offline national-ID checksum before calling the verification
    /// endpoint.
    pub tc_precheck: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tc_precheck: false,
        }
    }
}

impl ClientConfig {
    /// Load `.env` if present, then read `NEXUS_*` variables.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("NEXUS_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let timeout = match lookup("NEXUS_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                ClientError::Config(format!("NEXUS_TIMEOUT_SECS is not a number: {raw}"))
            })?),
            None => defaults.timeout,
        };

        let tc_precheck = match lookup("NEXUS_TC_PRECHECK") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ClientError::Config(format!("NEXUS_TC_PRECHECK is not a boolean: {raw}"))
            })?,
            None => defaults.tc_precheck,
        };

        Ok(Self {
            api_url,
            timeout,
            tc_precheck,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
