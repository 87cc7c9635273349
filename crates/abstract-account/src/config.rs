//! Engine configuration.
//!
//! Loaded from a JSON file; any field left out takes its default:
//!
//! ```json
//! { "anchor_retention_secs": 3600, "fetch_timeout_ms": 5000,
//!   "audience_issuers": { "project-test": "stytch.com/project-test" } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Tunables for the resolver cache, the parser and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trust anchors unused for longer than this are evicted.
    pub anchor_retention_secs: u64,
    /// Upper bound on a key-source fetch during a cache miss.
    pub fetch_timeout_ms: u64,
    /// Maximum number of cached trust anchors.
    pub max_anchors: usize,
    /// Credentials larger than this are rejected unparsed.
    pub max_credential_bytes: usize,
    /// Maximum registration salt length.
    pub max_salt_bytes: usize,
    /// After a key-source timeout, further misses for that issuer fail
    /// immediately for this long. 0 disables the backoff.
    pub unreachable_backoff_secs: u64,
    /// Issuer trusted for an external-claim authenticator that names only
    /// its audience, keyed by audience.
    pub audience_issuers: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anchor_retention_secs: 3600,
            fetch_timeout_ms: 5000,
            max_anchors: 256,
            max_credential_bytes: 8 * 1024,
            max_salt_bytes: 64,
            unreachable_backoff_secs: 30,
            audience_issuers: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AuthError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(AuthError::Config("fetch_timeout_ms must be > 0".into()));
        }
        if self.max_anchors == 0 {
            return Err(AuthError::Config("max_anchors must be > 0".into()));
        }
        if self.max_credential_bytes == 0 {
            return Err(AuthError::Config("max_credential_bytes must be > 0".into()));
        }
        if self.max_salt_bytes == 0 {
            return Err(AuthError::Config("max_salt_bytes must be > 0".into()));
        }
        if let Some((aud, _)) = self
            .audience_issuers
            .iter()
            .find(|(aud, iss)| aud.is_empty() || iss.is_empty())
        {
            return Err(AuthError::Config(format!(
                "audience_issuers entry '{aud}' must name a non-empty audience and issuer"
            )));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Issuer configured for `audience`, if any.
    pub fn issuer_for_audience(&self, audience: &str) -> Option<&str> {
        self.audience_issuers.get(audience).map(String::as_str)
    }
}
