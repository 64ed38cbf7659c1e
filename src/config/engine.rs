//! Engine configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::core::model::CompanyId;
use crate::core::policy::CompanySettings;
use crate::core::AppResult;

/// Path to a JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "CREDIT_LEDGER_CONFIG";
/// Override for [`EngineConfig::default_timeout_ms`].
pub const TIMEOUT_VAR: &str = "CREDIT_LEDGER_DEFAULT_TIMEOUT_MS";
/// Override for [`EngineConfig::audit_buffer`].
pub const AUDIT_BUFFER_VAR: &str = "CREDIT_LEDGER_AUDIT_BUFFER";

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for calls that do not carry their own, in milliseconds.
    pub default_timeout_ms: u64,
    /// Audit records kept in memory.
    pub audit_buffer: usize,
    /// Lock table size that triggers pruning of idle keys.
    pub lock_prune_threshold: usize,
    /// Scheduling rules keyed by company id.
    pub companies: HashMap<CompanyId, CompanySettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            audit_buffer: 1_024,
            lock_prune_threshold: 1_024,
            companies: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_timeout_ms == 0 {
            return Err("default_timeout_ms must be greater than 0".into());
        }
        if self.audit_buffer == 0 {
            return Err("audit_buffer must be greater than 0".into());
        }
        if self.lock_prune_threshold == 0 {
            return Err("lock_prune_threshold must be greater than 0".into());
        }
        for (name, company) in &self.companies {
            if company.max_class_assistants == Some(0) {
                return Err(format!(
                    "company `{name}` invalid: max_class_assistants must be greater than 0"
                ));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file is read first if present. `CREDIT_LEDGER_CONFIG` names a
    /// JSON file; otherwise defaults apply. Individual variables override
    /// either source.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let mut cfg = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {CONFIG_PATH_VAR} at {path}"))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(raw) = std::env::var(TIMEOUT_VAR) {
            cfg.default_timeout_ms = raw
                .parse()
                .with_context(|| format!("{TIMEOUT_VAR} must be an integer"))?;
        }
        if let Ok(raw) = std::env::var(AUDIT_BUFFER_VAR) {
            cfg.audit_buffer = raw
                .parse()
                .with_context(|| format!("{AUDIT_BUFFER_VAR} must be an integer"))?;
        }

        cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;
        Ok(cfg)
    }

    /// Default deadline as a duration.
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert_eq!(EngineConfig::default().default_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = EngineConfig {
            default_timeout_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            "default_timeout_ms must be greater than 0"
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{"audit_buffer": 8}"#).unwrap();
        assert_eq!(cfg.audit_buffer, 8);
        assert_eq!(cfg.default_timeout_ms, 5_000);
        assert!(cfg.companies.is_empty());
    }
}
