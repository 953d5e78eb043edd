// ⚙️ Service configuration from environment variables

use crate::features::FormulaSet;
use crate::model::DEFAULT_MODEL_PATH;
use anyhow::{anyhow, Result};
use std::path::PathBuf;

pub const ENV_HOST: &str = "CREDIT_RISK_HOST";
pub const ENV_PORT: &str = "CREDIT_RISK_PORT";
pub const ENV_MODEL_PATH: &str = "CREDIT_RISK_MODEL_PATH";
pub const ENV_FORMULAS: &str = "CREDIT_RISK_FORMULAS";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub formulas: FormulaSet,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            formulas: FormulaSet::Guarded,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ServiceConfig::default();

        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }

        if let Some(port) = lookup(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        }

        if let Some(path) = lookup(ENV_MODEL_PATH) {
            config.model_path = PathBuf::from(path);
        }

        if let Some(formulas) = lookup(ENV_FORMULAS) {
            config.formulas = FormulaSet::parse(&formulas).ok_or_else(|| {
                anyhow!("{} must be 'guarded' or 'legacy', got '{}'", ENV_FORMULAS, formulas)
            })?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
