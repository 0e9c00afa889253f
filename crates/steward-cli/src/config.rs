//! Configuration loading for the steward CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use steward_client::{AuthConfig, SecureString, SplunkConfig};
use steward_core::paths::{ApiContext, SECURITY_SUITE_APP};

/// Environment variable that overrides the configured token.
pub const TOKEN_ENV: &str = "STEWARD_SPLUNK_TOKEN";

/// Application configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection settings for the Splunk management port.
    pub splunk: SplunkConfig,

    /// Optional API path overrides.
    #[serde(default)]
    pub api: ApiSettings,
}

/// Overrides for the namespace/user/app path components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub app: Option<String>,
}

impl AppConfig {
    /// Loads configuration from a file, then applies the token environment
    /// override so secrets can stay out of the file entirely.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.splunk.auth = AuthConfig::BearerToken {
                token: SecureString::new(token),
            };
        }
        Ok(config)
    }

    /// API context for the resources hosted under the default app, with any
    /// configured overrides applied.
    pub fn context(&self) -> ApiContext {
        self.merge(ApiContext::default())
    }

    /// API context for the findings read path, which defaults to the ES
    /// suite app instead.
    pub fn findings_context(&self) -> ApiContext {
        let mut ctx = self.merge(ApiContext::default());
        ctx.app = self
            .api
            .app
            .clone()
            .unwrap_or_else(|| SECURITY_SUITE_APP.to_string());
        ctx
    }

    fn merge(&self, mut ctx: ApiContext) -> ApiContext {
        if let Some(namespace) = &self.api.namespace {
            ctx.namespace = namespace.clone();
        }
        if let Some(user) = &self.api.user {
            ctx.user = user.clone();
        }
        if let Some(app) = &self.api.app {
            ctx.app = app.clone();
        }
        ctx
    }
}
