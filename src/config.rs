use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub agent_runtime: AgentRuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on live sessions; the least-recently-touched session is
    /// evicted when the bound is exceeded.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Connection settings for the hosted multi-agent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRuntimeConfig {
    #[serde(default = "default_runtime_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_sessions() -> usize {
    1024
}

fn default_runtime_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Configuration without a file: serde defaults plus env overrides.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Secrets and deploy-specific settings come from the environment even
    /// when a config file is present.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("AGENT_RUNTIME_URL") {
            self.agent_runtime.base_url = url;
        }
        if let Ok(key) = std::env::var("AGENT_RUNTIME_API_KEY") {
            self.agent_runtime.api_key = Some(key);
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.system_config.port = port;
            }
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for AgentRuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_runtime_url(),
            api_key: None,
            model: default_model(),
        }
    }
}
