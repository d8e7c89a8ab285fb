use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::bond::DecaySettings;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThymosConfig {
    pub engine: EngineConfig,
    pub llm: LlmConfig,
    pub bonds: DecaySettings,
    pub proactive: ProactiveDefaults,
    pub gateway: GatewayConfig,
    pub store: StoreConfig,
}

impl ThymosConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ThymosConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.bonds = config.bonds.sanitized();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEYS") {
            self.llm.api_keys = v
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("THYMOS_DEEP_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.engine.deep_path_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("THYMOS_HTTP_ADDR") {
            self.gateway.addr = v;
        }
        if let Ok(v) = std::env::var("THYMOS_DB_PATH") {
            self.store.db_path = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Complexity score at or above which a message takes the deep (LLM) path.
    pub deep_path_threshold: f32,
    /// Per-update relaxation of emotions toward neutral.
    pub decay_rate: f32,
    /// Resistance of the emotional state to incoming deltas.
    pub inertia: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deep_path_threshold: 0.5,
            decay_rate: 0.05,
            inertia: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Rotated on quota errors; "mock" short-circuits to the built-in fake.
    pub api_keys: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: None,
            max_tokens: 1024,
            temperature: 0.3,
            api_keys: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProactiveDefaults {
    pub scan_interval_secs: u64,
    pub cooldown_hours: i64,
    pub max_per_day: u32,
}

impl Default for ProactiveDefaults {
    fn default() -> Self {
        Self {
            scan_interval_secs: 300,
            cooldown_hours: 12,
            max_per_day: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub addr: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8087".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "thymos.db".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ThymosConfig::default();
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.max_tokens, 1024);
        assert_eq!(cfg.engine.deep_path_threshold, 0.5);
        assert_eq!(cfg.bonds.warning_days, 30);
        assert_eq!(cfg.proactive.cooldown_hours, 12);
        assert!(cfg.llm.api_keys.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[llm]
provider = "openai"
model = "gpt-4o-mini"
"#;
        let cfg: ThymosConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        // Defaults for unspecified fields
        assert_eq!(cfg.llm.temperature, 0.3);
        assert_eq!(cfg.store.db_path, "thymos.db");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[engine]
deep_path_threshold = 0.65
decay_rate = 0.1
inertia = 0.2

[llm]
provider = "gemini"
model = "gemini-2.0-pro"
max_tokens = 2048
temperature = 0.5
api_keys = ["key-a", "key-b"]

[bonds]
warning_days = 14
dormant_days = 28
fragile_days = 42
release_days = 56

[proactive]
scan_interval_secs = 60
cooldown_hours = 6
max_per_day = 5

[gateway]
addr = "0.0.0.0:9090"

[store]
db_path = "data/thymos.db"
"#;
        let cfg: ThymosConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.engine.deep_path_threshold, 0.65);
        assert_eq!(cfg.llm.api_keys.len(), 2);
        assert_eq!(cfg.bonds.release_days, 56);
        assert_eq!(cfg.proactive.max_per_day, 5);
        assert_eq!(cfg.gateway.addr, "0.0.0.0:9090");
        assert_eq!(cfg.store.db_path, "data/thymos.db");
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        // Part 1: env overrides
        std::env::set_var("LLM_PROVIDER", "mock");
        std::env::set_var("GEMINI_API_KEYS", "k1, k2 ,k3");
        std::env::set_var("THYMOS_DEEP_THRESHOLD", "0.8");

        let mut cfg = ThymosConfig::default();
        cfg.apply_env_overrides();

        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.api_keys, vec!["k1", "k2", "k3"]);
        assert_eq!(cfg.engine.deep_path_threshold, 0.8);

        // Clean up env vars before testing defaults
        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("GEMINI_API_KEYS");
        std::env::remove_var("THYMOS_DEEP_THRESHOLD");

        // Part 2: nonexistent path returns defaults (no env interference)
        let cfg = ThymosConfig::load_or_default("/nonexistent/path.toml");
        assert_eq!(cfg.llm.provider, "gemini");
    }
}
