//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/gendra/) and project (.gendra/) level
//! configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{models, network, parsing};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Parsing/validation settings
    pub parsing: ParsingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            parsing: ParsingConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `RfqError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::RfqError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_ms == 0 {
            return Err(crate::types::RfqError::Config(
                "LLM timeout_ms must be greater than 0".to_string(),
            ));
        }

        if url::Url::parse(&self.llm.api_base).is_err() {
            return Err(crate::types::RfqError::Config(format!(
                "LLM api_base is not a valid URL: {}",
                self.llm.api_base
            )));
        }

        for (name, value) in [
            ("confidence_threshold", self.parsing.confidence_threshold),
            ("scrape_confidence", self.parsing.scrape_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::types::RfqError::Config(format!(
                    "parsing.{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// The ordered model cascade for one extraction call.
///
/// Explicit configuration rather than hardcoded literals, so the cascade is
/// testable against mock endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCascade {
    pub primary: String,
    pub fallback: String,
    pub emergency: String,
}

impl Default for ModelCascade {
    fn default() -> Self {
        Self {
            primary: models::PRIMARY.to_string(),
            fallback: models::FALLBACK.to_string(),
            emergency: models::EMERGENCY.to_string(),
        }
    }
}

/// LLM provider settings.
///
/// Note: API keys are handled securely - never serialized to output and
/// redacted in debug output. The client converts the key to SecretString
/// for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub api_base: String,
    /// Ordered model cascade
    pub models: ModelCascade,
    /// Sampling temperature (kept low for structured output)
    pub temperature: f32,
    /// Maximum completion tokens per request
    pub max_tokens: usize,
    /// Nucleus sampling parameter
    pub top_p: f32,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// API key override. Never serialized to output for security.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("models", &self.models)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: network::DEFAULT_API_BASE.to_string(),
            models: ModelCascade::default(),
            temperature: network::TEMPERATURE,
            max_tokens: network::MAX_COMPLETION_TOKENS,
            top_p: network::TOP_P,
            timeout_ms: network::DEFAULT_TIMEOUT_MS,
            api_key: None,
        }
    }
}

// =============================================================================
// Parsing Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Minimum confidence score for accepting a parsed result
    pub confidence_threshold: f64,
    /// Confidence assigned to fields recovered by the text scraper
    pub scrape_confidence: f64,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: parsing::CONFIDENCE_THRESHOLD,
            scrape_confidence: parsing::SCRAPE_CONFIDENCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = Config::default();
        config.parsing.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_api_base_rejected() {
        let mut config = Config::default();
        config.llm.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_in_debug() {
        let config = LlmConfig {
            api_key: Some("gsk_secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_default_cascade_models() {
        let cascade = ModelCascade::default();
        assert_eq!(cascade.primary, "llama-3.3-70b-versatile");
        assert_eq!(cascade.fallback, "qwen-qwq-32b");
        assert_eq!(cascade.emergency, "deepseek-r1-distill-llama-70b");
    }
}
