//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Parsing pipeline constants
pub mod parsing {
    /// Current version of the parsing logic, stamped on every result.
    pub const PARSING_VERSION: &str = "1.2.0";

    /// Minimum confidence score for accepting a parsed field.
    ///
    /// The gate is strict (`< threshold` fails), so the text scraper's
    /// default confidence of exactly this value clears the default gate.
    pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

    /// Confidence assigned to fields recovered by the last-resort text
    /// scraper. Tunable: raise the threshold above this value to make
    /// scraped results always fail the gate.
    pub const SCRAPE_CONFIDENCE: f64 = 0.6;

    /// Confidence substituted when the model emits a malformed score.
    pub const DEFAULT_CONFIDENCE: f64 = 0.5;
}

/// Model cascade defaults
pub mod models {
    /// Primary extraction model.
    pub const PRIMARY: &str = "llama-3.3-70b-versatile";

    /// Fallback model attempted when the primary fails for a
    /// non-confidence reason.
    pub const FALLBACK: &str = "qwen-qwq-32b";

    /// Emergency model attempted only when the fallback model is reported
    /// decommissioned by the provider.
    pub const EMERGENCY: &str = "deepseek-r1-distill-llama-70b";
}

/// HTTP/Network constants
pub mod network {
    /// OpenAI-compatible completion endpoint base.
    pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

    /// Environment variable holding the provider API key.
    pub const API_KEY_ENV: &str = "GROQ_API_KEY";

    /// Default per-request timeout (milliseconds).
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    /// Sampling temperature. Kept low to bias toward deterministic
    /// structured output.
    pub const TEMPERATURE: f32 = 0.1;

    /// Maximum completion tokens per request.
    pub const MAX_COMPLETION_TOKENS: usize = 1024;

    /// Nucleus sampling parameter.
    pub const TOP_P: f32 = 0.95;
}
