//! Fallback Orchestrator
//!
//! Drives one extraction call through the pipeline: normalize → build
//! prompt → invoke model → repair → validate, cascading across the
//! configured models on failure. Model invocations are strictly
//! sequential — the cascade is a fallback chain, not a race.
//!
//! Fallback rules: a low-confidence result and a missing credential are
//! terminal immediately (neither is fixed by a different model). Any other
//! failure may cascade to the fallback model when the caller opted in, and
//! a fallback-tier "model decommissioned" signal earns one extra attempt
//! against the emergency model. On exhaustion the last meaningful error is
//! returned unmodified.

use secrecy::SecretString;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::client::{CompletionClient, GroqClient};
use super::prompt::build_prompt;
use super::repair::RepairEngine;
use super::validate::{ValidatedRfq, validate_candidate};
use crate::config::{Config, ConfigLoader};
use crate::constants::network;
use crate::types::{
    FallbackDisposition, NormalizedInput, ParsedRfq, Result, RfqError, RfqInput, normalize_input,
};

/// Per-call options for [`RfqParser::parse`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// API key override. Falls back to the configured key, then to the
    /// provider key environment variable.
    pub api_key: Option<String>,
    /// Per-request timeout. Defaults to 30 seconds.
    pub timeout: Option<Duration>,
    /// Whether to retry against the fallback model when the primary fails
    /// for a non-confidence reason.
    pub use_model_fallback: bool,
}

/// The RFQ extraction pipeline.
pub struct RfqParser {
    config: Config,
    repair: RepairEngine,
}

impl RfqParser {
    pub fn new(config: Config) -> Self {
        let repair = RepairEngine::with_scrape_confidence(config.parsing.scrape_confidence);
        Self { config, repair }
    }

    /// Build a parser from the standard configuration chain
    /// (defaults → global → project → environment).
    pub fn from_default_config() -> Result<Self> {
        Ok(Self::new(ConfigLoader::load()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse an RFQ text (or an already-normalized input) into a validated
    /// [`ParsedRfq`].
    ///
    /// Credentials are resolved per call; the HTTP client lives no longer
    /// than the call itself.
    pub async fn parse(
        &self,
        input: impl Into<RfqInput>,
        options: &ParseOptions,
    ) -> Result<ParsedRfq> {
        let normalized = normalize_input(input);
        let api_key = resolve_api_key(
            options.api_key.as_deref(),
            self.config.llm.api_key.as_deref(),
        )?;
        let timeout = options
            .timeout
            .unwrap_or(Duration::from_millis(network::DEFAULT_TIMEOUT_MS));

        let client = GroqClient::new(&self.config.llm, api_key, timeout)?;
        self.parse_with_client(&client, &normalized, options).await
    }

    /// Parse using a caller-supplied completion client. This is the seam
    /// the cascade tests drive with mock clients.
    pub async fn parse_with_client(
        &self,
        client: &dyn CompletionClient,
        input: &NormalizedInput,
        options: &ParseOptions,
    ) -> Result<ParsedRfq> {
        let started = Instant::now();
        let cascade = &self.config.llm.models;

        info!(
            text_length = input.text.len(),
            has_file_context = input.file_context.is_some(),
            has_user_context = input.user_context.is_some(),
            "Starting RFQ parsing"
        );

        let prompt = build_prompt(input);

        let primary_error = match self.attempt(client, &cascade.primary, &prompt).await {
            Ok(validated) => {
                return Ok(self.finish(validated, cascade.primary.clone(), started));
            }
            Err(err) => err,
        };

        if !FallbackDisposition::classify(&primary_error).allows_fallback()
            || !options.use_model_fallback
        {
            return Err(primary_error);
        }

        warn!(
            error = %primary_error,
            fallback_model = %cascade.fallback,
            "Primary model failed, attempting fallback"
        );

        let fallback_error = match self.attempt(client, &cascade.fallback, &prompt).await {
            Ok(validated) => {
                return Ok(self.finish(validated, cascade.fallback.clone(), started));
            }
            Err(err) => err,
        };

        match FallbackDisposition::classify(&fallback_error) {
            FallbackDisposition::Decommissioned => {
                error!(
                    model = %cascade.fallback,
                    "Fallback model has been decommissioned, attempting emergency model"
                );
                match self.attempt(client, &cascade.emergency, &prompt).await {
                    Ok(validated) => {
                        let label = format!("{} (emergency fallback)", cascade.emergency);
                        Ok(self.finish(validated, label, started))
                    }
                    Err(emergency_error) => {
                        error!(error = %emergency_error, "Emergency fallback model also failed");
                        Err(fallback_error)
                    }
                }
            }
            _ => Err(fallback_error),
        }
    }

    /// One model attempt: invoke → repair → validate.
    async fn attempt(
        &self,
        client: &dyn CompletionClient,
        model: &str,
        prompt: &str,
    ) -> Result<ValidatedRfq> {
        let raw = client.complete(model, prompt).await?;

        let candidate = self.repair.recover(&raw).ok_or_else(|| {
            RfqError::parsing("response could not be parsed or repaired as JSON")
        })?;

        validate_candidate(&candidate, self.config.parsing.confidence_threshold)
    }

    fn finish(&self, validated: ValidatedRfq, model_used: String, started: Instant) -> ParsedRfq {
        let parsed = validated.into_parsed(model_used);
        info!(
            model = %parsed.model_used,
            processing_ms = started.elapsed().as_millis() as u64,
            material_confidence = parsed.material_confidence,
            industry_confidence = parsed.industry_confidence,
            "RFQ parsing completed successfully"
        );
        parsed
    }
}

/// Resolve the API key for one call: explicit override, then configured
/// key, then the provider environment variable. Empty strings never count.
fn resolve_api_key(explicit: Option<&str>, configured: Option<&str>) -> Result<SecretString> {
    let non_empty = |key: &&str| !key.trim().is_empty();
    explicit
        .filter(non_empty)
        .map(str::to_string)
        .or_else(|| configured.filter(non_empty).map(str::to_string))
        .or_else(|| {
            std::env::var(network::API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty())
        })
        .map(SecretString::from)
        .ok_or(RfqError::MissingCredential)
}

/// Parse an RFQ with the standard configuration chain. Convenience wrapper
/// over [`RfqParser`].
pub async fn parse_rfq(
    input: impl Into<RfqInput>,
    options: &ParseOptions,
) -> Result<ParsedRfq> {
    RfqParser::from_default_config()?.parse(input, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted client: each model name maps to a queue of canned outcomes.
    struct MockClient {
        responses: Mutex<HashMap<String, Vec<Result<String>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(self, model: &str, outcome: Result<String>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(model.to_string())
                .or_default()
                .push(outcome);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for MockClient {
        async fn complete(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.lock().unwrap().push(model.to_string());
            let mut responses = self.responses.lock().unwrap();
            let queue = responses
                .get_mut(model)
                .unwrap_or_else(|| panic!("unexpected call to model {}", model));
            assert!(!queue.is_empty(), "model {} called too many times", model);
            queue.remove(0)
        }

        fn provider(&self) -> &str {
            "mock"
        }
    }

    fn parser() -> RfqParser {
        RfqParser::new(Config::default())
    }

    fn good_response() -> String {
        json!({
            "material": "6061 Aluminum",
            "material_confidence": 0.95,
            "quantity": 50,
            "dimensions": {"length": 76.2, "width": 50.8, "height": 25.4},
            "complexity": "low",
            "deadline": "2023-05-15",
            "industry": "metal fabrication",
            "industry_confidence": 0.92,
            "finish": null,
            "tolerance": null
        })
        .to_string()
    }

    fn low_confidence_response() -> String {
        let mut value: serde_json::Value = serde_json::from_str(&good_response()).unwrap();
        value["material_confidence"] = json!(0.3);
        value.to_string()
    }

    fn decommissioned_error() -> RfqError {
        RfqError::service_with_status(
            "mock",
            "Error 400: Bad Request",
            400,
            Some(json!({"error": {"code": "model_decommissioned"}})),
        )
    }

    fn input() -> NormalizedInput {
        NormalizedInput::from_text(
            "Need 50 brackets, 6061 aluminum, 3in x 2in x 1in, 2 holes, due May 15",
        )
    }

    const PRIMARY: &str = "llama-3.3-70b-versatile";
    const FALLBACK: &str = "qwen-qwq-32b";
    const EMERGENCY: &str = "deepseek-r1-distill-llama-70b";

    #[tokio::test]
    async fn test_primary_success() {
        let client = MockClient::new().respond(PRIMARY, Ok(good_response()));
        let result = parser()
            .parse_with_client(&client, &input(), &ParseOptions::default())
            .await
            .unwrap();

        assert_eq!(result.model_used, PRIMARY);
        assert_eq!(result.parsing_version, "1.2.0");
        assert!(!result.is_reviewed);
        assert_eq!(result.dimensions.length, 76.2);
        assert_eq!(client.calls(), vec![PRIMARY]);
    }

    #[tokio::test]
    async fn test_low_confidence_never_falls_back() {
        let client = MockClient::new().respond(PRIMARY, Ok(low_confidence_response()));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let err = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, RfqError::LowConfidence { .. }));
        // The secondary model is never invoked even with fallback enabled.
        assert_eq!(client.calls(), vec![PRIMARY]);
    }

    #[tokio::test]
    async fn test_service_error_without_opt_in_does_not_fall_back() {
        let client =
            MockClient::new().respond(PRIMARY, Err(RfqError::service("mock", "boom")));
        let err = parser()
            .parse_with_client(&client, &input(), &ParseOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RfqError::ExternalService { .. }));
        assert_eq!(client.calls(), vec![PRIMARY]);
    }

    #[tokio::test]
    async fn test_timeout_triggers_fallback_when_opted_in() {
        let client = MockClient::new()
            .respond(
                PRIMARY,
                Err(RfqError::timeout("mock", Duration::from_secs(30))),
            )
            .respond(FALLBACK, Ok(good_response()));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let result = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap();

        assert_eq!(result.model_used, FALLBACK);
        assert_eq!(client.calls(), vec![PRIMARY, FALLBACK]);
    }

    #[tokio::test]
    async fn test_unparseable_response_triggers_fallback() {
        let client = MockClient::new()
            .respond(PRIMARY, Ok("I am not JSON at all.".to_string()))
            .respond(FALLBACK, Ok(good_response()));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let result = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap();

        assert_eq!(result.model_used, FALLBACK);
    }

    #[tokio::test]
    async fn test_decommissioned_fallback_invokes_emergency_model() {
        let client = MockClient::new()
            .respond(PRIMARY, Err(RfqError::service("mock", "boom")))
            .respond(FALLBACK, Err(decommissioned_error()))
            .respond(EMERGENCY, Ok(good_response()));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let result = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap();

        assert_eq!(
            result.model_used,
            "deepseek-r1-distill-llama-70b (emergency fallback)"
        );
        assert_eq!(client.calls(), vec![PRIMARY, FALLBACK, EMERGENCY]);
    }

    #[tokio::test]
    async fn test_emergency_failure_rethrows_decommissioned_error() {
        let client = MockClient::new()
            .respond(PRIMARY, Err(RfqError::service("mock", "boom")))
            .respond(FALLBACK, Err(decommissioned_error()))
            .respond(EMERGENCY, Err(RfqError::service("mock", "down too")));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let err = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap_err();

        // The last meaningful error is the fallback's decommissioned
        // failure, not a generic wrapper.
        match err {
            RfqError::ExternalService { status, .. } => assert_eq!(status, Some(400)),
            other => panic!("expected external-service error, got {:?}", other),
        }
        assert_eq!(client.calls(), vec![PRIMARY, FALLBACK, EMERGENCY]);
    }

    #[tokio::test]
    async fn test_plain_fallback_failure_does_not_invoke_emergency() {
        let client = MockClient::new()
            .respond(PRIMARY, Err(RfqError::service("mock", "boom")))
            .respond(FALLBACK, Err(RfqError::service("mock", "also boom")));
        let options = ParseOptions {
            use_model_fallback: true,
            ..Default::default()
        };
        let err = parser()
            .parse_with_client(&client, &input(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, RfqError::ExternalService { .. }));
        assert_eq!(client.calls(), vec![PRIMARY, FALLBACK]);
    }

    #[tokio::test]
    async fn test_scraped_response_clears_default_gate() {
        // Prose with recognizable fields: the scraper synthesizes a
        // candidate with 0.6 confidences, which exactly clears the default
        // 0.6 threshold.
        let client = MockClient::new().respond(
            PRIMARY,
            Ok("industry: \"cnc machining\", quantity: 25".to_string()),
        );
        let result = parser()
            .parse_with_client(&client, &input(), &ParseOptions::default())
            .await
            .unwrap();

        assert_eq!(result.industry.as_str(), "cnc machining");
        assert_eq!(result.quantity, 25.0);
        assert_eq!(result.material_confidence, 0.6);
    }

    #[tokio::test]
    async fn test_scraped_response_fails_stricter_gate() {
        let mut config = Config::default();
        config.parsing.confidence_threshold = 0.7;
        let client = MockClient::new().respond(
            PRIMARY,
            Ok("industry: \"cnc machining\", quantity: 25".to_string()),
        );
        let err = RfqParser::new(config)
            .parse_with_client(&client, &input(), &ParseOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RfqError::LowConfidence { .. }));
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit() {
        let key = resolve_api_key(Some("gsk_explicit"), Some("gsk_configured")).unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(key.expose_secret(), "gsk_explicit");
    }

    #[test]
    fn test_resolve_api_key_ignores_empty() {
        let key = resolve_api_key(Some("   "), Some("gsk_configured")).unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(key.expose_secret(), "gsk_configured");
    }
}
