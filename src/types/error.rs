//! Unified Error Type System
//!
//! One closed taxonomy for the whole extraction pipeline. The four kinds a
//! caller of `parse` can observe are `MissingCredential`, `Parsing`,
//! `LowConfidence` and `ExternalService`; the remaining variants belong to
//! the ambient config and storage layers and never escape `parse`.
//!
//! The fallback orchestrator never inspects provider error bodies ad hoc:
//! every failure is classified exactly once into a [`FallbackDisposition`]
//! that says whether another model may be attempted.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, Error)]
pub enum RfqError {
    /// No API key available. Fatal: a different model will not fix a missing
    /// credential, so this never triggers fallback.
    #[error("API key is missing: pass one explicitly or set the provider key environment variable")]
    MissingCredential,

    /// The repaired/validated JSON is structurally unusable: a required
    /// field is absent, has the wrong primitive type, or `industry` is
    /// outside the closed enumeration.
    #[error("failed to parse model response: {message}")]
    Parsing {
        message: String,
        /// The offending field, when the failure is attributable to one.
        field: Option<String>,
    },

    /// Validation succeeded structurally but one or both confidence scores
    /// fell below the threshold. Carries the full candidate for caller-side
    /// review workflows. Terminal: ambiguity in the input is not fixed by a
    /// different model.
    #[error(
        "low confidence in parsing results: material {material_confidence:.2}, industry {industry_confidence:.2} (threshold {threshold:.2})"
    )]
    LowConfidence {
        candidate: Box<Value>,
        material_confidence: f64,
        industry_confidence: f64,
        threshold: f64,
    },

    /// The provider call failed at the transport/HTTP layer: non-2xx,
    /// malformed envelope, or timeout. Eligible for fallback.
    #[error("{provider} error: {message}")]
    ExternalService {
        provider: String,
        message: String,
        /// HTTP status, when the failure had one.
        status: Option<u16>,
        /// Structured error body from the provider, when parseable.
        details: Option<Value>,
        /// True when the failure was the request deadline expiring.
        timeout: bool,
    },

    /// Configuration loading/validation failure (ambient layer only).
    #[error("config error: {0}")]
    Config(String),

    /// Draft store failure (ambient layer only).
    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RfqError>;

impl RfqError {
    /// Create a parsing error without field attribution.
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
            field: None,
        }
    }

    /// Create a parsing error attributed to a specific field.
    pub fn parsing_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an external-service error without an HTTP status.
    pub fn service(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            provider: provider.into(),
            message: message.into(),
            status: None,
            details: None,
            timeout: false,
        }
    }

    /// Create an external-service error carrying the HTTP status and the
    /// provider's structured error body.
    pub fn service_with_status(
        provider: impl Into<String>,
        message: impl Into<String>,
        status: u16,
        details: Option<Value>,
    ) -> Self {
        Self::ExternalService {
            provider: provider.into(),
            message: message.into(),
            status: Some(status),
            details,
            timeout: false,
        }
    }

    /// Create the timeout-flavored external-service error.
    pub fn timeout(provider: impl Into<String>, duration: Duration) -> Self {
        Self::ExternalService {
            provider: provider.into(),
            message: format!("request timed out after {}ms", duration.as_millis()),
            status: None,
            details: None,
            timeout: true,
        }
    }

    /// True when this is the timeout-flavored external-service error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ExternalService { timeout: true, .. })
    }
}

// =============================================================================
// Fallback Classification
// =============================================================================

/// What the orchestrator may do after a failed model attempt.
///
/// Classification happens once per failure, immediately after it surfaces;
/// the decommissioned-model special case is detected here and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDisposition {
    /// Do not attempt another model: ambiguous input or misconfiguration.
    Terminal,
    /// Another model may be attempted (when the caller opted in).
    Fallback,
    /// The provider reported the model as decommissioned; the emergency
    /// model is warranted.
    Decommissioned,
}

impl FallbackDisposition {
    pub fn classify(error: &RfqError) -> Self {
        match error {
            RfqError::MissingCredential
            | RfqError::LowConfidence { .. }
            | RfqError::Config(_)
            | RfqError::Storage(_)
            | RfqError::Database(_) => Self::Terminal,
            RfqError::ExternalService { details, .. } => {
                if is_model_decommissioned(details.as_ref()) {
                    Self::Decommissioned
                } else {
                    Self::Fallback
                }
            }
            RfqError::Parsing { .. } => Self::Fallback,
        }
    }

    /// True unless the failure is terminal.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::Terminal)
    }
}

/// Detect the provider's "model decommissioned" signal inside a structured
/// error body (`{"error": {"code": "model_decommissioned", ...}}`).
fn is_model_decommissioned(details: Option<&Value>) -> bool {
    details
        .and_then(|d| d.get("error"))
        .and_then(|e| e.get("code"))
        .and_then(|c| c.as_str())
        .is_some_and(|code| code == "model_decommissioned")
}

// =============================================================================
// Tests
// =============================================================================
