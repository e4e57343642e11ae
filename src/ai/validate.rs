//! Schema Validation and Confidence Gating
//!
//! Converts an untrusted JSON candidate, field by field, into the closed
//! [`ValidatedRfq`] shape. Partially-typed data never crosses this module
//! boundary: everything downstream of here is strictly typed.
//!
//! Failure policy is deliberately asymmetric. `complexity` silently
//! defaults to `medium` (it only feeds pricing heuristics), while an
//! out-of-taxonomy `industry` is a hard failure — industry routes the RFQ
//! to an entirely different downstream form, so a silent default is
//! unacceptable.

use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::parsing;
use crate::types::{Complexity, Dimensions, Industry, ParsedRfq, Result, RfqError};

const REQUIRED_FIELDS: [&str; 6] = [
    "material",
    "quantity",
    "dimensions",
    "complexity",
    "deadline",
    "industry",
];

/// The validated core of a parse result, before enrichment with call
/// metadata. Produced only by [`validate_candidate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRfq {
    pub material: String,
    pub material_confidence: f64,
    pub quantity: f64,
    pub dimensions: Dimensions,
    pub complexity: Complexity,
    pub deadline: String,
    pub industry: Industry,
    pub industry_confidence: f64,
    pub finish: Option<String>,
    pub tolerance: Option<String>,
}

impl ValidatedRfq {
    /// Enrich into the final caller-facing record.
    pub fn into_parsed(self, model_used: impl Into<String>) -> ParsedRfq {
        ParsedRfq {
            material: self.material,
            material_confidence: self.material_confidence,
            quantity: self.quantity,
            dimensions: self.dimensions,
            complexity: self.complexity,
            deadline: self.deadline,
            industry: self.industry,
            industry_confidence: self.industry_confidence,
            finish: self.finish,
            tolerance: self.tolerance,
            model_used: model_used.into(),
            parsing_version: parsing::PARSING_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            is_reviewed: false,
        }
    }
}

/// Validate an untrusted candidate against the RFQ schema and the
/// confidence threshold.
pub fn validate_candidate(candidate: &Value, threshold: f64) -> Result<ValidatedRfq> {
    let Some(object) = candidate.as_object() else {
        return Err(RfqError::parsing("response is not a JSON object"));
    };

    debug!(
        fields = %object.keys().cloned().collect::<Vec<_>>().join(","),
        "Validating candidate"
    );

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(RfqError::parsing_field(
                field,
                format!("missing required field: {}", field),
            ));
        }
    }

    let material = object["material"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| RfqError::parsing_field("material", "material must be a string"))?;

    let quantity = coerce_number(&object["quantity"])
        .ok_or_else(|| RfqError::parsing_field("quantity", "quantity must be a number"))?;

    let dimensions = validate_dimensions(&object["dimensions"]);

    let complexity = match object["complexity"].as_str().and_then(Complexity::try_parse) {
        Some(complexity) => complexity,
        None => {
            warn!(
                provided = %object["complexity"],
                "Invalid complexity value, defaulting to medium"
            );
            Complexity::Medium
        }
    };

    let deadline = match &object["deadline"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(RfqError::parsing_field(
                "deadline",
                format!("deadline must be a string, got {}", other),
            ));
        }
    };

    let industry = object["industry"]
        .as_str()
        .and_then(Industry::try_parse)
        .ok_or_else(|| {
            RfqError::parsing_field(
                "industry",
                format!(
                    "industry must be one of: {}",
                    Industry::ALL.map(|i| i.as_str()).join(", ")
                ),
            )
        })?;

    let material_confidence = validate_confidence(object.get("material_confidence"), "material");
    let industry_confidence = validate_confidence(object.get("industry_confidence"), "industry");

    // The confidence gate is terminal for the whole cascade: low confidence
    // reflects ambiguity in the input, not model availability.
    if material_confidence < threshold || industry_confidence < threshold {
        return Err(RfqError::LowConfidence {
            candidate: Box::new(candidate.clone()),
            material_confidence,
            industry_confidence,
            threshold,
        });
    }

    Ok(ValidatedRfq {
        material,
        material_confidence,
        quantity,
        dimensions,
        complexity,
        deadline,
        industry,
        industry_confidence,
        finish: optional_string(object.get("finish"))
            .or_else(|| optional_string(object.get("surface_finish"))),
        tolerance: optional_string(object.get("tolerance")),
    })
}

/// Coerce a numeric-looking value: numbers pass through, numeric strings
/// parse. Anything else (including NaN) is `None`.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Validate the dimensions object. Missing or non-object input is replaced
/// wholesale with zeros; individual garbled components default to zero.
/// Never fails — downstream code relies on every component being finite.
fn validate_dimensions(value: &Value) -> Dimensions {
    let Some(object) = value.as_object() else {
        warn!(provided = %value, "Missing or invalid dimensions, defaulting to zeros");
        return Dimensions::ZERO;
    };

    let component = |key: &str| -> f64 {
        match object.get(key) {
            Some(v) => coerce_number(v).unwrap_or_else(|| {
                warn!(dimension = key, provided = %v, "Invalid dimension, defaulting to 0");
                0.0
            }),
            None => {
                warn!(dimension = key, "Missing dimension, defaulting to 0");
                0.0
            }
        }
    };

    Dimensions {
        length: component("length"),
        width: component("width"),
        height: component("height"),
    }
}

/// Confidence scores are diagnostic, not structural: malformed scores
/// default rather than fail.
fn validate_confidence(value: Option<&Value>, field: &str) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(score) if (0.0..=1.0).contains(&score) => score,
        _ => {
            let fallback = Value::Null;
            warn!(
                field,
                provided = %value.unwrap_or(&fallback),
                "Invalid confidence score, defaulting to {}",
                parsing::DEFAULT_CONFIDENCE
            );
            parsing::DEFAULT_CONFIDENCE
        }
    }
}

/// Empty or null optional strings become `None`.
fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
