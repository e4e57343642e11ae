//! RFQ Domain Types
//!
//! The closed, validated shape of an extracted manufacturing RFQ, plus the
//! normalized input record the pipeline consumes. A `ParsedRfq` only ever
//! exists after full schema validation and confidence gating — untrusted
//! model output lives as `serde_json::Value` until then.

use serde::{Deserialize, Serialize};

// =============================================================================
// Closed Enumerations
// =============================================================================

/// Manufacturing industry category.
///
/// Closed enumeration: industry drives routing to downstream quote forms, so
/// any value outside this set is rejected during validation rather than
/// defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    #[serde(rename = "metal fabrication")]
    MetalFabrication,
    #[serde(rename = "injection molding")]
    InjectionMolding,
    #[serde(rename = "cnc machining")]
    CncMachining,
    #[serde(rename = "sheet metal")]
    SheetMetal,
    #[serde(rename = "electronics assembly")]
    ElectronicsAssembly,
}

impl Industry {
    /// Every supported industry, in prompt/documentation order.
    pub const ALL: [Industry; 5] = [
        Industry::MetalFabrication,
        Industry::InjectionMolding,
        Industry::CncMachining,
        Industry::SheetMetal,
        Industry::ElectronicsAssembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::MetalFabrication => "metal fabrication",
            Industry::InjectionMolding => "injection molding",
            Industry::CncMachining => "cnc machining",
            Industry::SheetMetal => "sheet metal",
            Industry::ElectronicsAssembly => "electronics assembly",
        }
    }

    /// Case-insensitive parse against the closed set. Returns `None` for any
    /// value outside the enumeration.
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metal fabrication" => Some(Industry::MetalFabrication),
            "injection molding" => Some(Industry::InjectionMolding),
            "cnc machining" => Some(Industry::CncMachining),
            "sheet metal" => Some(Industry::SheetMetal),
            "electronics assembly" => Some(Industry::ElectronicsAssembly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Manufacturing complexity level.
///
/// Best-effort field: invalid values are defaulted to `Medium` during
/// validation (with a warning) instead of failing the parse, since complexity
/// only feeds pricing heuristics downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    /// Case-insensitive parse. Returns `None` for out-of-enum values.
    pub fn try_parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Complexity::Low),
            "medium" => Some(Complexity::Medium),
            "high" => Some(Complexity::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Dimensions
// =============================================================================

/// Part dimensions in millimeters.
///
/// Invariant: after validation every component is a finite number. Missing or
/// garbled components default to `0.0` rather than failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const ZERO: Dimensions = Dimensions {
        length: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// True when every component is a finite number (never NaN/infinite).
    pub fn is_finite(&self) -> bool {
        self.length.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

// =============================================================================
// Parsed RFQ
// =============================================================================

/// Structured data extracted from an RFQ text, after validation and
/// confidence gating.
///
/// Field names serialize to the wire format the downstream quote forms
/// expect (`modelUsed` camelCase included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRfq {
    /// Precise material specification, e.g. "6061-T6 Aluminum".
    pub material: String,
    /// Model-reported confidence in the material identification, in [0, 1].
    pub material_confidence: f64,
    /// Number of units requested.
    pub quantity: f64,
    /// Part dimensions, always in millimeters.
    pub dimensions: Dimensions,
    pub complexity: Complexity,
    /// Deadline date, ISO-8601 (YYYY-MM-DD) when the model complies;
    /// passed through otherwise.
    pub deadline: String,
    pub industry: Industry,
    /// Model-reported confidence in the industry classification, in [0, 1].
    pub industry_confidence: f64,
    /// Surface finish requirements, e.g. "anodized".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    /// Tolerance specifications, e.g. "±0.1mm".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,

    /// Which model produced this result (annotated when an emergency
    /// fallback was used).
    #[serde(rename = "modelUsed")]
    pub model_used: String,
    /// Version of the parsing pipeline that produced this result.
    pub parsing_version: String,
    /// RFC 3339 timestamp of when parsing occurred.
    pub timestamp: String,
    /// Whether a human has reviewed the result. Always false at creation.
    pub is_reviewed: bool,
}

// =============================================================================
// Normalized Input
// =============================================================================

/// Context about the uploaded document the RFQ text was pulled from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

/// Context about the requesting user, used only as a soft hint in the
/// prompt, never as a hard override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_industry: Option<String>,
}

/// Canonical input record for one extraction call.
///
/// Built once per call by [`normalize_input`], immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedInput {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_context: Option<FileContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context: Option<UserContext>,
}

impl NormalizedInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            file_context: None,
            user_context: None,
        }
    }
}

/// Either shape the public entry point accepts: bare text or an
/// already-normalized record.
#[derive(Debug, Clone)]
pub enum RfqInput {
    Text(String),
    Normalized(NormalizedInput),
}

impl From<&str> for RfqInput {
    fn from(s: &str) -> Self {
        RfqInput::Text(s.to_string())
    }
}

impl From<String> for RfqInput {
    fn from(s: String) -> Self {
        RfqInput::Text(s)
    }
}

impl From<NormalizedInput> for RfqInput {
    fn from(n: NormalizedInput) -> Self {
        RfqInput::Normalized(n)
    }
}

/// Coerce raw text or an already-normalized record into one canonical
/// [`NormalizedInput`]. Bare text is trimmed and wrapped; normalized input
/// passes through untouched. Empty text is not rejected here — that is the
/// caller's concern.
pub fn normalize_input(input: impl Into<RfqInput>) -> NormalizedInput {
    match input.into() {
        RfqInput::Text(text) => NormalizedInput::from_text(text),
        RfqInput::Normalized(normalized) => normalized,
    }
}

// =============================================================================
// Draft Record (persistence collaborator)
// =============================================================================

/// A completed parse bundled with its source text and file metadata, ready
/// for the draft store. The core pipeline never depends on persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfqDraft {
    pub id: uuid::Uuid,
    pub parsed: ParsedRfq,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Whether the draft has been routed to a quote template.
    pub is_processed: bool,
    pub created_at: String,
}

impl RfqDraft {
    /// Bundle a completed parse for storage, stamping a fresh id and
    /// creation timestamp.
    pub fn new(
        parsed: ParsedRfq,
        raw_text: impl Into<String>,
        original_filename: Option<String>,
        file_type: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            parsed,
            raw_text: raw_text.into(),
            original_filename,
            file_type,
            is_processed: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_industry_round_trip() {
        for industry in Industry::ALL {
            assert_eq!(Industry::try_parse(industry.as_str()), Some(industry));
            let json = serde_json::to_string(&industry).unwrap();
            assert_eq!(json, format!("\"{}\"", industry.as_str()));
        }
    }

    #[test]
    fn test_industry_rejects_unknown() {
        assert_eq!(Industry::try_parse("woodworking"), None);
        assert_eq!(Industry::try_parse(""), None);
    }

    #[test]
    fn test_industry_parse_is_case_insensitive() {
        assert_eq!(
            Industry::try_parse("CNC Machining"),
            Some(Industry::CncMachining)
        );
        assert_eq!(
            Industry::try_parse("  Sheet Metal  "),
            Some(Industry::SheetMetal)
        );
    }

    #[test]
    fn test_complexity_default_is_medium() {
        assert_eq!(Complexity::default(), Complexity::Medium);
    }

    #[test]
    fn test_complexity_parse() {
        assert_eq!(Complexity::try_parse("HIGH"), Some(Complexity::High));
        assert_eq!(Complexity::try_parse("unknown"), None);
    }

    #[test]
    fn test_normalize_input_trims_bare_text() {
        let normalized = normalize_input("  50 brackets, 6061 aluminum  ");
        assert_eq!(normalized.text, "50 brackets, 6061 aluminum");
        assert!(normalized.file_context.is_none());
    }

    #[test]
    fn test_normalize_input_passes_through_normalized() {
        let input = NormalizedInput {
            text: "25 enclosures".to_string(),
            file_context: Some(FileContext {
                filename: Some("rfq.xlsx".to_string()),
                file_type: Some("excel".to_string()),
                sheet_name: Some("Sheet1".to_string()),
            }),
            user_context: None,
        };
        let normalized = normalize_input(input.clone());
        assert_eq!(normalized, input);
    }

    #[test]
    fn test_dimensions_finite() {
        assert!(Dimensions::new(76.2, 50.8, 25.4).is_finite());
        assert!(!Dimensions::new(f64::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_parsed_rfq_wire_format() {
        let rfq = ParsedRfq {
            material: "6061 Aluminum".to_string(),
            material_confidence: 0.95,
            quantity: 50.0,
            dimensions: Dimensions::new(76.2, 50.8, 25.4),
            complexity: Complexity::Low,
            deadline: "2023-05-15".to_string(),
            industry: Industry::MetalFabrication,
            industry_confidence: 0.92,
            finish: None,
            tolerance: None,
            model_used: "llama-3.3-70b-versatile".to_string(),
            parsing_version: "1.2.0".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            is_reviewed: false,
        };
        let json = serde_json::to_value(&rfq).unwrap();
        assert_eq!(json["modelUsed"], "llama-3.3-70b-versatile");
        assert_eq!(json["industry"], "metal fabrication");
        assert_eq!(json["complexity"], "low");
        assert!(json.get("finish").is_none());
    }
}
