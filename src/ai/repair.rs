//! Response Repair Engine
//!
//! Recovers a JSON candidate from a model response that is supposed to be
//! JSON but may not parse. Strategies run strictly in order, each more
//! invasive than the last, short-circuiting on the first success: direct
//! parse first and regex scraping last, so an otherwise-valid response is
//! never silently corrupted. Never errors — callers get `None` when no
//! strategy yields a parseable object.

use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::constants::parsing;
use crate::types::Industry;

// Strategy 2: largest {...} span in the content.
static OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object-span pattern"));

// Strategy 3: unterminated tolerance string right before the closing brace.
static TOLERANCE_FIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("tolerance"\s*:\s*"[^"]+)\n\s*\}"#).expect("valid tolerance-fix pattern")
});

// Strategy 4: generalized textual repairs.
static BARE_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid bare-key pattern")
});
static BARE_VALUES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#":\s*([^",{}\[\]\s][^",{}\[\]\s]*)\s*([,}])"#).expect("valid bare-value pattern")
});
static TRAILING_COMMA_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid trailing-comma pattern"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid trailing-comma pattern"));
static NEWLINE_BEFORE_BRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*\}").expect("valid newline-strip pattern"));

// Strategy 5: the dimensions block.
static DIMENSIONS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""dimensions"\s*:\s*\{([^}]*)\}"#).expect("valid dimensions pattern")
});

// Strategy 6: field scraping from prose-like responses.
static SCRAPE_MATERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)material["'\s:\-]+([^"',\n\r}]+)"#).expect("valid material pattern")
});
static SCRAPE_INDUSTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)industry["'\s:\-]+([^"',\n\r}]+)"#).expect("valid industry pattern")
});
static SCRAPE_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)quantity["'\s:\-]+(\d+)"#).expect("valid quantity pattern")
});

/// Ordered recovery strategies for malformed model output.
#[derive(Debug, Clone)]
pub struct RepairEngine {
    /// Confidence assigned to scraped fields (strategy 6). Tunable relative
    /// to the validation threshold.
    scrape_confidence: f64,
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairEngine {
    pub fn new() -> Self {
        Self {
            scrape_confidence: parsing::SCRAPE_CONFIDENCE,
        }
    }

    pub fn with_scrape_confidence(scrape_confidence: f64) -> Self {
        Self { scrape_confidence }
    }

    /// Recover a JSON object from raw model output.
    ///
    /// Returns `None` when every strategy fails. Never panics, never errors.
    pub fn recover(&self, raw: &str) -> Option<Value> {
        // Strategy 1: the content is already valid JSON.
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return Some(value);
        }

        // Strategy 2: JSON surrounded by explanatory text.
        if let Some(span) = OBJECT_SPAN.find(raw)
            && let Ok(value) = serde_json::from_str::<Value>(span.as_str())
        {
            debug!("Repaired response by extracting embedded object");
            return Some(value);
        }

        // Strategy 3: known failure mode, an unterminated tolerance string
        // immediately before the closing brace.
        let fixed = TOLERANCE_FIX.replace(raw, "${1}\"}");
        if let Ok(value) = serde_json::from_str::<Value>(&fixed) {
            warn!("Repaired unterminated tolerance string in response");
            return Some(value);
        }

        // Strategy 4: generalized textual repair.
        let repaired = textual_repair(raw);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            warn!("Repaired response with textual fixes");
            return Some(value);
        }

        // Strategy 5: inject missing dimension components, building on the
        // textual repair above.
        let with_dimensions = complete_dimensions(&repaired);
        if let Ok(value) = serde_json::from_str::<Value>(&with_dimensions) {
            warn!("Repaired response by completing the dimensions object");
            return Some(value);
        }

        // Strategy 6: last resort, scrape recognizable fields out of a
        // prose-like response. The synthesized candidate still passes full
        // validation and confidence gating downstream.
        self.scrape_fields(raw)
    }

    /// Scrape `material`, `industry` and `quantity` directly from text and
    /// synthesize a minimal candidate with safe defaults for everything
    /// else. Requires at least one recognizable field; pure prose with none
    /// is unrecoverable.
    fn scrape_fields(&self, raw: &str) -> Option<Value> {
        let material = SCRAPE_MATERIAL
            .captures(raw)
            .map(|c| c[1].trim().to_string());
        let industry = SCRAPE_INDUSTRY
            .captures(raw)
            .and_then(|c| Industry::try_parse(c[1].trim()));
        let quantity = SCRAPE_QUANTITY
            .captures(raw)
            .and_then(|c| c[1].parse::<u64>().ok());

        if material.is_none() && industry.is_none() && quantity.is_none() {
            debug!("No recognizable fields to scrape from response");
            return None;
        }

        warn!(
            found_material = material.is_some(),
            found_industry = industry.is_some(),
            found_quantity = quantity.is_some(),
            "Scraping fields from non-JSON response"
        );

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        Some(json!({
            "material": material.unwrap_or_else(|| "Unknown material".to_string()),
            "quantity": quantity.unwrap_or(1),
            "dimensions": {"length": 0, "width": 0, "height": 0},
            "complexity": "medium",
            "deadline": today,
            "industry": industry.unwrap_or(Industry::MetalFabrication).as_str(),
            "material_confidence": self.scrape_confidence,
            "industry_confidence": self.scrape_confidence,
        }))
    }
}

/// Generalized textual repair pass: quote bare keys, quote bare scalar
/// values, strip trailing commas, strip newlines directly before a closing
/// brace.
fn textual_repair(raw: &str) -> String {
    let mut s = BARE_KEYS.replace_all(raw, "${1}\"${2}\":").into_owned();
    s = BARE_VALUES.replace_all(&s, ":\"${1}\"${2}").into_owned();
    s = TRAILING_COMMA_OBJECT.replace_all(&s, "}").into_owned();
    s = TRAILING_COMMA_ARRAY.replace_all(&s, "]").into_owned();
    s = NEWLINE_BEFORE_BRACE.replace_all(&s, "}").into_owned();
    s
}

/// Inject any missing `length`/`width`/`height` keys (as 0) into the
/// matched `dimensions` block.
fn complete_dimensions(s: &str) -> String {
    let Some(captures) = DIMENSIONS_BLOCK.captures(s) else {
        return s.to_string();
    };

    let content = &captures[1];
    let mut completed = content.trim().to_string();
    for key in ["length", "width", "height"] {
        if !content.contains(&format!("\"{}\"", key)) {
            completed.push_str(&format!(", \"{}\": 0", key));
        }
    }
    // Drop any leading comma left by an originally-empty block.
    let completed = completed.trim_start_matches(|c: char| c == ',' || c.is_whitespace());

    let replacement = format!("\"dimensions\": {{{}}}", completed);
    DIMENSIONS_BLOCK
        .replace(s, regex::NoExpand(&replacement))
        .into_owned()
}
