//! Prompt Construction
//!
//! Builds the single deterministic prompt for one extraction call: the fixed
//! instruction block, optional file/user context, the normalized RFQ text,
//! and four worked few-shot examples. No randomness enters here — the same
//! input always produces the same prompt.

use crate::types::{Industry, NormalizedInput};

/// System role for the completion request.
pub const SYSTEM_PROMPT: &str = "You are GendraRFQ, an expert manufacturing consultant specializing in extracting and structuring Request for Quote (RFQ) information with extreme precision. \
Your task is to analyze manufacturing specifications and convert unstructured RFQ text into structured data.";

/// Fixed instruction block enumerating the ten output fields and the
/// extraction rules.
const INSTRUCTION_PROMPT: &str = r#"
Extract the following information from the RFQ text:

1. material (string): Precise material specification (e.g., "6061-T6 Aluminum", "304 Stainless Steel")
2. material_confidence (number): Your confidence in the material identification (0-1)
3. quantity (number): Exact number of units requested
4. dimensions (object): All measurements converted to millimeters (mm)
   - length: numeric value in mm
   - width: numeric value in mm
   - height: numeric value in mm
5. complexity (string): Manufacturing complexity categorized as "low", "medium", or "high"
6. deadline (string): Date in ISO format (YYYY-MM-DD)
7. industry (string): Must be one of: "metal fabrication", "injection molding", "cnc machining", "sheet metal", "electronics assembly"
8. industry_confidence (number): Your confidence in the industry classification (0-1)
9. finish (string or null): Surface finish requirements
10. tolerance (string or null): Tolerance specifications

IMPORTANT RULES:
- ALL dimensions MUST be in millimeters (mm). Convert from inches if needed (1 inch = 25.4 mm)
- If the industry is unclear, use contextual clues from materials and processes mentioned
- If any field is completely absent from the text, use null instead of guessing
- Format response as valid JSON with no additional text

Here are indicators for industry classification:
- metal fabrication: involves welding, bending, cutting sheet metal, forming, metal joining
- injection molding: involves plastic parts, molds, resins, cavities, gates, runners
- cnc machining: involves precision milling, turning, complex 3D shapes from solid blocks
- sheet metal: involves thin metal sheets, bending, punching, forming, enclosures
- electronics assembly: involves PCBs, components, soldering, connectors, circuitry

Here is the RFQ to analyze:
"#;

/// Worked input/output pairs embedded in every prompt to steer the output
/// format. Purely in-context demonstrations, never executed.
const FEW_SHOT_EXAMPLES: &[(&str, &str)] = &[
    (
        "Need 50 brackets made from 6061 aluminum, 3\" x 2\" x 1\", with 2 mounting holes. Due May 15.",
        r#"{
  "material": "6061 Aluminum",
  "material_confidence": 0.95,
  "quantity": 50,
  "dimensions": {
    "length": 76.2,
    "width": 50.8,
    "height": 25.4
  },
  "complexity": "low",
  "deadline": "2023-05-15",
  "industry": "metal fabrication",
  "industry_confidence": 0.92,
  "finish": null,
  "tolerance": null
}"#,
    ),
    (
        "We need a quote for 1000 plastic enclosures, ABS material, dimensions 150mm x 80mm x 30mm with snap-fit assembly. Surface finish must be matte black. Required by end of Q3.",
        r#"{
  "material": "ABS Plastic",
  "material_confidence": 0.98,
  "quantity": 1000,
  "dimensions": {
    "length": 150,
    "width": 80,
    "height": 30
  },
  "complexity": "medium",
  "deadline": "2023-09-30",
  "industry": "injection molding",
  "industry_confidence": 0.94,
  "finish": "matte black",
  "tolerance": null
}"#,
    ),
    (
        "RFQ for 25 steel enclosures, 304 stainless, 500mm x 300mm x 200mm, with cutouts for cable access. Brushed finish. Need ±0.1mm tolerance on critical dimensions. Delivery by January 2024.",
        r#"{
  "material": "304 Stainless Steel",
  "material_confidence": 0.97,
  "quantity": 25,
  "dimensions": {
    "length": 500,
    "width": 300,
    "height": 200
  },
  "complexity": "medium",
  "deadline": "2024-01-31",
  "industry": "sheet metal",
  "industry_confidence": 0.89,
  "finish": "brushed",
  "tolerance": "±0.1mm"
}"#,
    ),
    // Challenging/ambiguous content
    (
        "Looking for a supplier for our circuit board assembly. Need 500 units with 20 components each. Testing required. Initial samples by August 15th, and full delivery by October.",
        r#"{
  "material": "PCB with components",
  "material_confidence": 0.85,
  "quantity": 500,
  "dimensions": {
    "length": 0,
    "width": 0,
    "height": 0
  },
  "complexity": "high",
  "deadline": "2023-10-31",
  "industry": "electronics assembly",
  "industry_confidence": 0.96,
  "finish": null,
  "tolerance": null
}"#,
    ),
];

/// Build the complete user prompt for one extraction call.
///
/// Pure function: deterministic for the same input and context.
pub fn build_prompt(input: &NormalizedInput) -> String {
    let mut context_info = String::new();

    if let Some(file) = &input.file_context {
        context_info.push_str("\nFile context:");
        if let Some(filename) = &file.filename {
            context_info.push_str(&format!("\n- Filename: {}", filename));
        }
        if let Some(file_type) = &file.file_type {
            context_info.push_str(&format!("\n- File type: {}", file_type));
        }
        if let Some(sheet_name) = &file.sheet_name {
            context_info.push_str(&format!("\n- Sheet name: {}", sheet_name));
        }
    }

    // The preferred industry is a soft hint only, and only when it is one of
    // the supported industries.
    if let Some(user) = &input.user_context
        && let Some(preferred) = &user.preferred_industry
        && Industry::try_parse(preferred).is_some()
    {
        context_info.push_str(&format!(
            "\n\nNote: The user typically works in the \"{}\" industry.",
            preferred
        ));
    }

    let examples_text = FEW_SHOT_EXAMPLES
        .iter()
        .map(|(input, output)| format!("Input RFQ:\n\"{}\"\n\nOutput:\n{}", input, output))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "{}{}\n\n{}\n\nBefore responding, review these examples to ensure your output follows the same format:\n\n{}",
        INSTRUCTION_PROMPT, context_info, input.text, examples_text
    )
}
