//! Gendra RFQ - Manufacturing RFQ Extraction Pipeline
//!
//! Turns free-form manufacturing Request-for-Quote text into a
//! strictly-typed, validated [`ParsedRfq`] using an LLM completion service
//! that cannot be trusted to emit valid JSON or in-taxonomy answers.
//!
//! ## Core Features
//!
//! - **Deterministic Prompting**: fixed instruction block plus four worked
//!   few-shot examples
//! - **Layered JSON Repair**: six recovery strategies, each more invasive
//!   than the last
//! - **Strict Validation**: closed industry taxonomy, numeric coercion,
//!   confidence gating
//! - **Model Cascade**: primary → fallback → emergency models with a single
//!   classification point for fallback decisions
//!
//! ## Quick Start
//!
//! ```ignore
//! use gendra_rfq::{ParseOptions, parse_rfq};
//!
//! let options = ParseOptions {
//!     use_model_fallback: true,
//!     ..Default::default()
//! };
//! let rfq = parse_rfq(
//!     "Need 50 brackets, 6061 aluminum, 3in x 2in x 1in, due May 15",
//!     &options,
//! )
//! .await?;
//! println!("{} x {}", rfq.quantity, rfq.material);
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: prompt construction, model invocation, repair, validation,
//!   and the fallback orchestrator
//! - [`config`]: layered configuration (defaults → global → project → env)
//! - [`storage`]: draft persistence collaborator
//! - [`types`]: domain types and the unified error taxonomy

pub mod ai;
pub mod config;
pub mod constants;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Pipeline
pub use ai::{
    CompletionClient, GroqClient, ParseOptions, RepairEngine, RfqParser, build_prompt, parse_rfq,
    validate_candidate,
};

// Configuration
pub use config::{Config, ConfigLoader, LlmConfig, ModelCascade, ParsingConfig};

// Domain Types
pub use types::{
    Complexity, Dimensions, FallbackDisposition, FileContext, Industry, NormalizedInput,
    ParsedRfq, Result, RfqDraft, RfqError, RfqInput, UserContext, normalize_input,
};

// Storage
pub use storage::{Database, DraftStore, SharedStore};
