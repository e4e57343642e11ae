pub mod error;
pub mod rfq;

pub use error::{FallbackDisposition, Result, RfqError};
pub use rfq::{
    Complexity, Dimensions, FileContext, Industry, NormalizedInput, ParsedRfq, RfqDraft, RfqInput,
    UserContext, normalize_input,
};
