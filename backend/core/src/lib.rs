pub mod contract;
pub mod error;
pub mod traits;
pub mod types;
pub mod wire;

pub use contract::{extract_summary, ParsedResponse, Section};
pub use error::ExplicaError;
pub use traits::{InlineImage, LlmProvider, LlmRequest, LlmResponse};
pub use types::{
    language_label, AnalysisTurn, DetailLevel, ImagePayload, Language, TranslationEntry,
    SUPPORTED_LANGUAGES,
};
pub use wire::{
    AnalysisRequest, AnalysisResponse, ErrorBody, TranslationRequest, TranslationResponse,
};
