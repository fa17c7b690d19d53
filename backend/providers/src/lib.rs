//! LLM providers used by the analysis and translation functions.

pub mod mock;
pub mod openai_compat;

pub use mock::MockProvider;
pub use openai_compat::{OpenAiCompatProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
