//! Server-side request orchestration for the analysis and translation functions.
//!
//! Stateless per call: each operation builds one provider request from the
//! incoming body and interprets the answer.

pub mod analyze;
pub mod prompt;
pub mod translate;

pub use analyze::ImageAnalyzer;
pub use prompt::{build_user_message, detail_instruction, PromptBranch, SYSTEM_PROMPT};
pub use translate::Translator;
