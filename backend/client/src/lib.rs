pub mod backend;
pub mod orchestrator;
pub mod overlay;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use backend::{FunctionsBackend, HttpBackend};
pub use orchestrator::{Orchestrator, SUGGESTED_QUESTIONS};
pub use overlay::{Selection, TranslationOverlay};
pub use session::{DisplayView, Outcome, Phase, Session, Step};
pub use store::{state_dir, FileStore, KeyValueStore, MemoryStore, USERNAME_KEY};
