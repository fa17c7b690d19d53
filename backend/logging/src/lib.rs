//! Structured logging for ExplicaAí.
//!
//! Console and rolling JSON file output, plus redaction of secrets and inline
//! image data before upstream payloads are logged.

pub mod logger;
pub mod redact;

pub use logger::{init_console_logger, init_logger};
pub use redact::{redact_sensitive_data, truncate_for_log};
