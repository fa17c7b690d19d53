//! ExplicaAí backend functions served over HTTP.
//!
//! `POST /functions/v1/analyze-image` and `POST /functions/v1/translate`, both
//! reachable from browsers (permissive CORS, pre-flight answered with an empty
//! success), plus `GET /api/health`.

pub mod error;
pub mod functions;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState, DEFAULT_MAX_BODY_BYTES};
