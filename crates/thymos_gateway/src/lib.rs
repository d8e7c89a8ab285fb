//! # Thymos Gateway
//!
//! The JSON-over-HTTP surface. Message ingestion routes through the engine;
//! everything else is a thin typed view over store rows. Handlers are
//! stateless and short-lived; all shared state lives behind the `AppState`
//! Arcs.

pub mod error;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use server::{build_router, AppState, GatewayServer};
