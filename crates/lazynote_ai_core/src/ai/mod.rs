//! AI backend integration.
//!
//! # Responsibility
//! - Own the prompt/response contract for every AI intent.
//! - Keep vendor protocols, HTTP and auth outside core behind
//!   `PromptTransport`.
//! - Validate backend configuration and track the active provider.
//!
//! # Invariants
//! - Each intent makes at most one retry, and only for schema-incomplete
//!   responses.
//! - Transport failures surface as `AiError::BadResponse` without retry.

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod prompt;
pub mod registry;
pub mod transport;
