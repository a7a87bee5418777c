//! Domain model for the AI rewrite pipeline.
//!
//! # Responsibility
//! - Define the markdown block model the pipeline reads attachments from.
//! - Define decoded backend results and per-note digests.
//!
//! # Invariants
//! - Model types carry no I/O; they are plain values.
//! - Backend-produced collections may be empty without being errors.

pub mod digest;
pub mod document;
pub mod insight;
