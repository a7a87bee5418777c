//! Use-case services over the AI pipeline.
//!
//! # Responsibility
//! - Chain tokenizer, backend client, composer and highlight injector into
//!   note-level operations.
//! - Keep FFI and CLI layers free of pipeline ordering details.

pub mod organize_service;
