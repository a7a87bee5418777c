//! Report/body reconciliation.
//!
//! # Responsibility
//! - Turn a backend analysis into one coherent markdown document.
//!
//! # See also
//! - `crate::ai::client::NoteAnalysis`

pub mod insight_composer;
