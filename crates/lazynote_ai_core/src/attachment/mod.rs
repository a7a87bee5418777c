//! Attachment protection across AI round trips.
//!
//! # Responsibility
//! - Keep binary/file references out of backend prompts.
//! - Guarantee no attachment is silently lost by a rewrite.
//!
//! # See also
//! - `crate::service::organize_service` for the call order.

pub mod preserver;
