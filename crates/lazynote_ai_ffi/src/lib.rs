//! Flutter bridge for the LazyNote AI core.

pub mod api;
