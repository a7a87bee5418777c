//! Emphasis-span density management.

pub mod injector;
