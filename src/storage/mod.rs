//! Filesystem access for templates and rendered configs.
//!
//! The engine never touches `std::fs` directly; it goes through the
//! `FileSystem` trait so tests can observe paths, contents and modes.

pub mod files;

pub use files::{FileSystem, LocalFs};
