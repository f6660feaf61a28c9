//! # Ports
//!
//! Interface definitions for the platform the INI engine runs on.
//!
//! - [`storage`]: line-oriented file streams, stream marks, and the
//!   file-level operations (open, lock, remove, rename) a rewrite needs
//!
//! The engine only ever talks to storage through these traits, so the same
//! scanning and rewrite code runs against a real filesystem or an in-memory
//! image.

// crates/ports/src/lib.rs
#![allow(clippy::multiple_crate_versions)]

pub mod storage;

pub use storage::{IniStorage, LineReader, LineWriter, StreamMark};
