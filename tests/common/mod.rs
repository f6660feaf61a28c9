// tests/common/mod.rs
//! Shared helpers for the integration suites.

pub mod temp;

#[allow(unused_imports)]
pub use temp::IniWorkspace;
