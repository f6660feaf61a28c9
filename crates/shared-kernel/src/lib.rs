// crates/shared-kernel/src/lib.rs
#![allow(clippy::multiple_crate_versions)]

pub use config::{IniConfig, IniConfigBuilder, IniConfigBuilderError};
pub use error::{DomainError, DomainResult, ErrorContext, InfraResult, InfrastructureError, IniError, Result};

pub mod config;
pub mod error;
