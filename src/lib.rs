#![allow(clippy::multiple_crate_versions)]

//! Read and edit INI files without loading them.
//!
//! Every call streams the file through one fixed-size line buffer, so memory
//! use does not grow with the file. Updates that keep a line's length are
//! patched in place; anything else is written to a sibling temporary file
//! that replaces the original only once it is complete.
//!
//! ```no_run
//! let ini = min_ini::open("settings.ini");
//! ini.put_string(Some("network"), "host", "example.org")?;
//! assert_eq!(ini.get(Some("network"), "host")?.as_deref(), Some("example.org"));
//! # Ok::<(), min_ini::IniError>(())
//! ```

use std::path::PathBuf;

pub use min_ini_core::{
    Edit, Hit, IniEntry, IniFile, KeyQuery, QuoteMode, SectionQuery, browse, convert, lookup, rewrite, scanner,
    text,
};
pub use min_ini_infra::{FsStorage, MemoryStorage};
pub use min_ini_ports::storage::{IniStorage, LineReader, LineWriter, StreamMark};
pub use min_ini_shared_kernel::{
    DomainError, ErrorContext, IniConfig, IniConfigBuilder, IniConfigBuilderError, IniError, InfrastructureError,
    Result,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// An INI file on the local filesystem.
pub type Ini = IniFile<FsStorage>;

/// Opens `path` with the default settings. The file does not need to exist.
pub fn open(path: impl Into<PathBuf>) -> Ini {
    IniFile::new(path, FsStorage::new())
}

/// Opens `path` with explicit settings, rejecting settings the engine cannot work with.
pub fn open_with(path: impl Into<PathBuf>, config: IniConfig) -> Result<Ini> {
    let path = path.into();
    log::debug!(
        "opening {} (buffer {} bytes, read-only: {})",
        path.display(),
        config.buffer_capacity,
        config.read_only
    );
    IniFile::with_config(path, FsStorage::new(), config)
}
