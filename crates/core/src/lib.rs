#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

//! Lookup and rewrite engine for INI files kept within a fixed line buffer.
//!
//! Files are streamed line by line; no parsed representation is ever held in
//! memory. Storage is reached only through the `min_ini_ports` traits.

pub mod browse;
pub mod convert;
pub mod ini_file;
pub mod lookup;
pub mod rewrite;
pub mod scanner;
pub mod text;

pub use browse::IniEntry;
pub use ini_file::IniFile;
pub use lookup::{Hit, KeyQuery, SectionQuery};
pub use rewrite::Edit;
pub use text::QuoteMode;
