//! Public handle tying a path, a storage backend and the engine settings together.

use std::{
    ops::ControlFlow,
    path::{Path, PathBuf},
};

use min_ini_ports::storage::IniStorage;
use min_ini_shared_kernel::{DomainError, IniConfig, Result};

use crate::{
    browse::{IniEntry, browse},
    convert,
    lookup::{KeyQuery, SectionQuery, find_entry},
    rewrite::{self, Edit},
    scanner::LineScanner,
    text::{QuoteMode, copy_with_quoting, trim},
};

/// One INI file on some storage.
///
/// Every call opens the file, does its work and closes it again; nothing is
/// cached between calls. Section and key names are matched without regard to
/// ASCII case, and `None` or a blank section name addresses the keys before
/// the first section header.
#[derive(Debug, Clone)]
pub struct IniFile<S> {
    path: PathBuf,
    storage: S,
    config: IniConfig,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl<S: IniStorage> IniFile<S> {
    pub fn new(path: impl Into<PathBuf>, storage: S) -> Self {
        Self { path: path.into(), storage, config: IniConfig::default() }
    }

    pub fn with_config(path: impl Into<PathBuf>, storage: S, config: IniConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { path: path.into(), storage, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &IniConfig {
        &self.config
    }

    fn lookup(&self, section: SectionQuery<'_>, key: KeyQuery<'_>, maxlen: usize) -> Result<Option<Vec<u8>>> {
        let Some(reader) = self.storage.open_read(&self.path)? else {
            return Ok(None);
        };
        let mut scanner = LineScanner::new(reader, &self.config);
        Ok(find_entry(&mut scanner, section, key, maxlen)?.map(|hit| hit.text))
    }

    fn raw_value(&self, section: Option<&str>, key: &str) -> Result<Option<Vec<u8>>> {
        self.lookup(SectionQuery::from_name(section), KeyQuery::Named(trim(key.as_bytes())), self.config.buffer_capacity)
    }

    /// Like `raw_value`, but an empty value counts as missing.
    fn non_empty_value(&self, section: Option<&str>, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.raw_value(section, key)?.filter(|text| !text.is_empty()))
    }

    /// Value of `key`, bounded by the buffer capacity.
    pub fn get(&self, section: Option<&str>, key: &str) -> Result<Option<String>> {
        Ok(self.raw_value(section, key)?.as_deref().map(lossy))
    }

    /// Value of `key` truncated to at most `capacity - 1` bytes.
    pub fn get_bounded(&self, section: Option<&str>, key: &str, capacity: usize) -> Result<Option<String>> {
        if capacity == 0 {
            return Ok(None);
        }
        let found = self.lookup(SectionQuery::from_name(section), KeyQuery::Named(trim(key.as_bytes())), capacity)?;
        Ok(found.as_deref().map(lossy))
    }

    /// Value of `key`, or `default` (bounded the same way) when it is missing.
    pub fn get_string(&self, section: Option<&str>, key: &str, default: &str) -> Result<String> {
        if let Some(value) = self.get(section, key)? {
            return Ok(value);
        }
        let mut bounded = Vec::new();
        copy_with_quoting(&mut bounded, default.as_bytes(), self.config.buffer_capacity, QuoteMode::None);
        Ok(lossy(&bounded))
    }

    /// Typed getters return `default` when the key is missing or its value is empty.
    pub fn get_i64(&self, section: Option<&str>, key: &str, default: i64) -> Result<i64> {
        Ok(self.non_empty_value(section, key)?.map_or(default, |text| convert::parse_i64(&text)))
    }

    pub fn get_u64(&self, section: Option<&str>, key: &str, default: u64) -> Result<u64> {
        Ok(self.non_empty_value(section, key)?.map_or(default, |text| convert::parse_u64(&text)))
    }

    pub fn get_f64(&self, section: Option<&str>, key: &str, default: f64) -> Result<f64> {
        Ok(self.non_empty_value(section, key)?.map_or(default, |text| convert::parse_f64(&text)))
    }

    /// `default` when the key is missing or its value does not start with a
    /// recognised boolean character.
    pub fn get_bool(&self, section: Option<&str>, key: &str, default: bool) -> Result<bool> {
        Ok(self.raw_value(section, key)?.and_then(|text| convert::parse_bool(&text)).unwrap_or(default))
    }

    /// Name of the `index`-th section (zero based).
    pub fn section_at(&self, index: usize) -> Result<Option<String>> {
        let found = self.lookup(SectionQuery::Index(index), KeyQuery::SectionOnly, self.config.buffer_capacity)?;
        Ok(found.as_deref().map(lossy))
    }

    /// Name of the `index`-th key in `section` (zero based).
    pub fn key_at(&self, section: Option<&str>, index: usize) -> Result<Option<String>> {
        let found =
            self.lookup(SectionQuery::from_name(section), KeyQuery::Index(index), self.config.buffer_capacity)?;
        Ok(found.as_deref().map(lossy))
    }

    /// Whether the section has a header in the file. The global area exists
    /// whenever the file does.
    pub fn has_section(&self, section: Option<&str>) -> Result<bool> {
        Ok(self.lookup(SectionQuery::from_name(section), KeyQuery::SectionOnly, 1)?.is_some())
    }

    pub fn has_key(&self, section: Option<&str>, key: &str) -> Result<bool> {
        Ok(self.lookup(SectionQuery::from_name(section), KeyQuery::Named(trim(key.as_bytes())), 1)?.is_some())
    }

    /// Walks every key/value pair in file order; `Ok(false)` when the file
    /// does not exist.
    pub fn browse<F>(&self, visit: F) -> Result<bool>
    where
        F: FnMut(&IniEntry<'_>) -> ControlFlow<()>,
    {
        let Some(reader) = self.storage.open_read(&self.path)? else {
            return Ok(false);
        };
        let mut scanner = LineScanner::new(reader, &self.config);
        browse(&mut scanner, self.config.buffer_capacity, visit)?;
        Ok(true)
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if self.config.read_only {
            return Err(DomainError::ReadOnly { operation }.into());
        }
        Ok(())
    }

    /// A key must read back as itself once written as `key = value`.
    fn checked_key<'k>(key: &'k str) -> Result<&'k [u8]> {
        let trimmed = trim(key.as_bytes());
        let reason = match trimmed {
            [] => "key names must contain a non-blank character",
            [b'[' | b';' | b'#', ..] => "key names cannot start with '[', ';' or '#'",
            _ if trimmed.iter().any(|b| matches!(b, b'=' | b':')) => "key names cannot contain '=' or ':'",
            _ if trimmed.iter().any(|b| matches!(b, b'\n' | b'\r' | 0)) => "key names must fit on one line",
            _ => return Ok(trimmed),
        };
        Err(DomainError::InvalidKey { key: key.to_string(), reason }.into())
    }

    fn checked_section(section: Option<&str>) -> Result<Option<&[u8]>> {
        let bytes = Self::section_bytes(section);
        let reason = match bytes {
            Some(name) if name.contains(&b']') => "section names cannot contain ']'",
            Some(name) if name.iter().any(|b| matches!(b, b'\n' | b'\r' | 0)) => "section names must fit on one line",
            _ => return Ok(bytes),
        };
        Err(DomainError::InvalidSection { section: section.unwrap_or_default().to_string(), reason }.into())
    }

    fn section_bytes<'n>(section: Option<&'n str>) -> Option<&'n [u8]> {
        match SectionQuery::from_name(section) {
            SectionQuery::Named(name) => Some(name),
            SectionQuery::Global | SectionQuery::Index(_) => None,
        }
    }

    /// Sets `key` to `value`, adding the key and its section when missing.
    pub fn put_string(&self, section: Option<&str>, key: &str, value: &str) -> Result<()> {
        self.ensure_writable("put")?;
        let section = Self::checked_section(section)?;
        let key = Self::checked_key(key)?;
        let edit = Edit::Set { key, value: value.as_bytes() };
        rewrite::apply(&self.storage, &self.config, &self.path, section, edit)
    }

    pub fn put_i64(&self, section: Option<&str>, key: &str, value: i64) -> Result<()> {
        self.put_string(section, key, &value.to_string())
    }

    pub fn put_u64(&self, section: Option<&str>, key: &str, value: u64) -> Result<()> {
        self.put_string(section, key, &value.to_string())
    }

    pub fn put_f64(&self, section: Option<&str>, key: &str, value: f64) -> Result<()> {
        self.put_string(section, key, &convert::format_f64(value))
    }

    pub fn put_bool(&self, section: Option<&str>, key: &str, value: bool) -> Result<()> {
        self.put_string(section, key, convert::format_bool(value))
    }

    /// Removes `key`; a missing key or file is not an error.
    pub fn delete_key(&self, section: Option<&str>, key: &str) -> Result<()> {
        self.ensure_writable("delete key")?;
        let key = Self::checked_key(key)?;
        rewrite::apply(&self.storage, &self.config, &self.path, Self::section_bytes(section), Edit::DeleteKey { key })
    }

    /// Removes a section header with all of its lines, or with `None` every
    /// line before the first header.
    pub fn delete_section(&self, section: Option<&str>) -> Result<()> {
        self.ensure_writable("delete section")?;
        rewrite::apply(&self.storage, &self.config, &self.path, Self::section_bytes(section), Edit::DeleteSection)
    }
}
