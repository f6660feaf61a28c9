use derive_builder::Builder;

use crate::error::{DomainError, DomainResult};

/// Smallest working buffer that still fits a bracketed name or a `k = v` line.
pub const MIN_BUFFER_CAPACITY: usize = 16;

/// Longest accepted line terminator (`"\r\n"`).
pub const MAX_TERMINATOR_LEN: usize = 2;

fn default_terminator() -> String {
    String::from("\n")
}

/// Engine settings fixed for the lifetime of one `IniFile` handle.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IniConfig {
    /// Size of the working line buffer; also bounds every name and value.
    #[builder(default = "512")]
    pub buffer_capacity: usize,
    /// Bytes appended after each written line.
    #[builder(default = "default_terminator()")]
    pub line_terminator: String,
    /// Rejects every mutating call.
    #[builder(default)]
    pub read_only: bool,
}

impl Default for IniConfig {
    fn default() -> Self {
        Self { buffer_capacity: 512, line_terminator: default_terminator(), read_only: false }
    }
}

impl IniConfig {
    pub fn builder() -> IniConfigBuilder {
        IniConfigBuilder::default()
    }

    /// Re-checks a config that may have been assembled field by field.
    pub fn validate(&self) -> DomainResult<()> {
        check_settings(self.buffer_capacity, &self.line_terminator)
            .map_err(|reason| DomainError::InvalidConfiguration { reason })
    }

    /// The byte that ends a line when reading.
    pub fn terminator_byte(&self) -> u8 {
        self.line_terminator.as_bytes().last().copied().unwrap_or(b'\n')
    }

    pub fn terminator(&self) -> &[u8] {
        self.line_terminator.as_bytes()
    }

    /// Longest run of bytes a single line read may return; never zero.
    pub fn read_limit(&self) -> usize {
        self.buffer_capacity.saturating_sub(1).max(1)
    }
}

impl IniConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let capacity = self.buffer_capacity.unwrap_or(512);
        match &self.line_terminator {
            Some(terminator) => check_settings(capacity, terminator),
            None => check_settings(capacity, "\n"),
        }
    }
}

fn check_settings(capacity: usize, terminator: &str) -> Result<(), String> {
    if capacity < MIN_BUFFER_CAPACITY {
        return Err(format!("buffer_capacity must be at least {MIN_BUFFER_CAPACITY}, got {capacity}"));
    }
    if terminator.is_empty() || terminator.len() > MAX_TERMINATOR_LEN {
        return Err(format!(
            "line_terminator must be 1 to {MAX_TERMINATOR_LEN} bytes, got {:?}",
            terminator
        ));
    }
    Ok(())
}

impl From<IniConfigBuilderError> for DomainError {
    fn from(err: IniConfigBuilderError) -> Self {
        Self::InvalidConfiguration { reason: err.to_string() }
    }
}
