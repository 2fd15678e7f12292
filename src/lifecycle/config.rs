use crate::core::{AuditError, Result};

/// Lifecycle store configuration
///
/// Controls how snapshots are framed and whether refreshed snapshots are
/// echoed to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Token opening every rendered line
    pub header: String,

    /// Minimum width of the type-name column
    pub type_column_width: usize,

    /// Line terminator used in rendered snapshots
    pub line_ending: String,

    /// Write both snapshots to the debug log on every refresh
    pub log_snapshots: bool,
}

impl StoreConfig {
    pub const DEFAULT_HEADER: &'static str = "LifecycleStore:";
    pub const DEFAULT_TYPE_COLUMN_WIDTH: usize = 20;
    const MAX_TYPE_COLUMN_WIDTH: usize = 256;

    pub fn new() -> Self {
        Self {
            header: Self::DEFAULT_HEADER.to_string(),
            type_column_width: Self::DEFAULT_TYPE_COLUMN_WIDTH,
            line_ending: "\n".to_string(),
            log_snapshots: true,
        }
    }

    /// Set the header token
    pub fn header(mut self, header: &str) -> Self {
        self.header = header.to_string();
        self
    }

    /// Set the type column width
    pub fn type_column_width(mut self, width: usize) -> Self {
        self.type_column_width = width;
        self
    }

    /// Set the line terminator
    pub fn line_ending(mut self, line_ending: &str) -> Self {
        self.line_ending = line_ending.to_string();
        self
    }

    /// Enable or disable snapshot logging
    pub fn log_snapshots(mut self, enabled: bool) -> Self {
        self.log_snapshots = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_header(&self.header)?;

        if self.line_ending != "\n" && self.line_ending != "\r\n" {
            return Err(AuditError::Config(
                "line_ending must be \"\\n\" or \"\\r\\n\"".to_string(),
            ));
        }

        if self.type_column_width > Self::MAX_TYPE_COLUMN_WIDTH {
            return Err(AuditError::Config(format!(
                "type_column_width cannot exceed {}",
                Self::MAX_TYPE_COLUMN_WIDTH
            )));
        }

        Ok(())
    }
}

/// Rejects headers that would break the line-oriented snapshot format
pub(crate) fn validate_header(header: &str) -> Result<()> {
    if header.trim().is_empty() {
        return Err(AuditError::Config("header cannot be empty".to_string()));
    }

    if header.contains(['\n', '\r']) {
        return Err(AuditError::Config(
            "header cannot contain line breaks".to_string(),
        ));
    }

    Ok(())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
