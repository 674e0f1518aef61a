//! Error types for yamlenv
//!
//! Errors are structured: a kind, optional entry path and file location,
//! the underlying cause, and an actionable help message.

use std::fmt;
use std::path::Path;

/// Result type alias for yamlenv operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yamlenv operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Entry in the config where the error occurred (e.g., "values[2].key")
    pub path: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl SourceLocation {
    /// Location covering a whole file
    pub fn file(path: &Path) -> Self {
        Self {
            file: path.display().to_string(),
            line: None,
            column: None,
        }
    }
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Config file could not be opened, read or written
    Io,
    /// Malformed YAML or a document that doesn't have the `values` shape
    Parse,
    /// Configuration could not be rendered
    Serialize,
    /// Entry can't be stored in the environment (empty key, `=` or NUL)
    InvalidKey { key: String },
}

impl Error {
    /// Create an I/O error for the given file
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        let help = match err.kind() {
            std::io::ErrorKind::NotFound => Some("Check that the config file exists".to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Some("Check the permissions on the config file".to_string())
            }
            _ => None,
        };
        Self {
            kind: ErrorKind::Io,
            path: None,
            source_location: Some(SourceLocation::file(path)),
            help,
            cause: Some(err.to_string()),
        }
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a parse error from a YAML parser failure, keeping its position
    pub fn yaml(err: &serde_yaml::Error, file: Option<&Path>) -> Self {
        let mut error = Self::parse(err.to_string()).with_help(
            "Expected a `values` list of entries with `key` and `value` fields",
        );
        if let Some(file) = file {
            let location = err.location();
            error = error.with_source_location(SourceLocation {
                file: file.display().to_string(),
                line: location.as_ref().map(|l| l.line()),
                column: location.as_ref().map(|l| l.column()),
            });
        }
        error
    }

    /// Create a serialization error
    pub fn serialize(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Serialize,
            path: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidKey { key: key.into() },
            path: None,
            source_location: None,
            help: Some(
                "Environment variable names must be non-empty and contain no '=' or NUL; \
                 values must not contain NUL"
                    .into(),
            ),
            cause: Some(reason.into()),
        }
    }

    /// Add entry path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_io(&self) -> bool {
        matches!(self.kind, ErrorKind::Io)
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.kind, ErrorKind::Parse)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Serialize => write!(f, "Serialization error")?,
            ErrorKind::InvalidKey { key } => write!(f, "Invalid environment key: {:?}", key)?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
                if let Some(column) = loc.column {
                    write!(f, ":{}", column)?;
                }
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
