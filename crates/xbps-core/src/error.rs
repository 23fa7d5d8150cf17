//! Error types shared by the transaction engine.
//!
//! Each error carries a unique code (e.g. `E0101`) plus suggestions for how
//! to recover. Per-crate `Error` enums elsewhere in the workspace convert
//! into or wrap these via `#[from]` at their boundary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes, grouped by layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Parse errors (E01xx)
    /// Malformed pkgver string
    E0101,
    /// Malformed package pattern
    E0102,
    /// Malformed property list
    E0103,

    // Resolution errors (E02xx)
    /// Required dependency missing from the pool
    E0201,
    /// Conflicting packages in the transaction
    E0202,
    /// Dependency cycle detected
    E0203,
    /// Package already installed
    E0204,
    /// Installed version is already the best available
    E0205,
    /// No repositories configured
    E0206,
    /// Package not installed
    E0207,

    // IO errors (E03xx)
    /// File not found
    E0301,
    /// Permission denied
    E0302,
    /// File already exists
    E0303,

    // Network / transport errors (E04xx)
    /// Transport request failed
    E0401,
    /// Content checksum mismatch
    E0402,

    // State machine errors (E05xx)
    /// Invalid state transition
    E0501,
    /// Unpack failed partway through an archive
    E0502,
    /// Configure script failed
    E0503,
    /// Remove failed
    E0504,
    /// Installed file hash did not match during removal
    E0505,

    // Archive errors (E06xx)
    /// Invalid or truncated archive
    E0601,

    // Configuration errors (E07xx)
    /// Invalid configuration value
    E0701,
    /// Missing required configuration
    E0702,

    // Contract errors (E08xx)
    /// Callback requested cancellation
    E0801,
}

impl ErrorCode {
    /// String form of the code, e.g. `"E0101"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0205 => "E0205",
            Self::E0206 => "E0206",
            Self::E0207 => "E0207",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E0503 => "E0503",
            Self::E0504 => "E0504",
            Self::E0505 => "E0505",
            Self::E0601 => "E0601",
            Self::E0701 => "E0701",
            Self::E0702 => "E0702",
            Self::E0801 => "E0801",
        }
    }

    /// A brief human title for this code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Malformed pkgver",
            Self::E0102 => "Malformed pattern",
            Self::E0103 => "Malformed property list",
            Self::E0201 => "Missing dependency",
            Self::E0202 => "Package conflict",
            Self::E0203 => "Dependency cycle",
            Self::E0204 => "Already installed",
            Self::E0205 => "Up to date",
            Self::E0206 => "No repositories",
            Self::E0207 => "Not installed",
            Self::E0301 => "File not found",
            Self::E0302 => "Permission denied",
            Self::E0303 => "File exists",
            Self::E0401 => "Transport error",
            Self::E0402 => "Checksum mismatch",
            Self::E0501 => "Invalid state transition",
            Self::E0502 => "Unpack failed",
            Self::E0503 => "Configure failed",
            Self::E0504 => "Remove failed",
            Self::E0505 => "File hash mismatch on removal",
            Self::E0601 => "Invalid archive",
            Self::E0701 => "Invalid configuration",
            Self::E0702 => "Missing configuration",
            Self::E0801 => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wrapper so `ErrorCode` satisfies `std::error::Error` as a `#[source]`.
#[derive(Debug)]
pub struct ErrorCodeSource(pub ErrorCode);

impl fmt::Display for ErrorCodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl std::error::Error for ErrorCodeSource {}

/// Core engine error.
#[derive(Error, Debug)]
pub enum Error {
    /// pkgver string could not be split into name/version/revision.
    #[error("[{code}] malformed pkgver '{pkgver}'")]
    MalformedPkgver {
        #[source]
        code: ErrorCodeSource,
        pkgver: String,
        suggestions: Vec<String>,
    },

    /// Dependency pattern is neither relational, glob, nor a bare name.
    #[error("[{code}] malformed pattern '{pattern}'")]
    MalformedPattern {
        #[source]
        code: ErrorCodeSource,
        pattern: String,
        suggestions: Vec<String>,
    },

    /// A property list document did not parse or failed schema validation.
    #[error("[{code}] malformed property list: {message}")]
    MalformedPlist {
        #[source]
        code: ErrorCodeSource,
        message: String,
        path: Option<PathBuf>,
        suggestions: Vec<String>,
    },

    /// Generic I/O failure with path context.
    #[error("[{code}] io error at {path}: {message}")]
    Io {
        #[source]
        code: ErrorCodeSource,
        path: PathBuf,
        message: String,
        suggestions: Vec<String>,
    },

    /// Underlying `std::io::Error`, preserved via `#[from]` at crate seams
    /// that don't need path-aware context.
    #[error("io error: {0}")]
    RawIo(#[from] std::io::Error),

    /// Content hash did not match the advertised value.
    #[error("[{code}] checksum mismatch for '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        #[source]
        code: ErrorCodeSource,
        name: String,
        expected: String,
        actual: String,
        suggestions: Vec<String>,
    },
}

impl Error {
    /// The error code for this variant.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedPkgver { code, .. }
            | Self::MalformedPattern { code, .. }
            | Self::MalformedPlist { code, .. }
            | Self::Io { code, .. }
            | Self::ChecksumMismatch { code, .. } => code.0,
            Self::RawIo(_) => ErrorCode::E0301,
        }
    }

    /// Recovery suggestions, empty for variants that carry none.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::MalformedPkgver { suggestions, .. }
            | Self::MalformedPattern { suggestions, .. }
            | Self::MalformedPlist { suggestions, .. }
            | Self::Io { suggestions, .. }
            | Self::ChecksumMismatch { suggestions, .. } => suggestions,
            Self::RawIo(_) => &[],
        }
    }

    /// Build a `MalformedPkgver` error.
    #[must_use]
    pub fn malformed_pkgver(pkgver: impl Into<String>) -> Self {
        let pkgver = pkgver.into();
        Self::MalformedPkgver {
            code: ErrorCodeSource(ErrorCode::E0101),
            suggestions: vec![format!(
                "pkgver must end in '-<version>[_<revision>]', got '{pkgver}'"
            )],
            pkgver,
        }
    }

    /// Build a `MalformedPattern` error.
    #[must_use]
    pub fn malformed_pattern(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self::MalformedPattern {
            code: ErrorCodeSource(ErrorCode::E0102),
            suggestions: vec![
                "patterns are a bare name, a glob with '*'/'?', or '<name><op><version>' with op in >=, <=, >, <, ==".to_string(),
            ],
            pattern,
        }
    }

    /// Build a `MalformedPlist` error.
    #[must_use]
    pub fn malformed_plist(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::MalformedPlist {
            code: ErrorCodeSource(ErrorCode::E0103),
            message: message.into(),
            path,
            suggestions: vec!["the file may be truncated or hand-edited incorrectly".to_string()],
        }
    }

    /// Build an `Io` error from a path and the underlying `std::io::Error`.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let (code, suggestions) = match err.kind() {
            std::io::ErrorKind::NotFound => (
                ErrorCode::E0301,
                vec![format!("check that {} exists", path.display())],
            ),
            std::io::ErrorKind::PermissionDenied => (
                ErrorCode::E0302,
                vec![format!("check permissions on {}", path.display())],
            ),
            std::io::ErrorKind::AlreadyExists => (
                ErrorCode::E0303,
                vec!["use the force flag if overwriting is intended".to_string()],
            ),
            _ => (ErrorCode::E0301, vec![]),
        };
        Self::Io {
            code: ErrorCodeSource(code),
            path,
            message: err.to_string(),
            suggestions,
        }
    }

    /// Build a `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            code: ErrorCodeSource(ErrorCode::E0402),
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
            suggestions: vec!["the cached archive may be corrupt; remove it and re-fetch".to_string()],
        }
    }

    /// Render the error with its code, message, and suggestions.
    #[must_use]
    pub fn display_with_suggestions(&self) -> String {
        let mut out = format!("[{}] {}\n{}", self.code(), self.code().title(), self);
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for s in suggestions {
                out.push_str("  - ");
                out.push_str(s);
                out.push('\n');
            }
        }
        out
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_roundtrip() {
        assert_eq!(ErrorCode::E0101.as_str(), "E0101");
        assert_eq!(ErrorCode::E0101.title(), "Malformed pkgver");
    }

    #[test]
    fn malformed_pkgver_has_code_and_suggestion() {
        let err = Error::malformed_pkgver("not-a-pkgver");
        assert_eq!(err.code(), ErrorCode::E0101);
        assert!(!err.suggestions().is_empty());
        assert!(err.to_string().contains("[E0101]"));
    }

    #[test]
    fn display_with_suggestions_includes_title() {
        let err = Error::malformed_pattern("@@@");
        let rendered = err.display_with_suggestions();
        assert!(rendered.contains("Malformed pattern"));
        assert!(rendered.contains("Suggestions:"));
    }
}
