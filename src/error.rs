//! Error types for gopt
//!
//! All modules use `GoptResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for gopt operations
pub type GoptResult<T> = Result<T, GoptError>;

/// All errors that can occur in gopt
#[derive(Error, Debug)]
pub enum GoptError {
    // Toolchain errors
    #[error("Go toolchain not found. Install Go from https://go.dev/dl or set install.go in config")]
    GoNotFound,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Scan errors
    #[error("Failed to scan {path}: {source}")]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Version lookup errors
    #[error("Invalid module path {module:?}: {reason}")]
    InvalidModulePath { module: String, reason: String },

    #[error("Version lookup failed for {module}: {reason}")]
    VersionLookup { module: String, reason: String },

    #[error("domain {domain:?} unreachable")]
    Unreachable { domain: String },

    #[error("Module proxy request failed: {0}")]
    Proxy(String),

    // Update/install errors
    #[error("not found {0:?}")]
    NotFound(String),

    #[error("Build failed for {package}: {reason}")]
    BuildFailed { package: String, reason: String },

    #[error("Failed to replace {target}: {source}")]
    ReplaceFailed {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {}s", .after.as_secs())]
    Timeout { operation: String, after: Duration },

    #[error("{failed} of {total} operation(s) failed: {}", .names.join(", "))]
    Batch {
        failed: usize,
        total: usize,
        names: Vec<String>,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GoptError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a version lookup error
    pub fn lookup(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionLookup {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GoNotFound => Some("Install Go from https://go.dev/dl"),
            Self::Unreachable { .. } => Some("Retry after an hour or run: gopt cache clear"),
            Self::NotFound(_) => Some("Run: gopt list"),
            Self::ScanIo { .. } => Some("Check GOBIN or pass --dir"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = GoptError::NotFound("dlv".to_string());
        assert_eq!(err.to_string(), "not found \"dlv\"");
    }

    #[test]
    fn unreachable_display() {
        let err = GoptError::Unreachable {
            domain: "git.corp.example".to_string(),
        };
        assert!(err.to_string().contains("unreachable"));
        assert!(err.to_string().contains("git.corp.example"));
    }

    #[test]
    fn timeout_display() {
        let err = GoptError::timeout("go install", Duration::from_secs(60));
        assert_eq!(err.to_string(), "go install timed out after 60s");
    }

    #[test]
    fn batch_display() {
        let err = GoptError::Batch {
            failed: 2,
            total: 3,
            names: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "2 of 3 operation(s) failed: a, b");
    }

    #[test]
    fn error_hint() {
        assert_eq!(
            GoptError::GoNotFound.hint(),
            Some("Install Go from https://go.dev/dl")
        );
        assert!(GoptError::Internal("x".to_string()).hint().is_none());
    }
}
