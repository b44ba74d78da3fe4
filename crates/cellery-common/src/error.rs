//! Unified error types for the Cellery compiler workspace.
//!
//! Every stage of a resolution pass reports failures through
//! [`CelleryError`]. Errors abort the pass before any artifact is written.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CelleryError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The cell source text could not be tokenized or parsed.
    #[error("syntax error: {message}")]
    Syntax {
        /// Description of the syntax problem.
        message: String,
    },

    /// A declaration is malformed or duplicated.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the offending declaration.
        message: String,
    },

    /// A cross-cell dependency has no instance mapping at run time.
    #[error("unresolved dependency \"{dependency}\" of component \"{component}\": no instance supplied")]
    UnresolvedDependency {
        /// Component declaring the dependency.
        component: String,
        /// Dependency alias that could not be resolved.
        dependency: String,
    },

    /// Two APIs expose the same gateway context.
    #[error("duplicate gateway context \"{context}\" declared by \"{first}\" and \"{second}\"")]
    DuplicateContext {
        /// Conflicting context string.
        context: String,
        /// Component that declared the context first.
        first: String,
        /// Component that declared it again.
        second: String,
    },

    /// A scaling declaration is conflicting or has inverted bounds.
    #[error("invalid scaling policy for component \"{component}\": {message}")]
    InvalidScalingPolicy {
        /// Component carrying the policy.
        component: String,
        /// Description of the violation.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl CelleryError {
    /// Builds a [`CelleryError::Validation`] from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Builds a [`CelleryError::Io`] bound to `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CelleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_context_names_both_components() {
        let err = CelleryError::DuplicateContext {
            context: "payroll".into(),
            first: "salary".into(),
            second: "employee".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("payroll"), "got: {msg}");
        assert!(msg.contains("salary"), "got: {msg}");
        assert!(msg.contains("employee"), "got: {msg}");
    }

    #[test]
    fn unresolved_dependency_names_alias() {
        let err = CelleryError::UnresolvedDependency {
            component: "employee".into(),
            dependency: "stock".into(),
        };
        assert!(err.to_string().contains("\"stock\""));
    }

    #[test]
    fn json_errors_convert() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CelleryError = source.into();
        assert!(matches!(err, CelleryError::Serialization { .. }));
    }
}
