//! Errors

use std::fmt::{self, Display};

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// The DAO action a compiled statement or error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read rows.
    Find,
    /// Insert new rows.
    Insert,
    /// Update existing rows matched by key.
    Update,
    /// Delete rows matched by key.
    Delete,
}

impl Action {
    /// Lowercase action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed field check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Index of the entity parameter item the field belongs to.
    pub item: usize,

    /// Field (column) name.
    pub field: String,

    /// Validator message.
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}].{}: {}", self.item, self.field, self.message)
    }
}

/// Errors raised by the engine.
///
/// Everything except [`Error::Backend`] is raised before a statement is sent,
/// so a failed call never leaves partial writes behind.
#[derive(Error, Debug)]
pub enum Error {
    /// A predicate references a column outside the entity's declared columns.
    #[error("{table}.{action}: unknown column `{column}`")]
    UnknownColumn { table: String, action: Action, column: String },

    /// A BETWEEN value does not have exactly two elements.
    #[error("{table}.{action}: invalid BETWEEN on `{column}`, expected 2 values but got {len}")]
    InvalidBetween { table: String, action: Action, column: String, len: usize },

    /// A sort specification is malformed.
    #[error("{table}.{action}: invalid ORDER BY `{spec}`")]
    InvalidOrderBy { table: String, action: Action, spec: String },

    /// A sort column is outside the entity's declared columns.
    #[error("{table}.{action}: invalid ORDER BY column `{column}`")]
    InvalidOrderByColumn { table: String, action: Action, column: String },

    /// A mutation lacks a required column.
    #[error("{table}.{action}: missing required column `{column}`")]
    MissingRequiredColumn { table: String, action: Action, column: String },

    /// One or more fields failed validation.
    #[error("{table}.{action}: validation failed: {}", join(violations))]
    ValidationFailed { table: String, action: Action, violations: Vec<Violation> },

    /// A field has no resolvable backend storage type.
    #[error("{table}.{action}: no backend type for column `{column}`")]
    TypeBindingMissing { table: String, action: Action, column: String },

    /// A value cannot be sent as its column's declared backend type.
    #[error("{table}.{action}: cannot bind `{column}`: {reason}")]
    InvalidBinding { table: String, action: Action, column: String, reason: String },

    /// An array or field query was given where a single value is required.
    #[error("{table}.{action}: column `{column}` requires a single value")]
    UnsupportedValue { table: String, action: Action, column: String },

    /// No DAO is registered under the name.
    #[error("no entity registered as `{name}`")]
    UnknownEntity { name: String },

    /// Error from the execution backend, passed through as-is.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

fn join(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidBetween {
            table: "users".to_string(),
            action: Action::Find,
            column: "age".to_string(),
            len: 3,
        };
        assert_eq!(
            err.to_string(),
            "users.find: invalid BETWEEN on `age`, expected 2 values but got 3"
        );
    }

    #[test]
    fn validation_lists_every_violation() {
        let err = Error::ValidationFailed {
            table: "users".to_string(),
            action: Action::Insert,
            violations: vec![
                Violation {
                    item: 0,
                    field: "email".to_string(),
                    message: "must not be null".to_string(),
                },
                Violation {
                    item: 2,
                    field: "age".to_string(),
                    message: "expected an integer".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "users.insert: validation failed: [0].email: must not be null; [2].age: expected an integer"
        );
    }

    #[test]
    fn backend_errors_pass_through() {
        let err: Error = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.to_string(), "connection reset");
        assert!(matches!(err, Error::Backend(_)));
    }
}
