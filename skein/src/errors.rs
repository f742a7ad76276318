use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Store(#[from] redis::RedisError),

    /// A referenced document does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation - the username is already claimed by another user.
    #[error("username '{username}' is already taken by user '{existing_user_id}'")]
    UsernameTaken {
        username: String,
        existing_user_id: String,
    },

    /// A multi-step mutation committed its first write but failed on a later
    /// linking write. The committed writes are not rolled back; the caller
    /// decides on reconciliation.
    #[error("{operation}: linking step '{step}' failed after earlier writes committed")]
    PartialWrite {
        operation: &'static str,
        step: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    /// Invalid input supplied to a read or mutation operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A stored document could not be deserialized.
    #[error("corrupt document at {key}: {message}")]
    Corrupt { key: String, message: Cow<'static, str> },
}

impl EngineError {
    /// Wrap a linking-step failure with the originating operation and step name.
    pub(crate) fn partial(operation: &'static str, step: &'static str, source: EngineError) -> Self {
        EngineError::PartialWrite {
            operation,
            step,
            source: Box::new(source),
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for validation outcomes.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_write_carries_operation_and_cause() {
        let cause = EngineError::NotFound {
            entity: "user",
            id: "u1".into(),
        };
        let err = EngineError::partial("create_thread", "append_author_threads", cause);
        let rendered = err.to_string();
        assert!(rendered.contains("create_thread"));
        assert!(rendered.contains("append_author_threads"));
        match err {
            EngineError::PartialWrite { source, .. } => {
                assert!(matches!(*source, EngineError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn single_issue_helper() {
        let err = ValidationError::single("text", "validation.required", "text is required");
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "text");
    }
}
