//! Domain-level error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field name used for errors that concern the record as a whole.
pub const BASE_FIELD: &str = "base";

/// All messages collected for a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

/// Validation failures, grouped by field in the order they were first reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors carrying a single record-level message.
    pub fn base(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(BASE_FIELD, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        match self.0.iter_mut().find(|e| e.field == field) {
            Some(entry) => entry.messages.push(message.into()),
            None => self.0.push(FieldError {
                field: field.to_string(),
                messages: vec![message.into()],
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages reported for `field`, empty if none.
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            for message in &error.messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{} {}", error.field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationErrors),
}
