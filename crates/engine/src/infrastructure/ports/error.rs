//! Errors returned across the storage and dice ports.

/// Storage failures. The memory store raises the same variants a database
/// adapter would.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// `operation` names the store call that failed, for log correlation.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record that cannot be stored as given (e.g. a global script bound to an entity).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl RepoError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn constraint(message: impl ToString) -> Self {
        Self::ConstraintViolation(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A `roll(...)` expression the dice roller could not evaluate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid dice expression '{expression}': {message}")]
pub struct DiceError {
    pub expression: String,
    pub message: String,
}

impl DiceError {
    pub fn invalid(expression: impl Into<String>, message: impl ToString) -> Self {
        Self {
            expression: expression.into(),
            message: message.to_string(),
        }
    }
}
