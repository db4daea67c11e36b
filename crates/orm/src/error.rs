//! Error types for the data-access layer
//!
//! Every fallible operation returns [`DataAccessResult`]. Store failures are
//! wrapped with the entity type and id they happened on, validation failures
//! always name the attribute that failed.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for data-access operations
pub type DataAccessResult<T> = Result<T, DataAccessError>;

/// Validation failure for a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity}.{attribute}: {message}")]
pub struct ValidationError {
    /// Entity type the attribute belongs to
    pub entity: String,
    /// Attribute that failed validation
    pub attribute: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    pub fn new(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while declaring or building a schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Schema '{entity}' declares attribute '{attribute}' more than once")]
    DuplicateAttribute { entity: String, attribute: String },

    #[error("Schema '{entity}': attribute '{attribute}' is reserved")]
    ReservedAttribute { entity: String, attribute: String },

    #[error("Schema '{entity}': enum attribute '{attribute}' has no values")]
    EmptyEnum { entity: String, attribute: String },

    #[error("Unknown reference type '{0}'")]
    UnknownReferenceType(String),

    #[error("Schema '{entity}' declares a {kind} reference to '{target}' more than once")]
    DuplicateReference {
        entity: String,
        kind: String,
        target: String,
    },

    #[error("Schema '{entity}': index '{index}' is declared more than once")]
    DuplicateIndex { entity: String, index: String },

    #[error("Schema '{entity}': index '{index}' refers to unknown attribute '{attribute}'")]
    UnknownIndexAttribute {
        entity: String,
        index: String,
        attribute: String,
    },

    #[error("Schema '{entity}': invalid definition: {message}")]
    Invalid { entity: String, message: String },
}

/// Error types for data-access operations
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// An attribute failed its type check, requirement or validator
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The schema forbids the operation (e.g. removal)
    #[error("{operation} is not allowed for {entity}")]
    NotAllowed { entity: String, operation: String },

    /// The underlying store failed
    #[error("Failed to {operation} {entity}({id}): {source}")]
    Persistence {
        entity: String,
        id: String,
        operation: String,
        #[source]
        source: StoreError,
    },

    /// Removing dependents failed part way through a cascade
    #[error("Failed to remove {entity}({id}): {failed} dependent removal(s) failed, first error: {source}")]
    CascadeFailure {
        entity: String,
        id: String,
        failed: usize,
        #[source]
        source: Box<DataAccessError>,
    },

    /// No schema is registered under this entity name
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    /// Schema declaration error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Query does not match any declared index, or is otherwise malformed
    #[error("Invalid query on {entity}: {message}")]
    InvalidQuery { entity: String, message: String },

    /// The registry a collection belongs to has been dropped
    #[error("Entity registry for {0} is no longer available")]
    RegistryDropped(String),

    /// Operation on a model that has already been removed
    #[error("{entity}({id}) has been removed")]
    Removed { entity: String, id: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DataAccessError {
    pub fn not_allowed(entity: &str, operation: &str) -> Self {
        Self::NotAllowed {
            entity: entity.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn persistence(entity: &str, id: &str, operation: &str, source: StoreError) -> Self {
        Self::Persistence {
            entity: entity.to_string(),
            id: id.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    pub fn invalid_query(entity: &str, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    /// Returns the validation error if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, Self::NotAllowed { .. })
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for DataAccessError {
    fn from(err: serde_json::Error) -> Self {
        DataAccessError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_attribute() {
        let err = DataAccessError::from(ValidationError::new("Site", "baseURL", "must be a URL"));
        assert_eq!(err.to_string(), "Validation error: Site.baseURL: must be a URL");
        assert_eq!(err.as_validation().unwrap().attribute, "baseURL");
    }

    #[test]
    fn test_persistence_error_carries_context() {
        let err = DataAccessError::persistence("Opportunity", "abc", "save", StoreError::Throttled);
        let message = err.to_string();
        assert!(message.contains("Opportunity(abc)"));
        assert!(message.contains("save"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cascade_failure_display() {
        let inner = DataAccessError::persistence("Suggestion", "s-1", "remove", StoreError::Timeout);
        let err = DataAccessError::CascadeFailure {
            entity: "Opportunity".to_string(),
            id: "o-1".to_string(),
            failed: 1,
            source: Box::new(inner),
        };
        assert!(err.to_string().starts_with("Failed to remove Opportunity(o-1)"));
        assert!(!err.is_not_allowed());
    }
}
