//! Attribute declarations

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::value::kind_of;

/// Validator closure: returns whether a value is acceptable
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Default value producer
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Number,
    Integer,
    Boolean,
    Map,
    List,
    /// List of unique values
    Set,
    /// String restricted to the given values
    Enum(Vec<String>),
    Any,
}

impl AttributeType {
    /// Enum type from a list of values
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Check a non-null value against this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Map => value.is_object(),
            Self::List => value.is_array(),
            Self::Set => match value.as_array() {
                Some(items) => {
                    let mut seen = HashSet::new();
                    items.iter().all(|item| seen.insert(item.to_string()))
                }
                None => false,
            },
            Self::Enum(values) => value
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false),
            Self::Any => true,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Map => write!(f, "map"),
            Self::List => write!(f, "list"),
            Self::Set => write!(f, "set"),
            Self::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Default applied at creation when the attribute is absent
#[derive(Clone)]
pub enum AttributeDefault {
    Static(Value),
    Computed(DefaultFn),
}

impl AttributeDefault {
    pub fn produce(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for AttributeDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Declaration of one attribute of an entity
#[derive(Clone)]
pub struct AttributeSpec {
    pub attribute_type: AttributeType,
    pub required: bool,
    pub read_only: bool,
    pub default: Option<AttributeDefault>,
    pub validator: Option<Validator>,
}

impl AttributeSpec {
    /// New optional attribute of the given type
    pub fn new(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            required: false,
            read_only: false,
            default: None,
            validator: None,
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn number() -> Self {
        Self::new(AttributeType::Number)
    }

    pub fn integer() -> Self {
        Self::new(AttributeType::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(AttributeType::Boolean)
    }

    pub fn map() -> Self {
        Self::new(AttributeType::Map)
    }

    pub fn list() -> Self {
        Self::new(AttributeType::List)
    }

    pub fn set() -> Self {
        Self::new(AttributeType::Set)
    }

    pub fn any() -> Self {
        Self::new(AttributeType::Any)
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(AttributeType::enumeration(values))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Static default value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(AttributeDefault::Static(value.into()));
        self
    }

    /// Default computed at creation time
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(AttributeDefault::Computed(Arc::new(f)));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Check a value against type and validator.
    ///
    /// `Null` stands for "unset" and only fails for required attributes.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.required {
                Err("is required".to_string())
            } else {
                Ok(())
            };
        }

        if !self.attribute_type.accepts(value) {
            return Err(format!(
                "expected {}, got {}",
                self.attribute_type,
                kind_of(value)
            ));
        }

        if let Some(validator) = &self.validator {
            if !validator(value) {
                return Err("failed validation".to_string());
            }
        }

        Ok(())
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("attribute_type", &self.attribute_type)
            .field("required", &self.required)
            .field("read_only", &self.read_only)
            .field("default", &self.default)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_checks() {
        assert!(AttributeType::String.accepts(&json!("x")));
        assert!(!AttributeType::String.accepts(&json!(1)));
        assert!(AttributeType::Integer.accepts(&json!(7)));
        assert!(!AttributeType::Integer.accepts(&json!(7.5)));
        assert!(AttributeType::Set.accepts(&json!(["a", "b"])));
        assert!(!AttributeType::Set.accepts(&json!(["a", "a"])));
        assert!(AttributeType::enumeration(["NEW", "DONE"]).accepts(&json!("NEW")));
        assert!(!AttributeType::enumeration(["NEW", "DONE"]).accepts(&json!("OTHER")));
    }

    #[test]
    fn test_check_required_and_validator() {
        let spec = AttributeSpec::number().required().validate(|v| v.as_f64() < Some(10.0));
        assert_eq!(spec.check(&Value::Null), Err("is required".to_string()));
        assert!(spec.check(&json!(3)).is_ok());
        assert_eq!(spec.check(&json!(30)), Err("failed validation".to_string()));
        assert_eq!(spec.check(&json!("3")), Err("expected number, got string".to_string()));

        let optional = AttributeSpec::string();
        assert!(optional.check(&Value::Null).is_ok());
    }

    #[test]
    fn test_defaults() {
        let fixed = AttributeSpec::string().default_value("NEW");
        assert_eq!(fixed.default.unwrap().produce(), json!("NEW"));

        let computed = AttributeSpec::map().default_with(|| json!({}));
        assert_eq!(computed.default.unwrap().produce(), json!({}));
    }
}
