//! Model System - one loaded entity record
//!
//! A [`Model`] wraps one record of one entity type. Attribute writes are
//! validated immediately and tracked, so [`Model::save`] only sends the
//! attributes that actually changed. Related models are resolved through
//! the registry the model's collection belongs to.
//!
//! - `attribute`: typed attribute handles
//! - `patcher`: change tracking
//! - `relations`: relationship traversal
//! - `cascade`: removal with dependents

pub mod attribute;
pub mod cascade;
pub mod patcher;
pub mod relations;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::collection::Collection;
use crate::error::{DataAccessError, DataAccessResult, ValidationError};
use crate::schema::{Schema, CREATED_AT, UPDATED_AT};
use crate::value::{now_iso, Record};

pub use attribute::Attribute;
pub use patcher::Patcher;
pub use relations::Related;

/// Lifecycle state of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Matches the stored record
    Clean,
    /// Has unsaved attribute changes
    Dirty,
    /// Deleted from the store; every further operation fails
    Removed,
}

/// One record of one entity type
#[derive(Clone)]
pub struct Model {
    collection: Collection,
    record: Record,
    patcher: Patcher,
    state: ModelState,
}

impl Model {
    pub(crate) fn new(collection: Collection, record: Record) -> Self {
        let patcher = Patcher::new(&record);
        Self {
            collection,
            record,
            patcher,
            state: ModelState::Clean,
        }
    }

    pub fn id(&self) -> &str {
        self.record
            .get(self.schema().id_name())
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn entity_name(&self) -> &str {
        self.collection.entity_name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.collection.schema()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Fail with `InvalidQuery` unless this model is of type `entity`
    pub fn ensure_entity(&self, entity: &str) -> DataAccessResult<()> {
        self.collection.ensure_entity(entity)
    }

    pub fn created_at(&self) -> Option<&str> {
        self.record.get(CREATED_AT).and_then(Value::as_str)
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.record.get(UPDATED_AT).and_then(Value::as_str)
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == ModelState::Dirty
    }

    pub fn is_removed(&self) -> bool {
        self.state == ModelState::Removed
    }

    /// Raw attribute value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    /// Attribute value deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> DataAccessResult<Option<T>> {
        match self.record.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    pub fn read<T: DeserializeOwned>(&self, attribute: &Attribute<T>) -> DataAccessResult<Option<T>> {
        self.get_as(attribute.name())
    }

    /// Set an attribute; `Value::Null` unsets it.
    ///
    /// The value is checked against the attribute's type, requirement and
    /// validator before it is applied. Read-only attributes and versioned
    /// entities cannot be written.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> DataAccessResult<&mut Self> {
        self.ensure_not_removed()?;
        let value = value.into();
        let schema = Arc::clone(self.schema());
        let entity = schema.entity_name();

        if schema.is_versioned() {
            return Err(DataAccessError::not_allowed(entity, "update"));
        }
        let spec = schema
            .attribute(name)
            .ok_or_else(|| ValidationError::new(entity, name, "is not a declared attribute"))?;
        if spec.read_only {
            return Err(ValidationError::new(entity, name, "is read-only").into());
        }
        spec.check(&value)
            .map_err(|message| ValidationError::new(entity, name, message))?;

        if value.is_null() {
            self.record.remove(name);
        } else {
            self.record.insert(name.to_string(), value);
        }
        self.patcher.track(name);
        self.state = if self.patcher.is_dirty(&self.record) {
            ModelState::Dirty
        } else {
            ModelState::Clean
        };
        Ok(self)
    }

    pub fn write<T: Serialize>(&mut self, attribute: &Attribute<T>, value: T) -> DataAccessResult<&mut Self> {
        let value = serde_json::to_value(value)?;
        self.set(attribute.name(), value)
    }

    /// Unset an optional attribute
    pub fn unset(&mut self, name: &str) -> DataAccessResult<&mut Self> {
        self.set(name, Value::Null)
    }

    /// Attributes changed since the last load or save
    pub fn changes(&self) -> Record {
        self.patcher.diff(&self.record)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.record.clone())
    }

    /// Persist changed attributes and refresh `updatedAt`.
    ///
    /// Saving a model without changes does not touch the store. On failure
    /// the model keeps its unsaved changes.
    pub async fn save(&mut self) -> DataAccessResult<&mut Self> {
        self.ensure_not_removed()?;
        let mut changes = self.patcher.diff(&self.record);
        if changes.is_empty() {
            self.state = ModelState::Clean;
            return Ok(self);
        }
        if self.schema().is_versioned() {
            return Err(DataAccessError::not_allowed(self.entity_name(), "update"));
        }

        let now = now_iso();
        changes.insert(UPDATED_AT.to_string(), Value::String(now.clone()));

        let id = self.id().to_string();
        self.collection
            .store()
            .patch(self.entity_name(), &id, changes)
            .await
            .map_err(|e| self.collection.store_failure(&id, "save", e))?;

        self.record.insert(UPDATED_AT.to_string(), Value::String(now));
        self.patcher.commit(&self.record);
        self.state = ModelState::Clean;
        tracing::debug!(entity = %self.entity_name(), id = %id, "saved");
        Ok(self)
    }

    pub(crate) fn ensure_not_removed(&self) -> DataAccessResult<()> {
        if self.is_removed() {
            return Err(DataAccessError::Removed {
                entity: self.entity_name().to_string(),
                id: self.id().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn mark_removed(&mut self) {
        self.state = ModelState::Removed;
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entity", &self.entity_name())
            .field("id", &self.id())
            .field("state", &self.state)
            .finish()
    }
}

impl Serialize for Model {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}
