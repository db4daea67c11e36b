//! Change tracking for models
//!
//! The patcher remembers the record as it was last loaded or saved, and
//! computes the minimal set of changed attributes at save time.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::value::Record;

#[derive(Debug, Clone, Default)]
pub struct Patcher {
    original: Record,
    touched: BTreeSet<String>,
}

impl Patcher {
    pub fn new(original: &Record) -> Self {
        Self {
            original: original.clone(),
            touched: BTreeSet::new(),
        }
    }

    /// Remember that `attribute` was written
    pub fn track(&mut self, attribute: &str) {
        self.touched.insert(attribute.to_string());
    }

    /// Attributes written since the last commit whose value actually changed.
    /// Removed attributes map to `Null`.
    pub fn diff(&self, current: &Record) -> Record {
        self.touched
            .iter()
            .filter_map(|name| {
                let now = current.get(name);
                if now == self.original.get(name) {
                    return None;
                }
                Some((name.clone(), now.cloned().unwrap_or(Value::Null)))
            })
            .collect()
    }

    pub fn is_dirty(&self, current: &Record) -> bool {
        !self.diff(current).is_empty()
    }

    /// Accept `current` as the new baseline
    pub fn commit(&mut self, current: &Record) {
        self.original = current.clone();
        self.touched.clear();
    }
}
