//! Index query planning
//!
//! Turns a caller's key set and [`QueryOptions`] into an [`IndexQuery`]
//! against the best matching index of a schema.

use serde_json::Value;

use crate::config::DataAccessConfig;
use crate::error::{DataAccessError, DataAccessResult};
use crate::schema::{select_index, IndexMatch, Schema};
use crate::store::{IndexQuery, Order, SortRange};
use crate::value::Record;

/// Options of `all*`/`find*` index queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub order: Order,
    /// Maximum number of records; falls back to the configured default
    pub limit: Option<usize>,
    /// Inclusive range on the first sort key the key set leaves unbound
    pub between: Option<SortRange>,
    /// Ignore the configured default limit
    pub fetch_all: bool,
    /// Force a specific index instead of selecting one from the keys
    pub index: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Newest/highest sort key first
    pub fn desc(self) -> Self {
        self.order(Order::Desc)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn between(mut self, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.between = Some(SortRange {
            start: start.into(),
            end: end.into(),
        });
        self
    }

    pub fn fetch_all(mut self) -> Self {
        self.fetch_all = true;
        self
    }

    pub fn using_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Limit that applies once the configured default is taken into account
    pub(crate) fn effective_limit(&self, config: &DataAccessConfig) -> Option<usize> {
        match self.limit {
            Some(limit) => Some(limit),
            None if self.fetch_all => None,
            None => config.default_query_limit,
        }
    }
}

/// Plan the index query serving `keys`
pub(crate) fn plan(
    schema: &Schema,
    keys: &Record,
    options: &QueryOptions,
    config: &DataAccessConfig,
) -> DataAccessResult<IndexQuery> {
    let entity = schema.entity_name();

    let matched: IndexMatch<'_> = match &options.index {
        Some(name) => {
            let index = schema
                .index(name)
                .ok_or_else(|| DataAccessError::invalid_query(entity, format!("unknown index '{name}'")))?;
            index.match_keys(keys).ok_or_else(|| {
                DataAccessError::invalid_query(
                    entity,
                    format!("index '{name}' cannot serve keys [{}]", key_names(keys)),
                )
            })?
        }
        None => select_index(schema.indexes(), keys).ok_or_else(|| {
            DataAccessError::invalid_query(entity, format!("no index covers keys [{}]", key_names(keys)))
        })?,
    };

    if options.between.is_some() && matched.sort_prefix.len() >= matched.index.sort_keys.len() {
        return Err(DataAccessError::invalid_query(
            entity,
            format!("index '{}' has no unbound sort key for a range", matched.index.name),
        ));
    }

    let mut query = IndexQuery::new(entity, matched.index.name.clone());
    query.sort_keys = matched.index.sort_keys.clone();
    query.partition = matched.partition;
    query.sort_prefix = matched.sort_prefix;
    query.range = options.between.clone();
    query.order = options.order;
    query.limit = options.effective_limit(config);
    Ok(query)
}

/// Comma separated key names, for error messages
pub(crate) fn key_names(keys: &Record) -> String {
    keys.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType};
    use crate::value::record;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder("Suggestion")
            .add_attribute("status", AttributeSpec::string())
            .add_attribute("rank", AttributeSpec::number())
            .add_reference(
                ReferenceType::BelongsTo,
                "Opportunity",
                vec!["status".to_string(), "rank".to_string()],
                ReferenceOptions::new(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_plan_selects_foreign_key_index() {
        let keys = record([("opportunityId", json!("o-1")), ("status", json!("NEW"))]);
        let query = plan(&schema(), &keys, &QueryOptions::new().desc(), &DataAccessConfig::default()).unwrap();

        assert_eq!(query.index, "byOpportunityId");
        assert_eq!(query.sort_prefix, vec![("status".to_string(), json!("NEW"))]);
        assert_eq!(query.order, Order::Desc);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_plan_rejects_uncovered_keys() {
        let keys = record([("rank", json!(1))]);
        let err = plan(&schema(), &keys, &QueryOptions::new(), &DataAccessConfig::default()).unwrap_err();
        assert!(matches!(err, DataAccessError::InvalidQuery { message, .. } if message.contains("rank")));
    }

    #[test]
    fn test_range_needs_unbound_sort_key() {
        let keys = record([
            ("opportunityId", json!("o-1")),
            ("status", json!("NEW")),
            ("rank", json!(1)),
        ]);
        let options = QueryOptions::new().between(1, 3);
        assert!(plan(&schema(), &keys, &options, &DataAccessConfig::default()).is_err());
    }

    #[test]
    fn test_default_limit_and_fetch_all() {
        let config = DataAccessConfig {
            default_query_limit: Some(50),
            ..DataAccessConfig::default()
        };
        assert_eq!(QueryOptions::new().effective_limit(&config), Some(50));
        assert_eq!(QueryOptions::new().limit(5).effective_limit(&config), Some(5));
        assert_eq!(QueryOptions::new().fetch_all().effective_limit(&config), None);
    }
}
