//! Append-only versioned entities
//!
//! Each create of a versioned entity stores a new record whose `version` is
//! one higher than the latest. The zero-padded `versionString` is the sort
//! key of the version index, so lexicographic order equals numeric order.
//! Concurrent creators race on a unique-`versionString` conditional write;
//! the loser re-reads the latest version and tries again.

use serde_json::Value;

use super::{Collection, QueryOptions};
use crate::error::{DataAccessError, DataAccessResult};
use crate::model::Model;
use crate::schema::builder::VERSION_INDEX;
use crate::schema::VersioningOptions;
use crate::store::{IndexQuery, Order, StoreError, WriteCondition};
use crate::value::Record;

/// Zero-padded version string, e.g. `0000000007`
pub fn encode_version(version: u64, width: usize) -> String {
    format!("{version:0width$}")
}

impl Collection {
    fn versioning_options(&self) -> DataAccessResult<&VersioningOptions> {
        self.schema()
            .versioning()
            .ok_or_else(|| DataAccessError::invalid_query(self.entity_name(), "entity is not versioned"))
    }

    /// The record with the highest version, if any
    pub async fn find_latest(&self) -> DataAccessResult<Option<Model>> {
        self.versioning_options()?;
        let models = self
            .all_by_index_keys(
                &Record::new(),
                QueryOptions::new().using_index(VERSION_INDEX).order(Order::Desc).limit(1),
            )
            .await?;
        Ok(models.into_iter().next())
    }

    /// The record with exactly this version
    pub async fn find_by_version(&self, version: u64) -> DataAccessResult<Option<Model>> {
        let versioning = self.versioning_options()?;

        let mut query = IndexQuery::new(self.entity_name(), VERSION_INDEX);
        query.sort_keys = vec![versioning.string_attribute.clone()];
        query.sort_prefix = vec![(
            versioning.string_attribute.clone(),
            Value::String(encode_version(version, self.config().version_pad_width)),
        )];
        query.limit = Some(1);

        let records = self
            .store()
            .query(&query)
            .await
            .map_err(|e| self.store_failure(VERSION_INDEX, "query", e))?;
        Ok(records.into_iter().next().map(|record| self.instantiate(record)))
    }

    /// Highest stored version, 0 when there is none
    pub async fn latest_version(&self) -> DataAccessResult<u64> {
        let versioning = self.versioning_options()?;
        let latest = self.find_latest().await?;
        Ok(latest
            .and_then(|model| model.get(&versioning.attribute).and_then(Value::as_u64))
            .unwrap_or(0))
    }

    /// Persist `record` as the next version
    pub(crate) async fn create_version(&self, record: Record) -> DataAccessResult<Model> {
        let versioning = self.versioning_options()?.clone();
        let id = self.record_id(&record);
        let width = self.config().version_pad_width;
        let attempts = self.config().version_write_attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            let version = self.latest_version().await? + 1;

            let mut candidate = record.clone();
            candidate.insert(versioning.attribute.clone(), Value::from(version));
            candidate.insert(
                versioning.string_attribute.clone(),
                Value::String(encode_version(version, width)),
            );

            let condition = WriteCondition::UniqueOn(vec![versioning.string_attribute.clone()]);
            match self
                .store()
                .put(self.entity_name(), &id, candidate.clone(), condition)
                .await
            {
                Ok(()) => {
                    tracing::debug!(entity = %self.entity_name(), id = %id, version, "created version");
                    return Ok(self.instantiate(candidate));
                }
                Err(StoreError::ConditionFailed(reason)) => {
                    // A taken id does not free up on retry
                    let existing = self
                        .store()
                        .get(self.entity_name(), &id)
                        .await
                        .map_err(|e| self.store_failure(&id, "create", e))?;
                    if existing.is_some() {
                        tracing::warn!(
                            entity = %self.entity_name(),
                            id = %id,
                            "id already taken by an earlier version"
                        );
                        return Err(self.store_failure(&id, "create", StoreError::ConditionFailed(reason)));
                    }
                    tracing::warn!(
                        entity = %self.entity_name(),
                        version,
                        attempt,
                        "version already taken, retrying"
                    );
                    last_error = Some(StoreError::ConditionFailed(reason));
                }
                Err(e) => return Err(self.store_failure(&id, "create", e)),
            }
        }

        let source = last_error
            .unwrap_or_else(|| StoreError::ConditionFailed("no version could be assigned".to_string()));
        Err(self.store_failure(&id, "create", source))
    }
}
