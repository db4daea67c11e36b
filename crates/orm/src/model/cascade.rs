//! Removal with dependents
//!
//! Removing a model first removes, recursively, every dependent reachable
//! through its has_one/has_many references flagged `remove_dependents`.
//! Sibling removals run concurrently. If any dependent fails to be removed
//! the model itself is kept, so a failed cascade never leaves dependents
//! pointing at a deleted owner.

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use super::Model;
use crate::error::{DataAccessError, DataAccessResult};
use crate::schema::Reference;

impl Model {
    /// Remove this model and its dependents
    pub async fn remove(&mut self) -> DataAccessResult<()> {
        remove_model(self).await
    }
}

fn remove_model(model: &mut Model) -> BoxFuture<'_, DataAccessResult<()>> {
    async move {
        model.ensure_not_removed()?;
        let schema = std::sync::Arc::clone(model.schema());
        let entity = schema.entity_name().to_string();
        let id = model.id().to_string();

        if !schema.allows_remove() {
            return Err(DataAccessError::not_allowed(&entity, "remove"));
        }

        let references: Vec<&Reference> = schema.dependent_references().collect();
        tracing::debug!(entity = %entity, id = %id, references = references.len(), "removing");

        let owner: &Model = model;
        let resolved = join_all(
            references
                .iter()
                .map(|reference| reference.resolver().resolve(owner, reference)),
        )
        .await;

        let mut failures = Vec::new();
        let mut dependents = Vec::new();
        for result in resolved {
            match result {
                Ok(models) => dependents.extend(models),
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() && !dependents.is_empty() {
            let removed = join_all(dependents.iter_mut().map(remove_model)).await;
            failures.extend(removed.into_iter().filter_map(Result::err));
        }

        if !failures.is_empty() {
            let failed = failures.len();
            let first = failures.swap_remove(0);
            tracing::error!(
                entity = %entity,
                id = %id,
                failed,
                error = %first,
                "failed to remove dependents, keeping record"
            );
            return Err(DataAccessError::CascadeFailure {
                entity,
                id,
                failed,
                source: Box::new(first),
            });
        }

        model
            .collection()
            .store()
            .delete(&entity, std::slice::from_ref(&id))
            .await
            .map_err(|e| model.collection().store_failure(&id, "remove", e))?;

        model.mark_removed();
        tracing::debug!(entity = %entity, id = %id, dependents = dependents.len(), "removed");
        Ok(())
    }
    .boxed()
}
