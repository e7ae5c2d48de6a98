//! The shared pipeline checkpoint.
//!
//! A single document in `indexer_state` carries every task's cursor. All
//! writers patch it with `$set` upserts; under the default single-worker
//! scheduler the patches are globally serialized.

use crate::{collections::INDEXER_STATE, errors::StoreError, traits::DocStore, types::CheckpointDoc};
use bson::{doc, Document};

/// Loads the newest checkpoint document, or the empty default when the
/// pipeline has never run.
pub async fn load<S: DocStore + ?Sized>(store: &S) -> Result<CheckpointDoc, StoreError> {
    let found = store
        .find_one(INDEXER_STATE, doc! {}, Some(doc! { "updated_at": -1 }))
        .await?;
    match found {
        Some(document) => {
            bson::from_document(document).map_err(|e| StoreError::MalformedDocument {
                collection: INDEXER_STATE.to_string(),
                reason: e.to_string(),
            })
        }
        None => Ok(CheckpointDoc::default()),
    }
}

/// Applies a `$set` patch to the checkpoint document, creating it on first
/// use.
pub async fn update<S: DocStore + ?Sized>(store: &S, set: Document) -> Result<(), StoreError> {
    store.upsert(INDEXER_STATE, doc! {}, set, doc! {}).await
}
