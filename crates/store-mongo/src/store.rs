//! The MongoDB-backed [`DocStore`].

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{
    options::IndexOptions,
    Client, Database, IndexModel,
};
use stablescan_indexer::{
    errors::StoreError,
    traits::{DocStore, IndexOrder},
};
use tracing::info;

const LOG_TARGET: &str = "store";

/// A [`DocStore`] over one MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connects to the store described by the configuration.
    pub async fn connect(uri: &str, db: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await.map_err(backend)?;
        info!(target: LOG_TARGET, "Connected to database `{db}`");
        Ok(Self { db: client.database(db) })
    }

    /// Wraps an already-opened database handle.
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocStore for MongoStore {
    async fn upsert(
        &self,
        collection: &str,
        key: Document,
        set: Document,
        set_on_insert: Document,
    ) -> Result<(), StoreError> {
        let mut update = doc! { "$set": set };
        if !set_on_insert.is_empty() {
            update.insert("$setOnInsert", set_on_insert);
        }
        self.collection(collection)
            .update_one(key, update)
            .upsert(true)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection);
        let mut query = coll.find_one(filter);
        if let Some(sort) = sort {
            query = query.sort(sort);
        }
        query.await.map_err(backend)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let coll = self.collection(collection);
        let mut query = coll.find(filter);
        if let Some(sort) = sort {
            query = query.sort(sort);
        }
        let cursor = query.await.map_err(backend)?;
        cursor.try_collect().await.map_err(backend)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<bool, StoreError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(backend)?;
        Ok(result.matched_count > 0)
    }

    async fn create_index(
        &self,
        collection: &str,
        fields: &[(&str, IndexOrder)],
        unique: bool,
    ) -> Result<(), StoreError> {
        let mut keys = Document::new();
        for (field, order) in fields {
            keys.insert(*field, order.as_i32());
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        self.collection(collection).create_index(model).await.map_err(backend)?;
        Ok(())
    }
}

fn backend(err: mongodb::error::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}
