//! An in-memory mock of the document store.

use crate::{
    errors::StoreError,
    traits::{DocStore, IndexOrder},
};
use async_trait::async_trait;
use bson::{Bson, Document};
use std::{cmp::Ordering, collections::HashMap, sync::Mutex};

/// An in-memory [`DocStore`] supporting the filter subset the pipeline
/// uses: field equality, `$gte`/`$gt`/`$lte`/`$lt` comparisons, null
/// matching (absent-or-null), and multi-key sorts.
#[derive(Debug, Default)]
pub struct MemStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    indexes: Mutex<Vec<(String, Vec<(String, i32)>, bool)>>,
}

impl MemStore {
    /// The index specs registered through [`DocStore::create_index`].
    pub fn recorded_indexes(&self) -> Vec<(String, Vec<(String, i32)>, bool)> {
        self.indexes.lock().unwrap().clone()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.lock().unwrap().get(collection).map_or(0, Vec::len)
    }

    /// Whether a collection is empty or absent.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocStore for MemStore {
    async fn upsert(
        &self,
        collection: &str,
        key: Document,
        set: Document,
        set_on_insert: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(doc) = docs.iter_mut().find(|doc| matches(doc, &key)) {
            apply_set(doc, set);
        } else {
            let mut doc = Document::new();
            // As in the real store, equality fields of the key seed the
            // inserted document.
            for (field, value) in key {
                if !matches!(&value, Bson::Document(d) if has_operators(d)) {
                    doc.insert(field, value);
                }
            }
            apply_set(&mut doc, set_on_insert);
            apply_set(&mut doc, set);
            docs.push(doc);
        }
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.find_many(collection, filter, sort).await?.into_iter().next())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches(doc, &filter)).cloned().collect())
            .unwrap_or_default();
        if let Some(sort) = sort {
            // Apply sort keys in reverse so the first key dominates.
            for (field, direction) in sort.iter().collect::<Vec<_>>().into_iter().rev() {
                let descending = matches!(direction, Bson::Int32(d) if *d < 0)
                    || matches!(direction, Bson::Int64(d) if *d < 0);
                found.sort_by(|a, b| {
                    let ordering = compare(a.get(field), b.get(field));
                    if descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
        }
        Ok(found)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter_mut().find(|doc| matches(doc, &filter)) {
            Some(doc) => {
                apply_set(doc, set);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_index(
        &self,
        collection: &str,
        fields: &[(&str, IndexOrder)],
        unique: bool,
    ) -> Result<(), StoreError> {
        self.indexes.lock().unwrap().push((
            collection.to_string(),
            fields.iter().map(|(name, order)| (name.to_string(), order.as_i32())).collect(),
            unique,
        ));
        Ok(())
    }
}

fn apply_set(doc: &mut Document, set: Document) {
    for (field, value) in set {
        doc.insert(field, value);
    }
}

fn has_operators(doc: &Document) -> bool {
    doc.keys().any(|key| key.starts_with('$'))
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let value = doc.get(field);
        match condition {
            Bson::Document(ops) if has_operators(ops) => ops.iter().all(|(op, operand)| {
                let Some(value) = value else { return false };
                let ordering = compare(Some(value), Some(operand));
                match op.as_str() {
                    "$gte" => ordering != Ordering::Less,
                    "$gt" => ordering == Ordering::Greater,
                    "$lte" => ordering != Ordering::Greater,
                    "$lt" => ordering == Ordering::Less,
                    _ => false,
                }
            }),
            Bson::Null => value.is_none() || value == Some(&Bson::Null),
            expected => value.is_some_and(|value| equals(value, expected)),
        }
    })
}

fn equals(a: &Bson, b: &Bson) -> bool {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
    let (Some(a), Some(b)) = (a, b) else {
        return a.is_some().cmp(&b.is_some());
    };
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[tokio::test]
    async fn upsert_inserts_then_patches() {
        let store = MemStore::default();
        store
            .upsert("ops", doc! { "operId": 7_i64 }, doc! { "status": 0 }, doc! { "seen": true })
            .await
            .unwrap();
        store
            .upsert("ops", doc! { "operId": 7_i64 }, doc! { "status": 1 }, doc! { "seen": false })
            .await
            .unwrap();

        let found = store.find_one("ops", doc! { "operId": 7_i64 }, None).await.unwrap().unwrap();
        assert_eq!(found.get_i32("status").unwrap(), 1);
        // set_on_insert only applied on the first write.
        assert!(found.get_bool("seen").unwrap());
        assert_eq!(store.len("ops"), 1);
    }

    #[tokio::test]
    async fn filters_support_gte_and_null() {
        let store = MemStore::default();
        for (id, status, confirmation) in
            [(1_i64, 1, Bson::Null), (2, 0, Bson::Null), (3, 2, Bson::Boolean(true))]
        {
            store
                .upsert(
                    "ops",
                    doc! { "operId": id },
                    doc! { "status": status, "confirmationTime": confirmation },
                    doc! {},
                )
                .await
                .unwrap();
        }

        let pending = store
            .find_many("ops", doc! { "status": { "$gte": 1 }, "confirmationTime": Bson::Null }, None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].get_i64("operId").unwrap(), 1);
    }

    #[tokio::test]
    async fn two_key_sort_orders_like_the_dispatcher() {
        let store = MemStore::default();
        for (block, index) in [(7_i64, 1_i64), (5, 2), (5, 0), (6, 0)] {
            store
                .upsert(
                    "raw",
                    doc! { "blockNumber": block, "transactionIndex": index },
                    doc! {},
                    doc! {},
                )
                .await
                .unwrap();
        }

        let sorted = store
            .find_many("raw", doc! {}, Some(doc! { "blockNumber": 1, "transactionIndex": 1 }))
            .await
            .unwrap();
        let order: Vec<(i64, i64)> = sorted
            .iter()
            .map(|d| (d.get_i64("blockNumber").unwrap(), d.get_i64("transactionIndex").unwrap()))
            .collect();
        assert_eq!(order, vec![(5, 0), (5, 2), (6, 0), (7, 1)]);
    }

    #[tokio::test]
    async fn update_one_never_inserts() {
        let store = MemStore::default();
        let matched =
            store.update_one("bridge", doc! { "transferId": "0xaa" }, doc! { "status": 1 }).await.unwrap();
        assert!(!matched);
        assert!(store.is_empty("bridge"));
    }

    #[tokio::test]
    async fn mixed_width_integers_compare_equal() {
        let store = MemStore::default();
        store
            .upsert("ops", doc! { "operId": 7_i64 }, doc! { "status": 0_i32 }, doc! {})
            .await
            .unwrap();
        // An i32-typed filter still matches the i64-typed stored key.
        let found = store.find_one("ops", doc! { "operId": 7_i32 }, None).await.unwrap();
        assert!(found.is_some());
    }
}
