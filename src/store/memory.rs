use async_trait::async_trait;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::document::{
    compare_values, DocPath, Document, DocumentStore, Direction, Query, StoreError, WriteBatch,
    WriteOp, MAX_BATCH_WRITES,
};

type Collection = IndexMap<String, Document>;

/// In-process document store. Collections keep documents in insertion order,
/// which is also the order unsorted queries return them in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, IndexMap::len)
    }

    fn apply(collections: &mut HashMap<String, Collection>, op: WriteOp) {
        match op {
            WriteOp::Set(path, doc) => {
                collections
                    .entry(path.collection)
                    .or_default()
                    .insert(path.id, doc);
            }
            WriteOp::Merge(path, fields) => {
                if let Some(existing) = collections
                    .get_mut(&path.collection)
                    .and_then(|c| c.get_mut(&path.id))
                {
                    existing.extend(fields);
                }
            }
            WriteOp::Delete(path) => {
                if let Some(collection) = collections.get_mut(&path.collection) {
                    collection.shift_remove(&path.id);
                }
            }
        }
    }
}

fn order_documents(a: &Document, b: &Document, field: &str, direction: Direction) -> Ordering {
    let ordering = match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&path.collection)
            .and_then(|c| c.get(&path.id))
            .cloned())
    }

    async fn set(&self, path: &DocPath, doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        Self::apply(&mut collections, WriteOp::Set(path.clone(), doc));
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        Self::apply(&mut collections, WriteOp::Delete(path.clone()));
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|c| c.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            // Stable: ties keep insertion order.
            docs.sort_by(|a, b| order_documents(a, b, field, *direction));
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.len() > MAX_BATCH_WRITES {
            return Err(StoreError::Rejected(format!(
                "batch of {} writes exceeds the limit of {}",
                batch.len(),
                MAX_BATCH_WRITES
            )));
        }
        // A single write guard makes the whole batch visible at once.
        let mut collections = self.collections.write().await;
        for op in batch.into_ops() {
            Self::apply(&mut collections, op);
        }
        Ok(())
    }
}
