//! In-memory `ChromaApi` fake with per-operation failure injection and a
//! call log, used by the pipeline tests.

use std::cell::RefCell;

use serde_json::{Value, json};

use crate::chroma::{ChromaApi, CollectionRef, QueryOutcome, RecordBatch, RecordInclude};
use crate::error::{ChromaError, Result};

pub(crate) fn metadata_map(entries: &[(&str, Value)]) -> serde_json::Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

pub(crate) struct FakeCollection {
    pub name: String,
    pub id: String,
    pub metadata: serde_json::Map<String, Value>,
    pub documents: Vec<Option<String>>,
    pub metadatas: Vec<Option<serde_json::Map<String, Value>>>,
    pub embeddings: Option<Vec<Vec<f64>>>,
    pub fail_count: bool,
    pub fail_get: bool,
    pub fail_query: bool,
    pub fail_filtered: bool,
}

impl FakeCollection {
    pub fn empty(name: &str) -> Self {
        Self::with_documents(name, &[])
    }

    pub fn with_documents(name: &str, documents: &[Option<&str>]) -> Self {
        let metadatas = vec![None; documents.len()];
        Self::with_records(name, documents, &metadatas)
    }

    pub fn with_records(
        name: &str,
        documents: &[Option<&str>],
        metadatas: &[Option<serde_json::Map<String, Value>>],
    ) -> Self {
        Self {
            name: name.to_string(),
            id: format!("{name}-id"),
            metadata: serde_json::Map::new(),
            documents: documents
                .iter()
                .map(|document| document.map(ToString::to_string))
                .collect(),
            metadatas: metadatas.to_vec(),
            embeddings: None,
            fail_count: false,
            fail_get: false,
            fail_query: false,
            fail_filtered: false,
        }
    }

    fn count(&self) -> u64 {
        self.documents.len() as u64
    }

    fn ids(&self) -> Vec<String> {
        (0..self.documents.len())
            .map(|index| format!("{}-{index}", self.name))
            .collect()
    }

    fn batch(&self, limit: usize, include: RecordInclude) -> RecordBatch {
        let take = limit.min(self.documents.len());
        RecordBatch {
            ids: self.ids().into_iter().take(take).collect(),
            documents: include
                .documents
                .then(|| self.documents.iter().take(take).cloned().collect()),
            metadatas: include
                .metadatas
                .then(|| self.metadatas.iter().take(take).cloned().collect()),
            embeddings: include.embeddings.then(|| {
                self.embeddings
                    .as_ref()
                    .map(|rows| rows.iter().take(take).cloned().collect())
                    .unwrap_or_default()
            }),
        }
    }
}

pub(crate) struct FakeStore {
    pub collections: Vec<FakeCollection>,
    /// Heartbeat calls beyond this allowance fail; the default never fails.
    pub heartbeat_ok_calls: usize,
    pub fail_version: bool,
    pub fail_list: bool,
    pub call_log: RefCell<Vec<String>>,
    pub heartbeats_seen: RefCell<usize>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            heartbeat_ok_calls: usize::MAX,
            fail_version: false,
            fail_list: false,
            call_log: RefCell::new(Vec::new()),
            heartbeats_seen: RefCell::new(0),
        }
    }
}

impl FakeStore {
    pub fn with_collections(collections: Vec<FakeCollection>) -> Self {
        Self {
            collections,
            ..Self::default()
        }
    }

    pub fn collection_ref(&self, name: &str) -> CollectionRef {
        let collection = self
            .collections
            .iter()
            .find(|collection| collection.name == name)
            .expect("known fake collection");
        CollectionRef {
            name: collection.name.clone(),
            id: collection.id.clone(),
            metadata: collection.metadata.clone(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_log.borrow().clone()
    }

    fn record(&self, call: String) {
        self.call_log.borrow_mut().push(call);
    }

    fn find(&self, collection: &CollectionRef) -> Result<&FakeCollection> {
        self.collections
            .iter()
            .find(|candidate| candidate.id == collection.id)
            .ok_or_else(|| {
                ChromaError::UnexpectedPayload(format!("unknown collection {}", collection.name))
            })
    }
}

fn injected(operation: &str, name: &str) -> ChromaError {
    ChromaError::Connection(format!("injected {operation} failure for {name}"))
}

impl ChromaApi for FakeStore {
    fn heartbeat(&self) -> Result<Value> {
        self.record("heartbeat".to_string());
        let mut seen = self.heartbeats_seen.borrow_mut();
        let index = *seen;
        *seen += 1;
        if index < self.heartbeat_ok_calls {
            Ok(json!({"nanosecond heartbeat": 1_700_000_000}))
        } else {
            Err(injected("heartbeat", "service"))
        }
    }

    fn version(&self) -> Result<Value> {
        self.record("version".to_string());
        if self.fail_version {
            return Err(ChromaError::Status {
                operation: "version",
                status: 503,
            });
        }
        Ok(json!("0.4.24"))
    }

    fn list_collections(&self) -> Result<Vec<CollectionRef>> {
        self.record("list_collections".to_string());
        if self.fail_list {
            return Err(injected("list_collections", "service"));
        }
        Ok(self
            .collections
            .iter()
            .map(|collection| CollectionRef {
                name: collection.name.clone(),
                id: collection.id.clone(),
                metadata: collection.metadata.clone(),
            })
            .collect())
    }

    fn count(&self, collection: &CollectionRef) -> Result<u64> {
        self.record(format!("count:{}", collection.name));
        let collection = self.find(collection)?;
        if collection.fail_count {
            return Err(ChromaError::Status {
                operation: "count",
                status: 500,
            });
        }
        Ok(collection.count())
    }

    fn get_records(
        &self,
        collection: &CollectionRef,
        limit: usize,
        include: RecordInclude,
    ) -> Result<RecordBatch> {
        self.record(format!("get_records:{}", collection.name));
        let collection = self.find(collection)?;
        if collection.fail_get {
            return Err(injected("get_records", &collection.name));
        }
        Ok(collection.batch(limit, include))
    }

    fn query(
        &self,
        collection: &CollectionRef,
        _text: &str,
        n_results: usize,
    ) -> Result<QueryOutcome> {
        self.record(format!("query:{}", collection.name));
        let collection = self.find(collection)?;
        if collection.fail_query {
            return Err(injected("query", &collection.name));
        }
        Ok(QueryOutcome {
            ids: collection.ids().into_iter().take(n_results).collect(),
            has_distances: true,
        })
    }

    fn filtered_get(
        &self,
        collection: &CollectionRef,
        key: &str,
        value: &Value,
        limit: usize,
    ) -> Result<RecordBatch> {
        self.record(format!("filtered_get:{}", collection.name));
        let collection = self.find(collection)?;
        if collection.fail_filtered {
            return Err(injected("filtered_get", &collection.name));
        }
        let ids = collection
            .ids()
            .into_iter()
            .zip(collection.metadatas.iter())
            .filter(|(_, metadata)| {
                metadata
                    .as_ref()
                    .is_some_and(|mapping| mapping.get(key) == Some(value))
            })
            .map(|(id, _)| id)
            .take(limit)
            .collect();
        Ok(RecordBatch {
            ids,
            documents: None,
            metadatas: None,
            embeddings: None,
        })
    }
}
