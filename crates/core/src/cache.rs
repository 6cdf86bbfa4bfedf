use crate::models::Document;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Processed documents keyed by their source path or URL.
///
/// Unbounded unless built with [`DocumentCache::with_capacity_limit`], in
/// which case the oldest insertion is evicted first.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<String, Arc<Document>>,
    insertion_order: VecDeque<String>,
    limit: Option<NonZeroUsize>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(limit: NonZeroUsize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Document>> {
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: impl Into<String>, document: Arc<Document>) {
        let key = key.into();
        if self.entries.insert(key.clone(), document).is_none() {
            self.insertion_order.push_back(key);
        }

        if let Some(limit) = self.limit {
            while self.entries.len() > limit.get() {
                let Some(oldest) = self.insertion_order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                debug!(key = %oldest, "evicted document from cache");
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
