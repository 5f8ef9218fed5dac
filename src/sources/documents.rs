//! Indexed-document source backed by the local full-text index

use super::{within, KnowledgeSource, SourceError};
use crate::index::DocumentIndex;
use crate::state_machine::Passage;
use async_trait::async_trait;
use std::time::Duration;

pub struct IndexedDocuments {
    index: DocumentIndex,
    top_k: usize,
    timeout: Duration,
}

impl IndexedDocuments {
    pub fn new(index: DocumentIndex, top_k: usize, timeout: Duration) -> Self {
        Self {
            index,
            top_k,
            timeout,
        }
    }
}

#[async_trait]
impl KnowledgeSource for IndexedDocuments {
    fn name(&self) -> &'static str {
        "documents"
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Passage>, SourceError> {
        let index = self.index.clone();
        let query = query.to_string();
        let top_k = self.top_k;

        // SQLite calls block; keep them off the async workers
        let hits = within(self.timeout, async move {
            tokio::task::spawn_blocking(move || index.search(&query, top_k))
                .await
                .map_err(SourceError::unavailable)?
                .map_err(SourceError::unavailable)
        })
        .await?;

        if hits.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(hits.into_iter().map(Passage::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunker;

    fn source() -> IndexedDocuments {
        let index = DocumentIndex::open_in_memory(Chunker::default()).unwrap();
        index
            .index_document("ibuprofen.txt", "Ibuprofen reduces headache pain.")
            .unwrap();
        IndexedDocuments::new(index, 3, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_fetch_returns_passages() {
        let passages = source().fetch("headache relief").await.unwrap();
        assert_eq!(passages, vec![Passage::new("Ibuprofen reduces headache pain.")]);
    }

    #[tokio::test]
    async fn test_fetch_without_match_is_empty() {
        let result = source().fetch("tinnitus").await;
        assert!(matches!(result, Err(SourceError::Empty)));
    }
}
