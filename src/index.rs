//! Local medical document index
//!
//! Chunks are stored in an `SQLite` FTS5 table and ranked by BM25. Documents
//! are keyed by path and re-chunked only when their content hash changes.

mod chunker;
mod schema;

pub use chunker::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use schema::{IndexOutcome, IndexStats, IngestReport};
use schema::SCHEMA;

use chrono::Utc;
use ignore::WalkBuilder;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// File extensions picked up by directory ingestion
const INGEST_EXTENSIONS: &[&str] = &["txt", "md"];

/// Upper bound on distinct terms sent to the full-text matcher
const MAX_QUERY_TERMS: usize = 64;

/// Labels of a context-augmented query: `Context: ...\nQuestion: ...`
const CONTEXT_LABEL: &str = "Context:";
const QUESTION_LABEL: &str = "Question:";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] ignore::Error),
    #[error("Index lock poisoned")]
    Poisoned,
}

pub type IndexResult<T> = Result<T, IndexError>;

/// Thread-safe index handle
#[derive(Clone)]
pub struct DocumentIndex {
    conn: Arc<Mutex<Connection>>,
    chunker: Chunker,
}

impl DocumentIndex {
    /// Open or create the index at `path`, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P, chunker: Chunker) -> IndexResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| IndexError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?, chunker)
    }

    /// Open an in-memory index, used when the on-disk index is unavailable
    pub fn open_in_memory(chunker: Chunker) -> IndexResult<Self> {
        Self::init(Connection::open_in_memory()?, chunker)
    }

    fn init(conn: Connection, chunker: Chunker) -> IndexResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            chunker,
        })
    }

    fn lock(&self) -> IndexResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| IndexError::Poisoned)
    }

    // ==================== Ingestion ====================

    /// Chunk and store `content` under `path`, replacing any previous chunks.
    /// Skipped when the stored content hash is unchanged.
    pub fn index_document(&self, path: &str, content: &str) -> IndexResult<IndexOutcome> {
        let hash = content_hash(content);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, content_hash FROM documents WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, stored)) = &existing {
            if *stored == hash {
                return Ok(IndexOutcome::Unchanged);
            }
            tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![id])?;
        }

        let chunks = self.chunker.split(content);
        let id: i64 = tx.query_row(
            "INSERT INTO documents (path, content_hash, chunk_count, indexed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET
                content_hash = excluded.content_hash,
                chunk_count = excluded.chunk_count,
                indexed_at = excluded.indexed_at
             RETURNING id",
            params![path, hash, chunks.len(), Utc::now().to_rfc3339()],
            |row| row.get(0),
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO chunks (content, document_id, ordinal) VALUES (?1, ?2, ?3)",
            )?;
            for (ordinal, chunk) in chunks.iter().enumerate() {
                insert.execute(params![chunk, id, ordinal])?;
            }
        }

        tx.commit()?;
        Ok(IndexOutcome::Indexed {
            chunks: chunks.len(),
        })
    }

    /// Index every `.txt`/`.md` file under `dir`, honoring ignore files
    pub fn ingest_dir(&self, dir: &Path) -> IndexResult<IngestReport> {
        let mut report = IngestReport::default();

        for entry in WalkBuilder::new(dir).build() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file()) || !is_ingestible(path) {
                continue;
            }
            report.scanned += 1;

            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.index_document(&path.display().to_string(), &content)? {
                IndexOutcome::Unchanged => report.unchanged += 1,
                IndexOutcome::Indexed { chunks } => {
                    tracing::debug!(path = %path.display(), chunks, "Indexed document");
                    report.indexed += 1;
                    report.chunks += chunks;
                }
            }
        }

        Ok(report)
    }

    // ==================== Retrieval ====================

    /// Top `top_k` chunk texts for `query`, best first
    pub fn search(&self, query: &str, top_k: usize) -> IndexResult<Vec<String>> {
        let Some(expr) = match_expression(query) else {
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content FROM chunks WHERE chunks MATCH ?1 ORDER BY bm25(chunks) LIMIT ?2",
        )?;
        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![expr, limit], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>().map_err(Into::into)
    }

    pub fn stats(&self) -> IndexResult<IndexStats> {
        let conn = self.lock()?;
        let documents: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(IndexStats {
            documents: u64::try_from(documents).unwrap_or_default(),
            chunks: u64::try_from(chunks).unwrap_or_default(),
        })
    }
}

fn is_ingestible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INGEST_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// OR of quoted terms, so arbitrary user text never hits FTS5 query syntax.
/// Question terms come first; context terms fill whatever budget is left.
fn match_expression(query: &str) -> Option<String> {
    let (context, question) = match query.rsplit_once(QUESTION_LABEL) {
        Some((context, question)) => {
            let context = context.trim_start();
            (context.strip_prefix(CONTEXT_LABEL).unwrap_or(context), question)
        }
        None => ("", query),
    };

    let mut seen = HashSet::new();
    let terms: Vec<String> = terms_of(question)
        .chain(terms_of(context))
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_QUERY_TERMS)
        .map(|t| format!("\"{t}\""))
        .collect();

    (!terms.is_empty()).then(|| terms.join(" OR "))
}

fn terms_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
}
