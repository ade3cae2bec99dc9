//! SQLite database for documents, chunk embeddings, and question history
//!
//! All mutations run inside transactions, so a failed ingest or delete never
//! leaves a document without its chunks (or the reverse).

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::document::{Chunk, Document, HistoryRecord, ScopedChunk};

/// SQLite-backed corpus store
pub struct CorpusDb {
    conn: Arc<Mutex<Connection>>,
}

impl CorpusDb {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL mode for better concurrency
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=10000;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                filename TEXT NOT NULL,
                ingested_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_owner_id ON documents(owner_id);

            CREATE TABLE IF NOT EXISTS chunks (
                document_id TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (document_id, chunk_index),
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                sources TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_owner_id ON history(owner_id);
        "#,
        )
        .map_err(|e| Error::storage(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Insert a document and its chunks in one transaction
    ///
    /// Fails with `StoreInconsistency` if the chunk embeddings do not match
    /// the dimensionality already present in the corpus.
    pub fn insert_document(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::storage(format!("Failed to begin transaction: {}", e)))?;

        if let Some(first) = chunks.first() {
            let existing_len: Option<i64> = tx
                .query_row("SELECT length(embedding) FROM chunks LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(|e| Error::storage(format!("Failed to probe corpus: {}", e)))?;

            // Every chunk in the batch must match the corpus dimensionality
            // (or, for the first document, agree with the rest of the batch).
            let expected = match existing_len {
                Some(len) => len as usize / 4,
                None => first.embedding.len(),
            };
            for chunk in chunks {
                if chunk.embedding.len() != expected {
                    return Err(Error::StoreInconsistency(format!(
                        "Chunk {}:{} has {} dimensions, corpus has {}",
                        chunk.document_id,
                        chunk.chunk_index,
                        chunk.embedding.len(),
                        expected
                    )));
                }
            }
        }

        tx.execute(
            "INSERT INTO documents (id, owner_id, filename, ingested_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                document.id.to_string(),
                document.owner_id,
                document.filename,
                document.ingested_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to insert document: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO chunks (document_id, chunk_index, content, embedding)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| Error::storage(format!("Failed to prepare statement: {}", e)))?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.document_id.to_string(),
                    chunk.chunk_index as i64,
                    chunk.content,
                    embedding_to_blob(&chunk.embedding),
                ])
                .map_err(|e| Error::storage(format!("Failed to insert chunk: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Delete a document owned by `owner_id`, returning how many chunks
    /// were removed
    ///
    /// A document that does not exist, or that belongs to someone else, is
    /// reported identically as `NotFound`.
    pub fn delete_document(&self, owner_id: &str, document_id: Uuid) -> Result<usize> {
        let mut conn = self.conn.lock();

        let tx = conn
            .transaction()
            .map_err(|e| Error::storage(format!("Failed to begin transaction: {}", e)))?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT owner_id FROM documents WHERE id = ?1",
                params![document_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::storage(format!("Failed to look up document: {}", e)))?;

        match owner {
            Some(owner) if owner == owner_id => {}
            _ => return Err(Error::NotFound("Document not found".to_string())),
        }

        let chunks_removed = tx
            .execute(
                "DELETE FROM chunks WHERE document_id = ?1",
                params![document_id.to_string()],
            )
            .map_err(|e| Error::storage(format!("Failed to delete chunks: {}", e)))?;

        tx.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![document_id.to_string()],
        )
        .map_err(|e| Error::storage(format!("Failed to delete document: {}", e)))?;

        tx.commit()
            .map_err(|e| Error::storage(format!("Failed to commit transaction: {}", e)))?;

        Ok(chunks_removed)
    }

    /// Load every chunk in scope, joined with its source label
    ///
    /// `owner_id = None` loads the whole corpus (shared mode). Chunks come
    /// back in ingestion order, then chunk order, which gives the ranker a
    /// deterministic tie-break.
    pub fn chunks_in_scope(&self, owner_id: Option<&str>) -> Result<Vec<ScopedChunk>> {
        let conn = self.conn.lock();

        let sql = match owner_id {
            Some(_) => {
                "SELECT c.document_id, c.chunk_index, c.content, c.embedding, d.filename
                 FROM chunks c
                 JOIN documents d ON d.id = c.document_id
                 WHERE d.owner_id = ?1
                 ORDER BY d.rowid, c.chunk_index"
            }
            None => {
                "SELECT c.document_id, c.chunk_index, c.content, c.embedding, d.filename
                 FROM chunks c
                 JOIN documents d ON d.id = c.document_id
                 ORDER BY d.rowid, c.chunk_index"
            }
        };

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<ScopedChunk> {
            let document_id: String = row.get(0)?;
            let chunk_index: i64 = row.get(1)?;
            let content: String = row.get(2)?;
            let blob: Vec<u8> = row.get(3)?;
            let source_label: String = row.get(4)?;

            Ok(ScopedChunk {
                document_id: parse_uuid(document_id, 0)?,
                chunk_index: chunk_index as u32,
                content,
                embedding: blob_to_embedding(&blob).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Blob,
                        Box::new(e),
                    )
                })?,
                source_label,
            })
        };

        let rows = match owner_id {
            Some(owner) => stmt.query_map(params![owner], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(|e| Error::storage(format!("Failed to load chunks: {}", e)))?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(|e| Error::storage(format!("Failed to read chunk: {}", e)))?);
        }

        Ok(chunks)
    }

    /// List documents owned by `owner_id`, in ingestion order
    pub fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, filename, ingested_at FROM documents
                 WHERE owner_id = ?1 ORDER BY rowid",
            )
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![owner_id], |row| {
                let id: String = row.get(0)?;
                let owner_id: String = row.get(1)?;
                let filename: String = row.get(2)?;
                let ingested_at: String = row.get(3)?;

                Ok(Document {
                    id: parse_uuid(id, 0)?,
                    owner_id,
                    filename,
                    ingested_at: parse_timestamp(ingested_at, 3)?,
                })
            })
            .map_err(|e| Error::storage(format!("Failed to list documents: {}", e)))?;

        let mut documents = Vec::new();
        for row in rows {
            documents
                .push(row.map_err(|e| Error::storage(format!("Failed to read document: {}", e)))?);
        }

        Ok(documents)
    }

    /// Append a question/answer record to the history log
    pub fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        let conn = self.conn.lock();

        let sources = serde_json::to_string(&record.sources)?;

        conn.execute(
            "INSERT INTO history (owner_id, question, answer, sources, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.owner_id,
                record.question,
                record.answer,
                sources,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to append history: {}", e)))?;

        Ok(())
    }

    /// Read an owner's history in chronological order, paginated
    pub fn history_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HistoryRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                "SELECT owner_id, question, answer, sources, created_at FROM history
                 WHERE owner_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![owner_id, limit as i64, offset as i64], |row| {
                let owner_id: String = row.get(0)?;
                let question: String = row.get(1)?;
                let answer: String = row.get(2)?;
                let sources_json: String = row.get(3)?;
                let created_at: String = row.get(4)?;

                let sources: Vec<String> =
                    serde_json::from_str(&sources_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;

                Ok(HistoryRecord {
                    owner_id,
                    question,
                    answer,
                    sources,
                    created_at: parse_timestamp(created_at, 4)?,
                })
            })
            .map_err(|e| Error::storage(format!("Failed to read history: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            records
                .push(row.map_err(|e| Error::storage(format!("Failed to read record: {}", e)))?);
        }

        Ok(records)
    }
}

/// Encode an embedding as little-endian f32 bytes
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Decode a little-endian f32 blob back into an embedding
fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(Error::StoreInconsistency(format!(
            "Embedding blob has {} bytes, not a multiple of 4",
            blob.len()
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn parse_uuid(s: String, column: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(s: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(owner: &str, filename: &str) -> Document {
        Document::new(owner.to_string(), filename.to_string())
    }

    fn chunks_for(document: &Document, embeddings: &[Vec<f32>]) -> Vec<Chunk> {
        embeddings
            .iter()
            .enumerate()
            .map(|(i, e)| {
                Chunk::new(
                    document.id,
                    i as u32,
                    format!("{} chunk {}", document.filename, i),
                    e.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn insert_and_load_in_ingestion_order() {
        let db = CorpusDb::in_memory().unwrap();

        let first = doc("alice", "a.txt");
        db.insert_document(&first, &chunks_for(&first, &[vec![1.0, 0.0], vec![0.0, 1.0]]))
            .unwrap();

        let second = doc("alice", "b.txt");
        db.insert_document(&second, &chunks_for(&second, &[vec![0.5, 0.5]]))
            .unwrap();

        let chunks = db.chunks_in_scope(Some("alice")).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].source_label, "a.txt");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[2].source_label, "b.txt");
        assert_eq!(chunks[0].embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn scope_isolates_owners() {
        let db = CorpusDb::in_memory().unwrap();

        let alice_doc = doc("alice", "alice.txt");
        db.insert_document(&alice_doc, &chunks_for(&alice_doc, &[vec![1.0, 0.0]]))
            .unwrap();

        let bob_doc = doc("bob", "bob.txt");
        db.insert_document(&bob_doc, &chunks_for(&bob_doc, &[vec![0.0, 1.0]]))
            .unwrap();

        let alice_chunks = db.chunks_in_scope(Some("alice")).unwrap();
        assert_eq!(alice_chunks.len(), 1);
        assert_eq!(alice_chunks[0].source_label, "alice.txt");

        // Shared scope sees everything.
        assert_eq!(db.chunks_in_scope(None).unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_document_and_chunks() {
        let db = CorpusDb::in_memory().unwrap();

        let document = doc("alice", "a.txt");
        db.insert_document(
            &document,
            &chunks_for(&document, &[vec![1.0, 0.0], vec![0.0, 1.0]]),
        )
        .unwrap();

        let removed = db.delete_document("alice", document.id).unwrap();
        assert_eq!(removed, 2);
        assert!(db.chunks_in_scope(Some("alice")).unwrap().is_empty());
        assert!(db.list_documents("alice").unwrap().is_empty());
    }

    #[test]
    fn delete_unknown_document_is_not_found() {
        let db = CorpusDb::in_memory().unwrap();
        let err = db.delete_document("alice", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn delete_by_wrong_owner_is_not_found() {
        let db = CorpusDb::in_memory().unwrap();

        let document = doc("alice", "a.txt");
        db.insert_document(&document, &chunks_for(&document, &[vec![1.0, 0.0]]))
            .unwrap();

        let err = db.delete_document("bob", document.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        // Still present for the real owner.
        assert_eq!(db.list_documents("alice").unwrap().len(), 1);
    }

    #[test]
    fn enforces_corpus_dimensionality() {
        let db = CorpusDb::in_memory().unwrap();

        let first = doc("alice", "a.txt");
        db.insert_document(&first, &chunks_for(&first, &[vec![1.0, 0.0]]))
            .unwrap();

        let second = doc("alice", "b.txt");
        let err = db
            .insert_document(&second, &chunks_for(&second, &[vec![1.0, 0.0, 0.0]]))
            .unwrap_err();
        assert!(matches!(err, Error::StoreInconsistency(_)));

        // The failed ingest left nothing behind.
        assert_eq!(db.list_documents("alice").unwrap().len(), 1);
    }

    #[test]
    fn rejects_mixed_dimensions_within_one_batch() {
        let db = CorpusDb::in_memory().unwrap();

        let document = doc("alice", "a.txt");
        let err = db
            .insert_document(
                &document,
                &chunks_for(&document, &[vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::StoreInconsistency(_)));
        assert!(db.list_documents("alice").unwrap().is_empty());
    }

    #[test]
    fn history_is_append_only_and_paginated() {
        let db = CorpusDb::in_memory().unwrap();

        for i in 0..5 {
            db.append_history(&HistoryRecord::new(
                "alice".to_string(),
                format!("question {i}"),
                format!("answer {i}"),
                vec!["a.txt".to_string()],
            ))
            .unwrap();
        }
        db.append_history(&HistoryRecord::new(
            "bob".to_string(),
            "other".to_string(),
            "other".to_string(),
            Vec::new(),
        ))
        .unwrap();

        let all = db.history_for_owner("alice", 50, 0).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].question, "question 0");
        assert_eq!(all[4].question, "question 4");

        let page = db.history_for_owner("alice", 2, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].question, "question 2");

        assert_eq!(db.history_for_owner("bob", 50, 0).unwrap().len(), 1);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");

        let document = doc("alice", "a.txt");
        {
            let db = CorpusDb::new(&path).unwrap();
            db.insert_document(&document, &chunks_for(&document, &[vec![1.0, 0.0]]))
                .unwrap();
        }

        let db = CorpusDb::new(&path).unwrap();
        let chunks = db.chunks_in_scope(Some("alice")).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_id, document.id);
        assert_eq!(chunks[0].embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn embedding_blob_round_trip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let blob = embedding_to_blob(&embedding);
        assert_eq!(blob.len(), 12);
        assert_eq!(blob_to_embedding(&blob).unwrap(), embedding);
    }

    #[test]
    fn truncated_blob_is_inconsistent() {
        assert!(matches!(
            blob_to_embedding(&[0u8; 7]),
            Err(Error::StoreInconsistency(_))
        ));
    }
}
