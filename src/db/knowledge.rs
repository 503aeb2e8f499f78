use std::collections::HashMap;

use rusqlite::{Result, params};
use tracing::debug;

use super::{Db, serialize_vector};

/// A chunk ready for insertion: formatted text, passage embedding, and
/// provenance metadata.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl Db {
    /// Replace all chunks owned by `(source_table, source_id)` with `chunks`.
    ///
    /// Delete and insert run in one transaction: either the source ends up
    /// with exactly the new chunk set, or the old rows remain untouched.
    /// Atomicity is per source only; callers re-indexing multiple sources
    /// must treat each upsert independently.
    ///
    /// Returns the number of chunks inserted. Chunk ids are fresh on every
    /// upsert and must not be cached across re-indexing.
    pub fn upsert_chunks(
        &mut self,
        source_table: &str,
        source_id: i64,
        chunks: &[NewChunk],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;

        // Virtual table rows are not covered by cascades; delete them first.
        tx.execute(
            "DELETE FROM vec_chunks WHERE rowid IN \
             (SELECT id FROM knowledge_chunks WHERE source_table = ? AND source_id = ?)",
            params![source_table, source_id],
        )?;
        tx.execute(
            "DELETE FROM knowledge_chunks WHERE source_table = ? AND source_id = ?",
            params![source_table, source_id],
        )?;

        for chunk in chunks {
            let metadata_json =
                serde_json::to_string(&chunk.metadata).unwrap_or_else(|_| "{}".to_string());
            tx.execute(
                "INSERT INTO knowledge_chunks (source_table, source_id, chunk_text, metadata) \
                 VALUES (?, ?, ?, ?)",
                params![source_table, source_id, chunk.text, metadata_json],
            )?;
            let chunk_id = tx.last_insert_rowid();

            let vector_blob = serialize_vector(&chunk.embedding);
            tx.execute(
                "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
                params![chunk_id, vector_blob],
            )?;
        }

        tx.commit()?;
        debug!(
            "Upserted {} chunks for {}:{}",
            chunks.len(),
            source_table,
            source_id
        );
        Ok(chunks.len())
    }

    /// Delete all chunks owned by `(source_table, source_id)`.
    pub fn delete_chunks(&mut self, source_table: &str, source_id: i64) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM vec_chunks WHERE rowid IN \
             (SELECT id FROM knowledge_chunks WHERE source_table = ? AND source_id = ?)",
            params![source_table, source_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM knowledge_chunks WHERE source_table = ? AND source_id = ?",
            params![source_table, source_id],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Total number of chunks in the index.
    pub fn chunk_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM knowledge_chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of chunks owned by one source.
    pub fn source_chunk_count(&self, source_table: &str, source_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE source_table = ? AND source_id = ?",
            params![source_table, source_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::EMBEDDING_DIMENSIONS;

    fn chunk(text: &str, fill: f32) -> NewChunk {
        NewChunk {
            text: text.to_string(),
            embedding: vec![fill; EMBEDDING_DIMENSIONS],
            metadata: HashMap::from([("company".to_string(), "Acme".to_string())]),
        }
    }

    #[test]
    fn test_upsert_replaces_prior_chunks() {
        let mut db = Db::open_in_memory().unwrap();

        let inserted = db
            .upsert_chunks(
                "work_experience",
                1,
                &[chunk("First chunk", 0.1), chunk("Second chunk", 0.2)],
            )
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.source_chunk_count("work_experience", 1).unwrap(), 2);

        // Re-index with a different set: old rows fully replaced.
        db.upsert_chunks("work_experience", 1, &[chunk("Replacement", 0.3)])
            .unwrap();
        assert_eq!(db.source_chunk_count("work_experience", 1).unwrap(), 1);
        assert_eq!(db.chunk_count().unwrap(), 1);

        let vec_rows: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM vec_chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vec_rows, 1);
    }

    #[test]
    fn test_upsert_scoped_to_source() {
        let mut db = Db::open_in_memory().unwrap();

        db.upsert_chunks("projects", 1, &[chunk("Project one", 0.1)])
            .unwrap();
        db.upsert_chunks("projects", 2, &[chunk("Project two", 0.2)])
            .unwrap();
        db.upsert_chunks("education", 1, &[chunk("School", 0.3)])
            .unwrap();

        // Re-indexing projects:1 leaves the other sources alone.
        db.upsert_chunks("projects", 1, &[chunk("Project one v2", 0.4)])
            .unwrap();

        assert_eq!(db.source_chunk_count("projects", 1).unwrap(), 1);
        assert_eq!(db.source_chunk_count("projects", 2).unwrap(), 1);
        assert_eq!(db.source_chunk_count("education", 1).unwrap(), 1);
    }

    #[test]
    fn test_upsert_empty_set_clears_source() {
        let mut db = Db::open_in_memory().unwrap();

        db.upsert_chunks("projects", 7, &[chunk("Old", 0.1)]).unwrap();
        let inserted = db.upsert_chunks("projects", 7, &[]).unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(db.source_chunk_count("projects", 7).unwrap(), 0);
    }

    #[test]
    fn test_delete_chunks() {
        let mut db = Db::open_in_memory().unwrap();

        db.upsert_chunks("skills", 3, &[chunk("Rust", 0.1), chunk("Go", 0.2)])
            .unwrap();
        let deleted = db.delete_chunks("skills", 3).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.chunk_count().unwrap(), 0);

        let vec_rows: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM vec_chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(vec_rows, 0);
    }
}
