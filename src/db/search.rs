use std::collections::HashMap;

use rusqlite::{Result, params};
use tracing::debug;

use super::{Db, serialize_vector};

/// A chunk retrieved from vector search. Transient: constructed per query,
/// never persisted.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: i64,
    pub text: String,
    pub similarity: f32,
    pub source_table: String,
    pub source_id: i64,
    pub metadata: HashMap<String, String>,
}

impl Db {
    /// Cosine similarity search over the knowledge index.
    ///
    /// Returns chunks whose similarity to `query_vector` strictly exceeds
    /// `threshold`, ordered by similarity descending, truncated to `top_k`.
    /// Similarity is `1 - vec_distance_cosine(..)`, which matches a direct
    /// cosine similarity computation on the stored and query vectors.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievedChunk>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                k.id,
                k.chunk_text,
                k.source_table,
                k.source_id,
                k.metadata,
                vec_distance_cosine(v.embedding, ?) AS distance
            FROM vec_chunks v
            JOIN knowledge_chunks k ON v.rowid = k.id
            ORDER BY distance ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            params![serialize_vector(query_vector), top_k as i64],
            |row| {
                let distance: f64 = row.get(5)?;
                let metadata_json: String = row.get(4)?;
                Ok(RetrievedChunk {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    source_table: row.get(2)?,
                    source_id: row.get(3)?,
                    metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
                    similarity: (1.0 - distance) as f32,
                })
            },
        )?;

        // Rows are sorted by similarity descending, so the first result
        // below the threshold ends the list.
        let mut results = Vec::new();
        for row in rows {
            let chunk = row?;
            if chunk.similarity > threshold {
                results.push(chunk);
            }
        }

        debug!(
            "Vector search: {} of top-{} chunks above threshold {}",
            results.len(),
            top_k,
            threshold
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::knowledge::NewChunk;
    use crate::db::EMBEDDING_DIMENSIONS;
    use crate::embedder::cosine_similarity;

    /// Unit vector with weight concentrated on one axis pair.
    fn axis_vector(primary: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIMENSIONS];
        v[primary] = weight;
        v[(primary + 1) % EMBEDDING_DIMENSIONS] = (1.0 - weight * weight).max(0.0).sqrt();
        v
    }

    fn insert(db: &mut Db, table: &str, id: i64, text: &str, embedding: Vec<f32>) {
        db.upsert_chunks(
            table,
            id,
            &[NewChunk {
                text: text.to_string(),
                embedding,
                metadata: HashMap::new(),
            }],
        )
        .unwrap();
    }

    #[test]
    fn test_search_threshold_and_order() {
        let mut db = Db::open_in_memory().unwrap();

        // Query aligned with axis 0; the Go chunk is close, Python is not.
        let query = axis_vector(0, 1.0);
        insert(&mut db, "work_experience", 1, "Built services in Go", axis_vector(0, 0.9));
        insert(&mut db, "projects", 1, "Python data pipeline", axis_vector(0, 0.4));

        let results = db.search(&query, 3, 0.5).unwrap();
        assert_eq!(results.len(), 1, "only the Go chunk clears the threshold");
        assert_eq!(results[0].source_table, "work_experience");
        assert!(results[0].text.contains("Go"));
        assert!(results[0].similarity > 0.5);
    }

    #[test]
    fn test_search_similarity_matches_direct_cosine() {
        let mut db = Db::open_in_memory().unwrap();

        let query = axis_vector(0, 1.0);
        let stored = axis_vector(0, 0.8);
        insert(&mut db, "projects", 5, "stored chunk", stored.clone());

        let results = db.search(&query, 1, -1.0).unwrap();
        assert_eq!(results.len(), 1);

        let direct = cosine_similarity(&query, &stored);
        assert!(
            (results[0].similarity - direct).abs() < 1e-4,
            "index similarity {} differs from direct cosine {}",
            results[0].similarity,
            direct
        );
    }

    #[test]
    fn test_search_orders_descending_and_truncates() {
        let mut db = Db::open_in_memory().unwrap();

        let query = axis_vector(0, 1.0);
        insert(&mut db, "projects", 1, "far", axis_vector(0, 0.3));
        insert(&mut db, "projects", 2, "near", axis_vector(0, 0.95));
        insert(&mut db, "projects", 3, "middle", axis_vector(0, 0.6));

        let results = db.search(&query, 2, 0.0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "near");
        assert_eq!(results[1].text, "middle");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_search_empty_index() {
        let db = Db::open_in_memory().unwrap();
        let results = db.search(&vec![0.5; EMBEDDING_DIMENSIONS], 3, 0.5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_round_trips_metadata() {
        let mut db = Db::open_in_memory().unwrap();

        db.upsert_chunks(
            "work_experience",
            2,
            &[NewChunk {
                text: "Backend work".to_string(),
                embedding: axis_vector(0, 1.0),
                metadata: HashMap::from([
                    ("company".to_string(), "Acme".to_string()),
                    ("position".to_string(), "Engineer".to_string()),
                ]),
            }],
        )
        .unwrap();

        let results = db.search(&axis_vector(0, 1.0), 1, 0.5).unwrap();
        assert_eq!(results[0].metadata.get("company").unwrap(), "Acme");
        assert_eq!(results[0].metadata.get("position").unwrap(), "Engineer");
    }
}
