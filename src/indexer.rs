//! Indexing pipeline: profile records → formatted text → chunks →
//! passage embeddings → knowledge index.
//!
//! Per-record indexing is idempotent: the index upsert deletes the prior
//! chunk set for `(source_table, source_id)` in the same transaction that
//! inserts the replacement, so re-running always converges on the latest
//! content.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

use crate::config::ChunkingConfig;
use crate::db::Db;
use crate::db::knowledge::NewChunk;
use crate::embedder::Embedder;
use crate::error::Result;
use crate::formatter;
use crate::profile::{ProfileStore, metadata};
use crate::segmenter;

/// The record types the pipeline knows how to index.
///
/// Dispatch is an explicit match on this tag; each variant maps to one
/// source table and one formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ProfileBasics,
    WorkExperience,
    Project,
    SkillCategory,
    Education,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::ProfileBasics,
        SourceKind::WorkExperience,
        SourceKind::Project,
        SourceKind::SkillCategory,
        SourceKind::Education,
    ];

    /// The source table name chunks of this kind are keyed by.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            SourceKind::ProfileBasics => "profile_basics",
            SourceKind::WorkExperience => "work_experience",
            SourceKind::Project => "projects",
            SourceKind::SkillCategory => "skill_categories",
            SourceKind::Education => "education",
        }
    }
}

/// Chunk counts from a full reindex, per source type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub profile_basics: usize,
    pub work_experience: usize,
    pub projects: usize,
    pub skill_categories: usize,
    pub education: usize,
    pub total_chunks: usize,
}

/// Converts profile records into indexed knowledge chunks.
pub struct Indexer<'a, S: ProfileStore + ?Sized> {
    db: Arc<TokioMutex<Db>>,
    embedder: Arc<dyn Embedder>,
    store: &'a S,
    chunking: ChunkingConfig,
}

impl<'a, S: ProfileStore + ?Sized> Indexer<'a, S> {
    pub fn new(
        db: Arc<TokioMutex<Db>>,
        embedder: Arc<dyn Embedder>,
        store: &'a S,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            db,
            embedder,
            store,
            chunking,
        }
    }

    /// Index one record of the given kind. Returns the chunk count created.
    ///
    /// A missing record produces zero chunks and is logged, not raised.
    pub async fn index_source(&self, kind: SourceKind, id: i64) -> Result<usize> {
        match kind {
            SourceKind::ProfileBasics => self.index_profile_basics(id).await,
            SourceKind::WorkExperience => self.index_work_experience(id).await,
            SourceKind::Project => self.index_project(id).await,
            SourceKind::SkillCategory => self.index_skill_category(id).await,
            SourceKind::Education => self.index_education(id).await,
        }
    }

    pub async fn index_profile_basics(&self, id: i64) -> Result<usize> {
        let Some(basics) = self.store.basics(id) else {
            warn!("ProfileBasics {id} not found, skipping");
            return Ok(0);
        };

        let text = formatter::format_profile_basics(&basics);
        let meta = metadata(&[("name", &basics.full_name)]);
        self.index_text(SourceKind::ProfileBasics, id, &text, meta).await
    }

    pub async fn index_work_experience(&self, id: i64) -> Result<usize> {
        let Some(exp) = self.store.work_experience(id) else {
            warn!("WorkExperience {id} not found, skipping");
            return Ok(0);
        };

        let text = formatter::format_work_experience(&exp);
        let meta = metadata(&[("company", &exp.company_name), ("position", &exp.position)]);
        self.index_text(SourceKind::WorkExperience, id, &text, meta).await
    }

    pub async fn index_project(&self, id: i64) -> Result<usize> {
        let Some(project) = self.store.project(id) else {
            warn!("Project {id} not found, skipping");
            return Ok(0);
        };

        let text = formatter::format_project(&project);
        let meta = metadata(&[("project_name", &project.name)]);
        self.index_text(SourceKind::Project, id, &text, meta).await
    }

    pub async fn index_skill_category(&self, id: i64) -> Result<usize> {
        let Some(category) = self.store.skill_category(id) else {
            warn!("SkillCategory {id} not found, skipping");
            return Ok(0);
        };

        let text = formatter::format_skill_category(&category);
        let meta = metadata(&[("category", &category.name)]);
        self.index_text(SourceKind::SkillCategory, id, &text, meta).await
    }

    pub async fn index_education(&self, id: i64) -> Result<usize> {
        let Some(edu) = self.store.education(id) else {
            warn!("Education {id} not found, skipping");
            return Ok(0);
        };

        let text = formatter::format_education(&edu);
        let meta = metadata(&[("institution", &edu.institution)]);
        self.index_text(SourceKind::Education, id, &text, meta).await
    }

    /// Reindex every record of every source type.
    pub async fn index_all(&self) -> Result<IndexStats> {
        let mut stats = IndexStats::default();

        for basics in self.store.all_basics() {
            stats.profile_basics += self.index_profile_basics(basics.id).await?;
        }
        for exp in self.store.all_work_experience() {
            stats.work_experience += self.index_work_experience(exp.id).await?;
        }
        for project in self.store.all_projects() {
            stats.projects += self.index_project(project.id).await?;
        }
        for category in self.store.all_skill_categories() {
            stats.skill_categories += self.index_skill_category(category.id).await?;
        }
        for edu in self.store.all_education() {
            stats.education += self.index_education(edu.id).await?;
        }

        stats.total_chunks = stats.profile_basics
            + stats.work_experience
            + stats.projects
            + stats.skill_categories
            + stats.education;

        info!("Full reindex completed: {stats:?}");
        Ok(stats)
    }

    /// Segment, embed, and upsert one formatted text block.
    async fn index_text(
        &self,
        kind: SourceKind,
        id: i64,
        text: &str,
        meta: HashMap<String, String>,
    ) -> Result<usize> {
        let chunks = segmenter::segment(
            text,
            self.chunking.max_tokens,
            self.chunking.overlap_tokens,
            self.chunking.min_chunk_size,
        );

        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_passage_batch(&refs)?;

        let new_chunks: Vec<NewChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| NewChunk {
                text,
                embedding,
                metadata: meta.clone(),
            })
            .collect();

        let created = {
            let mut db = self.db.lock().await;
            db.upsert_chunks(kind.table(), id, &new_chunks)?
        };

        info!("Indexed {}:{id}: {created} chunks", kind.table());
        Ok(created)
    }
}
