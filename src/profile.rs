//! Profile source records and the read-only store seam.
//!
//! The relational profile store is an external collaborator: the pipeline
//! only ever fetches records through [`ProfileStore`], never mutates them.
//! [`InMemoryProfileStore`] is a JSON-loadable implementation used by the
//! CLI and the tests.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Profile summary: who the person is, plus contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileBasics {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

/// One employment entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: i64,
    pub company_name: String,
    pub position: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// One project entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

/// A single skill inside a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub proficiency_level: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<u32>,
}

/// A skill category together with its skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

/// One education entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    pub id: i64,
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read-only access to profile records, per record type.
///
/// Implementations must be `Send + Sync`; the indexing pipeline reads
/// concurrently and never writes back.
pub trait ProfileStore: Send + Sync {
    fn basics(&self, id: i64) -> Option<ProfileBasics>;
    fn all_basics(&self) -> Vec<ProfileBasics>;

    fn work_experience(&self, id: i64) -> Option<WorkExperience>;
    fn all_work_experience(&self) -> Vec<WorkExperience>;

    fn project(&self, id: i64) -> Option<Project>;
    fn all_projects(&self) -> Vec<Project>;

    fn skill_category(&self, id: i64) -> Option<SkillCategory>;
    fn all_skill_categories(&self) -> Vec<SkillCategory>;

    fn education(&self, id: i64) -> Option<Education>;
    fn all_education(&self) -> Vec<Education>;
}

/// JSON-loadable profile store held entirely in memory.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InMemoryProfileStore {
    #[serde(default)]
    pub basics: Vec<ProfileBasics>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperience>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub skill_categories: Vec<SkillCategory>,
    #[serde(default)]
    pub education: Vec<Education>,
}

impl InMemoryProfileStore {
    /// Load a profile from a JSON file.
    pub fn load_json(path: &str) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile: {path}"))?;
        let store: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse profile: {path}"))?;
        Ok(store)
    }

    fn find<T: Clone>(items: &[T], id: i64, get_id: impl Fn(&T) -> i64) -> Option<T> {
        items.iter().find(|item| get_id(item) == id).cloned()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn basics(&self, id: i64) -> Option<ProfileBasics> {
        Self::find(&self.basics, id, |b| b.id)
    }

    fn all_basics(&self) -> Vec<ProfileBasics> {
        self.basics.clone()
    }

    fn work_experience(&self, id: i64) -> Option<WorkExperience> {
        Self::find(&self.work_experience, id, |e| e.id)
    }

    fn all_work_experience(&self) -> Vec<WorkExperience> {
        self.work_experience.clone()
    }

    fn project(&self, id: i64) -> Option<Project> {
        Self::find(&self.projects, id, |p| p.id)
    }

    fn all_projects(&self) -> Vec<Project> {
        self.projects.clone()
    }

    fn skill_category(&self, id: i64) -> Option<SkillCategory> {
        Self::find(&self.skill_categories, id, |c| c.id)
    }

    fn all_skill_categories(&self) -> Vec<SkillCategory> {
        self.skill_categories.clone()
    }

    fn education(&self, id: i64) -> Option<Education> {
        Self::find(&self.education, id, |e| e.id)
    }

    fn all_education(&self) -> Vec<Education> {
        self.education.clone()
    }
}

/// Convenience metadata constructor used by the indexer.
pub(crate) fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
