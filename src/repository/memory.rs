// src/repository/memory.rs

use std::{
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    models::{
        course::Course,
        learning_path::LearningPath,
        placement::{PlacementRecord, SkillProfile},
    },
    repository::{CourseCatalog, PlacementOutcome, PlacementRepository, RepositoryError},
};

/// Course catalog backed by a fixed list, usually loaded from a JSON file.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    courses: Vec<Course>,
}

impl MemoryCatalog {
    pub fn new(mut courses: Vec<Course>) -> Self {
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Self { courses }
    }

    pub fn from_file(path: &Path) -> Result<Self, RepositoryError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Source(format!("{}: {}", path.display(), e)))?;
        let courses: Vec<Course> = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Source(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(courses))
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[async_trait]
impl CourseCatalog for MemoryCatalog {
    async fn find_by_level_and_language(
        &self,
        level: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<Course>, RepositoryError> {
        Ok(self
            .courses
            .iter()
            .filter(|c| c.level.eq_ignore_ascii_case(level) && c.language.eq_ignore_ascii_case(language))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn newest(&self, limit: usize) -> Result<Vec<Course>, RepositoryError> {
        Ok(self.courses.iter().take(limit).cloned().collect())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Course>, RepositoryError> {
        Ok(self
            .courses
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    placements: Vec<PlacementRecord>,
    profiles: Vec<SkillProfile>,
    paths: Vec<LearningPath>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local placement store. A single lock makes every save atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlacementRepository for MemoryStore {
    async fn recent_placements(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PlacementRecord>, RepositoryError> {
        let tables = self.tables();
        Ok(tables
            .placements
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_placement(&self, outcome: PlacementOutcome) -> Result<i64, RepositoryError> {
        let mut tables = self.tables();
        let now = Utc::now();
        let user_id = outcome.record.user_id;

        let placement_id = tables.next_id();
        let record = outcome.record;
        tables.placements.push(PlacementRecord {
            id: placement_id,
            user_id,
            score: record.score,
            level: record.level,
            language: record.language.clone(),
            difficulty: record.difficulty,
            question_count: record.question_count,
            strengths: record.strengths.clone(),
            weaknesses: record.weaknesses.clone(),
            topic_misses: record.topic_misses,
            created_at: now,
        });

        tables.profiles.retain(|p| p.user_id != user_id);
        tables.profiles.push(SkillProfile {
            user_id,
            placement_id,
            level: record.level,
            strengths: record.strengths,
            weaknesses: record.weaknesses,
            recommended_topics: outcome.recommended_topics,
            recommended_course_ids: outcome.recommended_course_ids.clone(),
            language: record.language,
            created_at: now,
        });

        let path_id = tables.next_id();
        tables.paths.retain(|p| p.user_id != user_id);
        tables.paths.push(LearningPath {
            id: path_id,
            user_id,
            placement_id,
            recommended_course_ids: outcome.recommended_course_ids,
            created_at: now,
            items: outcome.path_items,
        });

        Ok(placement_id)
    }

    async fn skill_profile(&self, user_id: i64) -> Result<Option<SkillProfile>, RepositoryError> {
        Ok(self.tables().profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn learning_path(&self, user_id: i64) -> Result<Option<LearningPath>, RepositoryError> {
        Ok(self.tables().paths.iter().find(|p| p.user_id == user_id).cloned())
    }
}
