// src/repository/mod.rs

//! Storage collaborators of the placement engine.
//!
//! The course catalog and the placement history live outside the engine.
//! Both are reached through the traits below so the service can run on
//! Postgres or, without a database, on the in-memory implementations.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::models::{
    course::Course,
    learning_path::{LearningPath, LearningPathItem},
    placement::{NewPlacementRecord, PlacementRecord, SkillProfile},
};

#[derive(Debug)]
pub enum RepositoryError {
    Database(String),
    Source(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Database(msg) => write!(f, "database error: {}", msg),
            RepositoryError::Source(msg) => write!(f, "data source error: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

/// Read access to the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Courses whose level and language match case-insensitively, newest first.
    async fn find_by_level_and_language(
        &self,
        level: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<Course>, RepositoryError>;

    /// Newest courses overall.
    async fn newest(&self, limit: usize) -> Result<Vec<Course>, RepositoryError>;

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Course>, RepositoryError>;
}

/// Everything a single grading produces, written as one unit.
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub record: NewPlacementRecord,
    pub recommended_topics: Vec<String>,
    pub recommended_course_ids: Vec<i64>,
    pub path_items: Vec<LearningPathItem>,
}

/// Persistence for placement records, skill profiles and learning paths.
#[async_trait]
pub trait PlacementRepository: Send + Sync {
    /// Most recent records for a user, newest first.
    async fn recent_placements(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PlacementRecord>, RepositoryError>;

    /// Appends the placement record, replaces the user's skill profile and
    /// learning path. Either all of it is stored or none of it.
    /// Returns the new placement id.
    async fn save_placement(&self, outcome: PlacementOutcome) -> Result<i64, RepositoryError>;

    async fn skill_profile(&self, user_id: i64) -> Result<Option<SkillProfile>, RepositoryError>;

    async fn learning_path(&self, user_id: i64) -> Result<Option<LearningPath>, RepositoryError>;
}
