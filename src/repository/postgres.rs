// src/repository/postgres.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    models::{
        course::Course,
        learning_path::{LearningPath, LearningPathItem},
        placement::{PlacementRecord, SkillProfile},
    },
    repository::{CourseCatalog, PlacementOutcome, PlacementRepository, RepositoryError},
};

/// Postgres-backed catalog and placement store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row of the 'placement_records' table.
#[derive(FromRow)]
struct PlacementRow {
    id: i64,
    user_id: i64,
    score: i32,
    level: String,
    language: String,
    difficulty: String,
    question_count: i32,
    strengths: Json<Vec<String>>,
    weaknesses: Json<Vec<String>>,
    topic_misses: Json<BTreeMap<String, u32>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PlacementRow> for PlacementRecord {
    type Error = RepositoryError;

    fn try_from(row: PlacementRow) -> Result<Self, Self::Error> {
        Ok(PlacementRecord {
            id: row.id,
            user_id: row.user_id,
            score: row.score,
            level: row.level.parse().map_err(RepositoryError::Database)?,
            language: row.language,
            difficulty: row.difficulty.parse().map_err(RepositoryError::Database)?,
            question_count: row.question_count,
            strengths: row.strengths.0,
            weaknesses: row.weaknesses.0,
            topic_misses: row.topic_misses.0,
            created_at: row.created_at,
        })
    }
}

/// Row of the 'skill_profiles' table.
#[derive(FromRow)]
struct ProfileRow {
    user_id: i64,
    placement_id: i64,
    level: String,
    strengths: Json<Vec<String>>,
    weaknesses: Json<Vec<String>>,
    recommended_topics: Json<Vec<String>>,
    recommended_course_ids: Json<Vec<i64>>,
    language: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for SkillProfile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(SkillProfile {
            user_id: row.user_id,
            placement_id: row.placement_id,
            level: row.level.parse().map_err(RepositoryError::Database)?,
            strengths: row.strengths.0,
            weaknesses: row.weaknesses.0,
            recommended_topics: row.recommended_topics.0,
            recommended_course_ids: row.recommended_course_ids.0,
            language: row.language,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct PathRow {
    id: i64,
    user_id: i64,
    placement_id: i64,
    recommended_course_ids: Json<Vec<i64>>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PathItemRow {
    week_number: i32,
    title: String,
    description: String,
    topics: Json<Vec<String>>,
    course_ids: Json<Vec<i64>>,
}

const COURSE_COLUMNS: &str = "id, title, description, level, language, created_at";

#[async_trait]
impl CourseCatalog for PgStore {
    async fn find_by_level_and_language(
        &self,
        level: &str,
        language: &str,
        limit: usize,
    ) -> Result<Vec<Course>, RepositoryError> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            r#"
            SELECT {COURSE_COLUMNS}
            FROM courses
            WHERE LOWER(level) = LOWER($1) AND LOWER(language) = LOWER($2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(level)
        .bind(language)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn newest(&self, limit: usize) -> Result<Vec<Course>, RepositoryError> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Course>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }
}

#[async_trait]
impl PlacementRepository for PgStore {
    async fn recent_placements(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<PlacementRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, PlacementRow>(
            r#"
            SELECT
                id, user_id, score, level, language, difficulty, question_count,
                strengths, weaknesses, topic_misses, created_at
            FROM placement_records
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PlacementRecord::try_from).collect()
    }

    /// Runs in a single transaction: dropping `tx` on any `?` rolls back,
    /// so no profile or path can outlive a failed placement insert.
    async fn save_placement(&self, outcome: PlacementOutcome) -> Result<i64, RepositoryError> {
        let record = &outcome.record;
        let mut tx = self.pool.begin().await?;

        let placement_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO placement_records
                (user_id, score, level, language, difficulty, question_count,
                 strengths, weaknesses, topic_misses)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(record.score)
        .bind(record.level.as_str())
        .bind(&record.language)
        .bind(record.difficulty.as_str())
        .bind(record.question_count)
        .bind(Json(&record.strengths))
        .bind(Json(&record.weaknesses))
        .bind(Json(&record.topic_misses))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM skill_profiles WHERE user_id = $1")
            .bind(record.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO skill_profiles
                (user_id, placement_id, level, strengths, weaknesses,
                 recommended_topics, recommended_course_ids, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.user_id)
        .bind(placement_id)
        .bind(record.level.as_str())
        .bind(Json(&record.strengths))
        .bind(Json(&record.weaknesses))
        .bind(Json(&outcome.recommended_topics))
        .bind(Json(&outcome.recommended_course_ids))
        .bind(&record.language)
        .execute(&mut *tx)
        .await?;

        // Items go with their path (ON DELETE CASCADE).
        sqlx::query("DELETE FROM learning_paths WHERE user_id = $1")
            .bind(record.user_id)
            .execute(&mut *tx)
            .await?;

        let path_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO learning_paths (user_id, placement_id, recommended_course_ids)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(placement_id)
        .bind(Json(&outcome.recommended_course_ids))
        .fetch_one(&mut *tx)
        .await?;

        for item in &outcome.path_items {
            sqlx::query(
                r#"
                INSERT INTO learning_path_items
                    (learning_path_id, week_number, title, description, topics, course_ids)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(path_id)
            .bind(item.week_number)
            .bind(&item.title)
            .bind(&item.description)
            .bind(Json(&item.topics))
            .bind(Json(&item.course_ids))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(placement_id)
    }

    async fn skill_profile(&self, user_id: i64) -> Result<Option<SkillProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                user_id, placement_id, level, strengths, weaknesses,
                recommended_topics, recommended_course_ids, language, created_at
            FROM skill_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SkillProfile::try_from).transpose()
    }

    async fn learning_path(&self, user_id: i64) -> Result<Option<LearningPath>, RepositoryError> {
        let Some(path) = sqlx::query_as::<_, PathRow>(
            r#"
            SELECT id, user_id, placement_id, recommended_course_ids, created_at
            FROM learning_paths
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PathItemRow>(
            r#"
            SELECT week_number, title, description, topics, course_ids
            FROM learning_path_items
            WHERE learning_path_id = $1
            ORDER BY week_number
            "#,
        )
        .bind(path.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(LearningPath {
            id: path.id,
            user_id: path.user_id,
            placement_id: path.placement_id,
            recommended_course_ids: path.recommended_course_ids.0,
            created_at: path.created_at,
            items: items
                .into_iter()
                .map(|row| LearningPathItem {
                    week_number: row.week_number,
                    title: row.title,
                    description: row.description,
                    topics: row.topics.0,
                    course_ids: row.course_ids.0,
                })
                .collect(),
        }))
    }
}
