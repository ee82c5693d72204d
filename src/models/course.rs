// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'courses' table owned by the catalog service.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Free-form level label, matched case-insensitively.
    pub level: String,
    pub language: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
