// src/models/learning_path.rs

use serde::{Deserialize, Serialize};

use crate::models::{course::Course, placement::SkillProfile};

/// One week of a personalized schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPathItem {
    pub week_number: i32,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    pub course_ids: Vec<i64>,
}

/// Represents the 'learning_paths' table together with its items.
/// Regenerated wholesale on every placement.
#[derive(Debug, Clone, Serialize)]
pub struct LearningPath {
    pub id: i64,
    pub user_id: i64,
    pub placement_id: i64,
    pub recommended_course_ids: Vec<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<LearningPathItem>,
}

/// Skill profile as shown next to the timeline. `level` is "pending"
/// until the user has completed a placement.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub level: String,
    pub language: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommended_topics: Vec<String>,
    pub recommended_courses: Vec<Course>,
}

impl ProfileView {
    pub fn pending() -> Self {
        Self {
            level: "pending".to_string(),
            language: "general".to_string(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommended_topics: Vec::new(),
            recommended_courses: Vec::new(),
        }
    }

    /// Keeps the profile's course order and silently drops ids that are no
    /// longer in `courses`.
    pub fn from_profile(profile: SkillProfile, courses: Vec<Course>) -> Self {
        let recommended_courses = profile
            .recommended_course_ids
            .iter()
            .filter_map(|id| courses.iter().find(|c| c.id == *id).cloned())
            .collect();

        Self {
            level: profile.level.to_string(),
            language: profile.language,
            strengths: profile.strengths,
            weaknesses: profile.weaknesses,
            recommended_topics: profile.recommended_topics,
            recommended_courses,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LearningPathResponse {
    pub skill_profile: ProfileView,
    pub timeline: Vec<LearningPathItem>,
}
