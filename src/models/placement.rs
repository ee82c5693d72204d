// src/models/placement.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::question::Difficulty;

/// Coarse proficiency label derived from a placement score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(format!("Unknown level '{}'", other)),
        }
    }
}

/// Append-only snapshot of one graded placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementRecord {
    pub id: i64,
    pub user_id: i64,
    pub score: i32,
    pub level: Level,
    pub language: String,
    pub difficulty: Difficulty,
    pub question_count: i32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Incorrect answers per topic within the graded batch.
    pub topic_misses: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
}

/// A placement record before the store assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewPlacementRecord {
    pub user_id: i64,
    pub score: i32,
    pub level: Level,
    pub language: String,
    pub difficulty: Difficulty,
    pub question_count: i32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub topic_misses: BTreeMap<String, u32>,
}

/// Latest derived view of a user's skills. Replaced wholesale on every placement.
#[derive(Debug, Clone, Serialize)]
pub struct SkillProfile {
    pub user_id: i64,
    pub placement_id: i64,
    pub level: Level,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommended_topics: Vec<String>,
    /// Best effort: ids may go stale if the catalog changes later.
    pub recommended_course_ids: Vec<i64>,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistorySummary {
    pub avg_score: f64,
    pub latest_score: i32,
    pub last_level: Level,
    pub last_topic: Option<String>,
    pub last_difficulty: Difficulty,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<PlacementRecord>,
    /// `None` serializes as an empty object when there is no history.
    #[serde(serialize_with = "summary_or_empty")]
    pub summary: Option<HistorySummary>,
}

fn summary_or_empty<S>(summary: &Option<HistorySummary>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match summary {
        Some(summary) => summary.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

/// Newest placement and current profile of a user, both absent before the
/// first graded quiz.
#[derive(Debug, Serialize)]
pub struct PlacementResultResponse {
    pub placement: Option<PlacementRecord>,
    pub skill_profile: Option<SkillProfile>,
}

impl HistoryResponse {
    /// Builds the response from records ordered newest first.
    pub fn from_records(history: Vec<PlacementRecord>) -> Self {
        let summary = history.first().map(|latest| {
            let total: i64 = history.iter().map(|r| r.score as i64).sum();
            HistorySummary {
                avg_score: total as f64 / history.len() as f64,
                latest_score: latest.score,
                last_level: latest.level,
                last_topic: latest
                    .weaknesses
                    .first()
                    .or_else(|| latest.strengths.first())
                    .cloned(),
                last_difficulty: latest.difficulty,
            }
        });

        Self { history, summary }
    }
}
