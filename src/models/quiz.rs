// src/models/quiz.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    course::Course,
    learning_path::LearningPathItem,
    placement::Level,
    question::{Difficulty, PublicQuestion, QuestionItem},
};

/// An immutable set of questions issued together and graded as a unit.
#[derive(Debug, Clone)]
pub struct QuizBatch {
    pub batch_id: String,
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub question_ids: Vec<String>,
    pub language: String,
    pub difficulty: Difficulty,
    pub items: Vec<QuestionItem>,
}

/// A single client answer. Matched against batch membership before scoring.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerSubmission {
    #[validate(length(min = 1, max = 64))]
    pub question_id: String,
    #[validate(length(max = 500))]
    #[serde(alias = "chosen_value")]
    pub value: String,
}

/// DTO for requesting a new quiz batch.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    pub user_id: Option<i64>,
    #[validate(length(min = 1, max = 64))]
    pub language: Option<String>,
    #[validate(length(max = 200))]
    pub goal: Option<String>,
    /// Explicit difficulty; overrides history-based adaptation.
    #[validate(length(min = 1, max = 20))]
    pub difficulty: Option<String>,
}

/// DTO for returning an issued batch.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub batch_id: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub focus_topic: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting a batch for grading.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeQuizRequest {
    #[validate(length(min = 1, max = 64))]
    pub batch_id: Option<String>,
    pub user_id: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 100), nested)]
    pub answers: Vec<AnswerSubmission>,
}

/// Correct/incorrect counts for one topic within a graded batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicTally {
    pub correct: u32,
    pub incorrect: u32,
}

impl TopicTally {
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Full grading outcome returned to the client.
#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub batch_id: String,
    pub placement_id: Option<i64>,
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub topic_tally: BTreeMap<String, TopicTally>,
    pub weak_topics: Vec<String>,
    pub strong_topics: Vec<String>,
    pub level: Level,
    pub level_probabilities: BTreeMap<Level, f64>,
    pub recommended_courses: Vec<Course>,
    pub recommended_topics: Vec<String>,
    pub learning_path: Vec<LearningPathItem>,
}
