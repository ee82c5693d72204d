// src/models/question.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Difficulty tag carried by every question and by the batch it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Maps a free-form learning goal to a starting difficulty.
    /// Only an explicit "beginner" goal starts at the bottom.
    pub fn from_goal(goal: &str) -> Self {
        if goal.trim().eq_ignore_ascii_case("beginner") {
            Difficulty::Beginner
        } else {
            Difficulty::Intermediate
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "hard" => Ok(Difficulty::Advanced),
            other => Err(format!("Unknown difficulty '{}'", other)),
        }
    }
}

/// A single multiple-choice question as issued inside a batch.
/// Immutable once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionItem {
    pub id: String,
    pub prompt: String,
    /// Always four options, exactly one of which equals `correct_answer`.
    pub options: Vec<String>,
    pub correct_answer: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub language: String,
}

/// DTO for sending a question to the client (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub topic: String,
    pub difficulty: Difficulty,
}

impl From<&QuestionItem> for PublicQuestion {
    fn from(item: &QuestionItem) -> Self {
        Self {
            id: item.id.clone(),
            prompt: item.prompt.clone(),
            options: item.options.clone(),
            topic: item.topic.clone(),
            difficulty: item.difficulty,
        }
    }
}

/// A curated entry of the question bank dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct BankEntry {
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(alias = "skill_tag")]
    pub topic: String,
    /// Entries without a difficulty are treated as intermediate.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default = "general_language")]
    pub language: String,
}

fn general_language() -> String {
    "general".to_string()
}
