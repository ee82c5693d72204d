// src/placement/advisor.rs

use std::{collections::HashMap, sync::Arc};

use crate::{
    models::{placement::PlacementRecord, question::Difficulty},
    placement::scorer::POINTS_PER_CORRECT,
    repository::PlacementRepository,
};

/// Top of the scale recent scores are normalized to.
const SCALE_MAX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBands {
    pub advanced: f64,
    pub intermediate: f64,
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            advanced: 4.5,
            intermediate: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub difficulty: Difficulty,
    pub focus_topic: Option<String>,
    /// Number of records the advice is based on. Zero means "no history".
    pub based_on: usize,
}

impl Advice {
    fn no_history() -> Self {
        Self {
            difficulty: Difficulty::Beginner,
            focus_topic: None,
            based_on: 0,
        }
    }
}

/// Picks the next quiz's difficulty and topic focus from recent placements.
pub struct DifficultyAdvisor {
    placements: Arc<dyn PlacementRepository>,
    window: usize,
    bands: ScoreBands,
}

impl DifficultyAdvisor {
    pub fn new(placements: Arc<dyn PlacementRepository>, window: usize, bands: ScoreBands) -> Self {
        Self {
            placements,
            window: window.max(1),
            bands,
        }
    }

    /// Falls back to the no-history advice when the history cannot be read.
    pub async fn recommend(&self, user_id: i64) -> Advice {
        match self.placements.recent_placements(user_id, self.window).await {
            Ok(records) => advise(&records, self.bands),
            Err(e) => {
                tracing::warn!("Cannot read placement history for user {}: {}", user_id, e);
                Advice::no_history()
            }
        }
    }
}

/// A record's score on the 0-5 scale, or `None` for a record without questions.
fn normalized_score(record: &PlacementRecord) -> Option<f64> {
    if record.question_count <= 0 {
        return None;
    }
    let max = record.question_count as f64 * POINTS_PER_CORRECT as f64;
    Some((record.score as f64 / max).clamp(0.0, 1.0) * SCALE_MAX)
}

/// Advice from records ordered newest first.
pub fn advise(records: &[PlacementRecord], bands: ScoreBands) -> Advice {
    let scores: Vec<f64> = records.iter().filter_map(normalized_score).collect();
    if scores.is_empty() {
        return Advice::no_history();
    }

    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    let difficulty = if average >= bands.advanced {
        Difficulty::Advanced
    } else if average >= bands.intermediate {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    };

    Advice {
        difficulty,
        focus_topic: focus_topic(records),
        based_on: records.len(),
    }
}

/// Most missed topic across the records. Ties go to the topic missed in the
/// most recent record, then alphabetically.
fn focus_topic(records: &[PlacementRecord]) -> Option<String> {
    // topic -> (misses, index of newest record that missed it)
    let mut counts: HashMap<&str, (u32, usize)> = HashMap::new();

    for (idx, record) in records.iter().enumerate() {
        // Older records only carry their ranked weaknesses.
        let misses: Vec<(&str, u32)> = if record.topic_misses.is_empty() {
            record.weaknesses.iter().map(|t| (t.as_str(), 1)).collect()
        } else {
            record
                .topic_misses
                .iter()
                .map(|(t, m)| (t.as_str(), *m))
                .collect()
        };

        for (topic, missed) in misses {
            if topic.is_empty() || missed == 0 {
                continue;
            }
            let entry = counts.entry(topic).or_insert((0, idx));
            entry.0 += missed;
            entry.1 = entry.1.min(idx);
        }
    }

    counts
        .into_iter()
        .min_by(|(a_topic, (a_misses, a_idx)), (b_topic, (b_misses, b_idx))| {
            b_misses
                .cmp(a_misses)
                .then(a_idx.cmp(b_idx))
                .then(a_topic.cmp(b_topic))
        })
        .map(|(topic, _)| topic.to_string())
}
