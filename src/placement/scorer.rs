// src/placement/scorer.rs

use std::collections::{BTreeMap, HashMap};

use crate::models::{
    question::QuestionItem,
    quiz::{AnswerSubmission, TopicTally},
};

/// Points awarded per correct answer.
pub const POINTS_PER_CORRECT: u32 = 10;

/// How many weak and strong topics are reported.
const TOPIC_CAP: usize = 2;

/// Result of grading one batch, before level classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
    pub score: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub topic_tally: BTreeMap<String, TopicTally>,
    pub weak_topics: Vec<String>,
    pub strong_topics: Vec<String>,
}

impl ScoreSheet {
    pub fn max_score(&self) -> u32 {
        self.total_questions * POINTS_PER_CORRECT
    }

    /// Incorrect answers per topic, omitting topics without misses.
    pub fn topic_misses(&self) -> BTreeMap<String, u32> {
        self.topic_tally
            .iter()
            .filter(|(_, t)| t.incorrect > 0)
            .map(|(topic, t)| (topic.clone(), t.incorrect))
            .collect()
    }
}

/// Case-insensitive comparison that also ignores surrounding and repeated
/// whitespace.
pub fn answers_match(chosen: &str, correct: &str) -> bool {
    fn canonical(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }
    canonical(chosen) == canonical(correct)
}

/// Grades `submissions` against the batch's items.
///
/// Only submissions whose id belongs to the batch are considered (the first
/// one wins for duplicated ids). A question without a submission counts as
/// incorrect.
pub fn grade(items: &[QuestionItem], submissions: &[AnswerSubmission]) -> ScoreSheet {
    let mut chosen: HashMap<&str, &str> = HashMap::new();
    for submission in submissions {
        if items.iter().any(|i| i.id == submission.question_id) {
            chosen
                .entry(submission.question_id.as_str())
                .or_insert(submission.value.as_str());
        } else {
            tracing::debug!("Ignoring answer for foreign question {}", submission.question_id);
        }
    }

    let mut topic_tally: BTreeMap<String, TopicTally> = BTreeMap::new();
    let mut correct_count = 0;

    for item in items {
        let tally = topic_tally.entry(item.topic.clone()).or_default();
        let is_correct = chosen
            .get(item.id.as_str())
            .is_some_and(|value| answers_match(value, &item.correct_answer));

        if is_correct {
            tally.correct += 1;
            correct_count += 1;
        } else {
            tally.incorrect += 1;
        }
    }

    let (weak_topics, strong_topics) = rank_topics(&topic_tally);

    ScoreSheet {
        score: correct_count * POINTS_PER_CORRECT,
        correct_count,
        total_questions: items.len() as u32,
        topic_tally,
        weak_topics,
        strong_topics,
    }
}

/// Splits tallied topics into at most two weak and two strong ones.
///
/// Weak topics have at least one miss, ranked by misses and then by volume
/// (more questions first, then name). Strong topics are the remaining ones,
/// ranked by correct answers. When every topic has misses the least-weak one
/// is reported as strong instead, even if it is the only topic, so strong is
/// never empty once something was tallied. The two lists never overlap.
fn rank_topics(tally: &BTreeMap<String, TopicTally>) -> (Vec<String>, Vec<String>) {
    let mut weak: Vec<(&String, &TopicTally)> =
        tally.iter().filter(|(_, t)| t.incorrect > 0).collect();
    weak.sort_by(|(a_name, a), (b_name, b)| {
        b.incorrect
            .cmp(&a.incorrect)
            .then(b.total().cmp(&a.total()))
            .then(a_name.cmp(b_name))
    });

    let mut strong: Vec<(&String, &TopicTally)> =
        tally.iter().filter(|(_, t)| t.incorrect == 0).collect();

    // No clean topic: borrow the least-weak one.
    if strong.is_empty() {
        let least_weak = weak
            .iter()
            .enumerate()
            .min_by(|(_, (a_name, a)), (_, (b_name, b))| {
                a.incorrect
                    .cmp(&b.incorrect)
                    .then(b.correct.cmp(&a.correct))
                    .then(b_name.cmp(a_name))
            })
            .map(|(idx, _)| idx);
        if let Some(idx) = least_weak {
            strong.push(weak.remove(idx));
        }
    }

    strong.sort_by(|(a_name, a), (b_name, b)| {
        b.correct
            .cmp(&a.correct)
            .then(a.incorrect.cmp(&b.incorrect))
            .then(a_name.cmp(b_name))
    });

    let names = |v: Vec<(&String, &TopicTally)>| -> Vec<String> {
        v.into_iter().take(TOPIC_CAP).map(|(name, _)| name.clone()).collect()
    };

    (names(weak), names(strong))
}
