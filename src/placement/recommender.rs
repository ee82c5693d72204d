// src/placement/recommender.rs

use std::{collections::HashSet, sync::Arc};

use crate::{
    models::{course::Course, placement::Level},
    repository::{CourseCatalog, RepositoryError},
};

/// Study hints per weak topic. A key matches any word of the topic that
/// starts with it, so `loop` covers "loops" but `oop` does not.
const TOPIC_SUGGESTIONS: &[(&str, &[&str])] = &[
    ("loop", &["iteration patterns", "loop invariants"]),
    ("function", &["function decomposition", "pure functions"]),
    ("oop", &["classes and objects", "composition over inheritance"]),
    ("class", &["classes and objects", "encapsulation"]),
    ("logic", &["boolean logic", "control flow"]),
    ("web", &["HTTP fundamentals", "REST API design"]),
    ("async", &["async/await", "concurrency basics"]),
    ("closure", &["scope and closures"]),
    ("generator", &["iterators and generators"]),
    ("error", &["error handling strategies"]),
    ("test", &["unit testing", "test-driven development"]),
    ("concurren", &["concurrency basics", "synchronization primitives"]),
];

const DEFAULT_SUGGESTIONS: &[&str] = &["core concepts review", "practice exercises"];

/// Study topics for the given weaknesses, deduplicated and in order.
pub fn recommend_topics(weaknesses: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut topics = Vec::new();

    for weakness in weaknesses {
        let needle = weakness.trim().to_lowercase();
        let words: Vec<&str> = needle
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let suggestions = TOPIC_SUGGESTIONS
            .iter()
            .filter(|(key, _)| words.iter().any(|w| w.starts_with(key)))
            .flat_map(|(_, hints)| hints.iter().map(|h| h.to_string()));
        let mut matched = false;
        for hint in suggestions {
            matched = true;
            if seen.insert(hint.clone()) {
                topics.push(hint);
            }
        }
        // Unknown topics are studied as they are.
        if !matched && seen.insert(needle.clone()) {
            topics.push(needle);
        }
    }

    if topics.is_empty() {
        topics = DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
    }
    topics
}

/// Filters the catalog by level and language, padding with the newest
/// courses overall.
pub struct CourseRecommender {
    catalog: Arc<dyn CourseCatalog>,
}

impl CourseRecommender {
    pub fn new(catalog: Arc<dyn CourseCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn recommend(
        &self,
        level: Level,
        language: &str,
        limit: usize,
    ) -> Result<Vec<Course>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let matched = self
            .catalog
            .find_by_level_and_language(level.as_str(), language, limit)
            .await?;
        if matched.len() >= limit {
            return Ok(matched);
        }

        // Ask for enough rows to survive deduplication against `matched`.
        let newest = self.catalog.newest(limit + matched.len()).await?;
        Ok(pad_with_newest(matched, newest, limit))
    }

    /// Resolves stored ids against the current catalog, keeping the order
    /// of `ids` and skipping courses that no longer exist.
    pub async fn resolve(&self, ids: &[i64]) -> Result<Vec<Course>, RepositoryError> {
        let found = self.catalog.find_by_ids(ids).await?;
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|c| c.id == *id).cloned())
            .collect())
    }
}

fn pad_with_newest(mut courses: Vec<Course>, newest: Vec<Course>, limit: usize) -> Vec<Course> {
    let mut seen: HashSet<i64> = courses.iter().map(|c| c.id).collect();
    for course in newest {
        if courses.len() >= limit {
            break;
        }
        if seen.insert(course.id) {
            courses.push(course);
        }
    }
    courses.truncate(limit);
    courses
}
