// src/placement/composer.rs

use std::{sync::Arc, time::Duration};

use futures::future::join_all;

use crate::{
    models::{course::Course, learning_path::LearningPathItem, placement::Level},
    placement::completion::{TextCompletion, clean_output},
};

pub const MIN_WEEKS: usize = 6;
pub const MAX_WEEKS: usize = 12;

const DEFAULT_TOPIC: &str = "core concepts";
const DEFAULT_STRENGTH: &str = "problem solving";

/// Inputs of one learning path.
#[derive(Debug, Clone)]
pub struct PathRequest {
    pub score: u32,
    pub max_score: u32,
    pub level: Level,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub courses: Vec<Course>,
}

/// Lower scores get longer plans.
pub fn week_count(score: u32, max_score: u32) -> usize {
    let ratio = if max_score == 0 {
        0.0
    } else {
        (score as f64 / max_score as f64).clamp(0.0, 1.0)
    };
    let span = (MAX_WEEKS - MIN_WEEKS) as f64;
    let weeks = MAX_WEEKS as f64 - (span * ratio).round();
    (weeks as usize).clamp(MIN_WEEKS, MAX_WEEKS)
}

/// Weaknesses first, then strengths, without repeats.
fn ordered_topics(weaknesses: &[String], strengths: &[String]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for topic in weaknesses.iter().chain(strengths) {
        let topic = topic.trim();
        if !topic.is_empty() && !topics.iter().any(|t| t.eq_ignore_ascii_case(topic)) {
            topics.push(topic.to_string());
        }
    }
    if topics.is_empty() {
        topics.push(DEFAULT_TOPIC.to_string());
    }
    topics
}

/// Courses for every week in round-robin order. Two per week when there
/// are more courses than weeks, otherwise one, wrapping around the list.
fn assign_courses(courses: &[Course], weeks: usize) -> Vec<Vec<&Course>> {
    if courses.is_empty() {
        return vec![Vec::new(); weeks];
    }
    let per_week = if courses.len() > weeks { 2 } else { 1 };
    let mut cursor = 0;

    (0..weeks)
        .map(|_| {
            let mut week: Vec<&Course> = Vec::with_capacity(per_week);
            for _ in 0..per_week {
                let course = &courses[cursor % courses.len()];
                cursor += 1;
                if !week.iter().any(|c| c.id == course.id) {
                    week.push(course);
                }
            }
            week
        })
        .collect()
}

fn pick(list: &[String], index: usize, default: &str) -> String {
    if list.is_empty() {
        default.to_string()
    } else {
        list[index % list.len()].clone()
    }
}

/// Deterministic description naming the week, a strength and a weakness.
pub fn fallback_description(week: usize, strength: &str, weakness: &str) -> String {
    match week {
        1 => format!(
            "Week 1: review the fundamentals of {} while leaning on your strength in {}.",
            weakness, strength
        ),
        2 => format!(
            "Week 2: practice {} through short daily exercises and use {} to check your solutions.",
            weakness, strength
        ),
        3 => format!(
            "Week 3: build a small project that combines {} with your existing {} skills.",
            weakness, strength
        ),
        4 => format!(
            "Week 4: revisit the hardest {} exercises so far and explain them using {}.",
            weakness, strength
        ),
        n => format!(
            "Week {}: deepen {} with hands-on practice and keep {} sharp by applying it in new contexts.",
            n, weakness, strength
        ),
    }
}

fn description_prompt(request: &PathRequest, week: usize, topics: &[String], courses: &[&Course]) -> String {
    let course_titles = if courses.is_empty() {
        "self-study".to_string()
    } else {
        courses.iter().map(|c| c.title.as_str()).collect::<Vec<_>>().join(", ")
    };
    let join = |list: &[String]| {
        if list.is_empty() {
            "none".to_string()
        } else {
            list.join(", ")
        }
    };

    format!(
        "Write one encouraging sentence describing week {} of a study plan for a {} learner. \
         Strengths: {}. Weaknesses: {}. Topics this week: {}. Courses this week: {}. \
         Mention the week number, one strength and one weakness. Reply with the sentence only.",
        week,
        request.level,
        join(&request.strengths),
        join(&request.weaknesses),
        topics.join(", "),
        course_titles
    )
}

struct WeekDraft {
    week: usize,
    topics: Vec<String>,
    course_ids: Vec<i64>,
    prompt: String,
    fallback: String,
}

/// Expands a placement into an ordered weekly plan.
pub struct LearningPathComposer {
    completion: Option<Arc<dyn TextCompletion>>,
    timeout: Duration,
}

impl LearningPathComposer {
    pub fn new(completion: Option<Arc<dyn TextCompletion>>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
        }
    }

    /// Always returns between `MIN_WEEKS` and `MAX_WEEKS` fully populated
    /// items, whether or not the completion service answers.
    pub async fn compose(&self, request: &PathRequest) -> Vec<LearningPathItem> {
        let weeks = week_count(request.score, request.max_score);
        let topics = ordered_topics(&request.weaknesses, &request.strengths);
        let assignments = assign_courses(&request.courses, weeks);

        let drafts: Vec<WeekDraft> = assignments
            .iter()
            .enumerate()
            .map(|(idx, week_courses)| {
                let week = idx + 1;
                let mut week_topics = vec![topics[idx % topics.len()].clone()];
                let next = &topics[(idx + 1) % topics.len()];
                if !week_topics.contains(next) {
                    week_topics.push(next.clone());
                }

                WeekDraft {
                    week,
                    prompt: description_prompt(request, week, &week_topics, week_courses),
                    fallback: fallback_description(
                        week,
                        &pick(&request.strengths, idx, DEFAULT_STRENGTH),
                        &pick(&request.weaknesses, idx, DEFAULT_TOPIC),
                    ),
                    topics: week_topics,
                    course_ids: week_courses.iter().map(|c| c.id).collect(),
                }
            })
            .collect();

        let descriptions = join_all(
            drafts
                .iter()
                .map(|draft| self.describe(draft.week, &draft.prompt, &draft.fallback)),
        )
        .await;

        drafts
            .into_iter()
            .zip(descriptions)
            .map(|(draft, description)| LearningPathItem {
                week_number: draft.week as i32,
                title: format!("Week {}: {}", draft.week, draft.topics[0]),
                description,
                topics: draft.topics,
                course_ids: draft.course_ids,
            })
            .collect()
    }

    async fn describe(&self, week: usize, prompt: &str, fallback: &str) -> String {
        let Some(completion) = &self.completion else {
            return fallback.to_string();
        };

        match tokio::time::timeout(self.timeout, completion.complete(prompt)).await {
            Ok(Ok(text)) => match clean_output(&text) {
                Ok(description) => description,
                Err(e) => {
                    tracing::warn!("{} for week {}; using template", e, week);
                    fallback.to_string()
                }
            },
            Ok(Err(e)) => {
                tracing::warn!("Description for week {} unavailable: {}", week, e);
                fallback.to_string()
            }
            Err(_) => {
                tracing::warn!("Description for week {} timed out after {:?}", week, self.timeout);
                fallback.to_string()
            }
        }
    }
}
