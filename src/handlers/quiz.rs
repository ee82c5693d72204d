// src/handlers/quiz.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    config::MAX_QUESTION_COUNT,
    error::AppError,
    models::{
        placement::NewPlacementRecord,
        question::{Difficulty, PublicQuestion},
        quiz::{GenerateQuizRequest, GradeQuizRequest, GradeResponse, QuizResponse},
    },
    placement::{
        classifier::classify_by_thresholds,
        composer::PathRequest,
        question_bank::normalize_language,
        recommender::recommend_topics,
        scorer,
    },
    repository::PlacementOutcome,
    state::AppState,
};

/// Issues a new quiz batch.
///
/// * Difficulty: explicit request, else recent history, else the goal,
///   else beginner.
/// * The focus topic from history biases question selection.
/// * Correct answers never leave the server.
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    payload.validate()?;
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;

    let explicit = payload
        .difficulty
        .as_deref()
        .map(str::parse::<Difficulty>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let language = normalize_language(payload.language.as_deref().unwrap_or_default());

    // 2. Ask the advisor for difficulty and focus
    let advice = state.advisor.recommend(user_id).await;
    let difficulty = match (explicit, payload.goal.as_deref()) {
        (Some(difficulty), _) => difficulty,
        _ if advice.based_on > 0 => advice.difficulty,
        (None, Some(goal)) => Difficulty::from_goal(goal),
        (None, None) => Difficulty::Beginner,
    };

    // 3. Select questions and bind them to a batch
    let count = state.config.question_count.clamp(1, MAX_QUESTION_COUNT);
    let items = state
        .bank
        .fetch(&language, difficulty, advice.focus_topic.as_deref(), count);
    let batch = state.sessions.issue(user_id, &language, difficulty, items);

    tracing::info!(
        "Issued batch {} to user {} ({}, {}, {} questions)",
        batch.batch_id,
        user_id,
        language,
        difficulty,
        batch.items.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(QuizResponse {
            questions: batch.items.iter().map(PublicQuestion::from).collect(),
            batch_id: batch.batch_id,
            language: batch.language,
            difficulty: batch.difficulty,
            focus_topic: advice.focus_topic,
            expires_at: batch.expires_at,
        }),
    ))
}

/// Grades a submitted batch and builds the placement.
///
/// * The batch is consumed: unknown, expired or already graded batches are 404.
/// * Classifier, recommender and composer failures degrade locally.
/// * A failed save is logged; the computed result is still returned.
pub async fn grade_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GradeQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Validate payload
    payload.validate()?;
    let batch_id = payload
        .batch_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("batch_id is required".to_string()))?;
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;

    // 2. Bind the exact batch that was issued
    let batch = state.sessions.bind_for_grading(batch_id, user_id)?;

    // 3. Score against the bound items only
    let sheet = scorer::grade(&batch.items, &payload.answers);
    let percent = if sheet.max_score() == 0 {
        0.0
    } else {
        sheet.score as f64 * 100.0 / sheet.max_score() as f64
    };

    // 4. Classify (the first call may read the pipeline file)
    let classifier = state.classifier.clone();
    let classification = tokio::task::spawn_blocking(move || classifier.classify(percent))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Level classification task failed: {}", e);
            classify_by_thresholds(percent)
        });
    let level = classification.level;

    // 5. Recommend courses and topics
    let recommended_courses = state
        .recommender
        .recommend(level, &batch.language, state.config.recommended_course_limit)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Course recommendation unavailable: {}", e);
            Vec::new()
        });
    let recommended_topics = recommend_topics(&sheet.weak_topics);

    // 6. Compose the learning path
    let learning_path = state
        .composer
        .compose(&PathRequest {
            score: sheet.score,
            max_score: sheet.max_score(),
            level,
            strengths: sheet.strong_topics.clone(),
            weaknesses: sheet.weak_topics.clone(),
            courses: recommended_courses.clone(),
        })
        .await;

    // 7. Persist record, profile and path as one unit
    let outcome = PlacementOutcome {
        record: NewPlacementRecord {
            user_id,
            score: sheet.score as i32,
            level,
            language: batch.language.clone(),
            difficulty: batch.difficulty,
            question_count: sheet.total_questions as i32,
            strengths: sheet.strong_topics.clone(),
            weaknesses: sheet.weak_topics.clone(),
            topic_misses: sheet.topic_misses(),
        },
        recommended_topics: recommended_topics.clone(),
        recommended_course_ids: recommended_courses.iter().map(|c| c.id).collect(),
        path_items: learning_path.clone(),
    };

    let placement_id = match state.placements.save_placement(outcome).await {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!("Failed to save placement for user {}: {}", user_id, e);
            None
        }
    };

    tracing::info!(
        "Graded batch {} for user {}: {} points, level {}",
        batch.batch_id,
        user_id,
        sheet.score,
        level
    );

    Ok(Json(GradeResponse {
        batch_id: batch.batch_id,
        placement_id,
        score: sheet.score,
        correct_count: sheet.correct_count,
        total_questions: sheet.total_questions,
        topic_tally: sheet.topic_tally,
        weak_topics: sheet.weak_topics,
        strong_topics: sheet.strong_topics,
        level,
        level_probabilities: classification.probabilities,
        recommended_courses,
        recommended_topics,
        learning_path,
    }))
}
