// src/handlers/learning_path.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        learning_path::{LearningPathResponse, ProfileView},
        placement::PlacementResultResponse,
    },
    state::AppState,
};

/// Current skill profile and weekly timeline of a user.
/// Before the first placement the profile is "pending" and the timeline empty.
pub async fn get_learning_path(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.placements.skill_profile(user_id).await?;
    let path = state.placements.learning_path(user_id).await?;

    let skill_profile = match profile {
        Some(profile) => {
            // Stored ids are best effort; courses removed since are skipped.
            let courses = state
                .recommender
                .resolve(&profile.recommended_course_ids)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Cannot resolve recommended courses: {}", e);
                    Vec::new()
                });
            ProfileView::from_profile(profile, courses)
        }
        None => ProfileView::pending(),
    };

    Ok(Json(LearningPathResponse {
        skill_profile,
        timeline: path.map(|p| p.items).unwrap_or_default(),
    }))
}

/// Newest placement record and current profile of a user.
pub async fn get_placement_result(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let placement = state
        .placements
        .recent_placements(user_id, 1)
        .await?
        .into_iter()
        .next();
    let skill_profile = state.placements.skill_profile(user_id).await?;

    Ok(Json(PlacementResultResponse {
        placement,
        skill_profile,
    }))
}
