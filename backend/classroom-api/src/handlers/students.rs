use axum::{extract::State, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use super::ApiError;
use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::student::{
        AvailableQuizzesResponse, InterestsResponse, TakenQuizzesResponse, UpdateInterestsRequest,
    },
    services::{student_service::StudentService, AppState},
};

pub async fn list_quizzes(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentService::new(state.store.clone());
    let quizzes = service.available_quizzes(&claims.sub).await?;

    Ok(Json(AvailableQuizzesResponse { quizzes }))
}

pub async fn list_taken_quizzes(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentService::new(state.store.clone());
    let taken_quizzes = service.taken_quizzes(&claims.sub).await?;

    Ok(Json(TakenQuizzesResponse { taken_quizzes }))
}

pub async fn get_interests(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StudentService::new(state.store.clone());
    let subjects = service.interests(&claims.sub).await?;

    Ok(Json(InterestsResponse { subjects }))
}

pub async fn update_interests(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<UpdateInterestsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate().map_err(|e| {
        tracing::warn!("Interests validation failed: {}", e);
        ApiError::bad_request(format!("Validation error: {}", e))
    })?;

    let service = StudentService::new(state.store.clone());
    let subjects = service
        .update_interests(&claims.sub, &req.subject_ids)
        .await?;

    Ok(Json(InterestsResponse { subjects }))
}
