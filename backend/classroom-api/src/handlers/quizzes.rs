use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use super::ApiError;
use crate::{
    extractors::AppForm,
    middlewares::auth::JwtClaims,
    models::attempt::SubmitAnswerRequest,
    services::{attempt_service::AttemptService, AppState},
};

pub async fn get_current_question(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Opening quiz {} for student {}", quiz_id, claims.sub);

    let service = AttemptService::from_state(&state);
    let view = service.current_question(&claims.sub, &quiz_id).await?;

    Ok(Json(view))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
    AppForm(req): AppForm<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.answer_id.trim().is_empty() {
        return Err(ApiError::bad_request("answer_id is required"));
    }

    let service = AttemptService::from_state(&state);
    let response = service
        .submit_answer(&claims.sub, &quiz_id, &req.answer_id)
        .await?;

    Ok(Json(response))
}
