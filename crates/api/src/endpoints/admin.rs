//! Admin endpoints for questions and choices.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;
use polls_common::AppResult;
use polls_core::{
    Changelist, ChoiceInput, CreateQuestionInput, PubDateFilter, QuestionAdminConfig,
    QuestionAdminView, UpdateQuestionInput,
};
use polls_db::entities::choice;
use serde::Deserialize;

use super::parse_id;
use crate::{
    extractors::AdminUser,
    middleware::AppState,
    response::{ApiResponse, no_content},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/questions/config", get(config))
        .route("/questions", get(changelist).post(create_question))
        .route(
            "/questions/{id}",
            get(show_question)
                .patch(update_question)
                .delete(delete_question),
        )
        .route("/questions/{id}/choices", post(add_choice))
        .route("/choices/{id}", delete(delete_choice))
}

/// Changelist query string.
#[derive(Debug, Deserialize)]
struct ChangelistQuery {
    q: Option<String>,
    #[serde(default)]
    pub_date: PubDateFilter,
    page: Option<String>,
}

async fn config(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResponse<&'static QuestionAdminConfig> {
    ApiResponse::ok(state.admin_service.config())
}

async fn changelist(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ChangelistQuery>,
) -> AppResult<ApiResponse<Changelist>> {
    let changelist = state
        .admin_service
        .changelist(
            query.q.as_deref(),
            query.pub_date,
            query.page.as_deref(),
            Utc::now(),
        )
        .await?;
    Ok(ApiResponse::ok(changelist))
}

async fn create_question(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<CreateQuestionInput>,
) -> AppResult<Response> {
    let view = state
        .admin_service
        .create_question(input, Utc::now())
        .await?;
    tracing::info!(admin = %admin.username, question_id = view.question.id, "Admin created question");
    Ok((StatusCode::CREATED, ApiResponse::ok(view)).into_response())
}

async fn show_question(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<QuestionAdminView>> {
    let view = state.admin_service.show(parse_id(&id)?, Utc::now()).await?;
    Ok(ApiResponse::ok(view))
}

async fn update_question(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateQuestionInput>,
) -> AppResult<ApiResponse<QuestionAdminView>> {
    let view = state
        .admin_service
        .update_question(parse_id(&id)?, input, Utc::now())
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn delete_question(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.admin_service.delete_question(parse_id(&id)?).await?;
    Ok(no_content())
}

async fn add_choice(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<ChoiceInput>,
) -> AppResult<Response> {
    let choice: choice::Model = state
        .admin_service
        .add_choice(parse_id(&id)?, input)
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(choice)).into_response())
}

async fn delete_choice(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    state.admin_service.delete_choice(parse_id(&id)?).await?;
    Ok(no_content())
}
