use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Form, Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{LoginForm, LoginResponse, RegisterRequest, RegisterResponse};
use crate::auth::services;
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: format!("User {} registered successfully", user.username),
        }),
    ))
}

#[instrument(skip(state, form))]
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = services::login(&state, &form.username, &form.password).await?;
    Ok(Json(response))
}
