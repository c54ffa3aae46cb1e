use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{LoginRequest, RegisterRequest, TokenResponse};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::dto::UserPublic;
use crate::users::services as user_services;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();
    payload.validate()?;

    let user = user_services::register(
        &state.db,
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;

    let token = JwtKeys::from_ref(&state).sign(user.id, &user.username)?;
    Ok(Json(ApiResponse::success(TokenResponse::bearer(
        token, user,
    ))))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let user = user_services::authenticate(&state.db, &payload.username, &payload.password).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id, &user.username)?;
    Ok(Json(ApiResponse::success(TokenResponse::bearer(
        token, user,
    ))))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<ApiResponse<UserPublic>>> {
    // A token for a since-deleted user is no longer valid identity
    let user = user_services::get(&state.db, caller)
        .await
        .map_err(|e| match e {
            ApiError::UserNotFound => ApiError::Unauthorized("User not found".into()),
            other => other,
        })?;
    Ok(Json(ApiResponse::success(user)))
}

/// JWT is stateless; the client drops its token. Kept for API symmetry.
#[instrument]
async fn logout(AuthUser(_caller): AuthUser) -> ApiResult<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::success_with_message(
        (),
        "Logout successful",
    )))
}
