use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::dto::{UserIdRequest, UserPublic, UserUpdateRequest};
use crate::users::services;

/// POST-RPC route style so the endpoints stay compatible with RPC callers.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/list", post(list_users))
        .route("/users/get", post(get_user))
        .route("/users/update", post(update_user))
        .route("/users/delete", post(delete_user))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<UserPublic>>>> {
    let users = services::list(&state.db, 0, 100).await?;
    Ok(Json(ApiResponse::success(users)))
}

#[instrument(skip(state, payload))]
async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ApiJson(payload): ApiJson<UserIdRequest>,
) -> ApiResult<Json<ApiResponse<UserPublic>>> {
    let user = services::get(&state.db, payload.user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Mutations are restricted to the caller's own record.
#[instrument(skip(state, payload))]
async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<UserUpdateRequest>,
) -> ApiResult<Json<ApiResponse<UserPublic>>> {
    if payload.user_id != caller {
        return Err(ApiError::PermissionDenied(
            "cannot modify another user's account".into(),
        ));
    }
    payload.validate()?;
    let user = services::update(&state.db, payload.user_id, &payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[instrument(skip(state, payload))]
async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<UserIdRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if payload.user_id != caller {
        return Err(ApiError::PermissionDenied(
            "cannot delete another user's account".into(),
        ));
    }
    services::delete(&state.db, payload.user_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        (),
        "User deleted successfully",
    )))
}
