use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::agents::dto::{
    AgentCreateRequest, AgentIdRequest, AgentListRequest, AgentListResponse, AgentResponse,
    AgentUpdateRequest,
};
use crate::agents::services;
use crate::auth::jwt::AuthUser;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST-RPC route style so the endpoints stay compatible with RPC callers.
pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/agents/create", post(create_agent))
        .route("/agents/list", post(list_agents))
        .route("/agents/get", post(get_agent))
        .route("/agents/update", post(update_agent))
        .route("/agents/delete", post(delete_agent))
}

#[instrument(skip(state, payload))]
async fn create_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<AgentCreateRequest>,
) -> ApiResult<Json<ApiResponse<AgentResponse>>> {
    payload.validate()?;
    let agent = services::create(&state.db, &payload, caller).await?;
    Ok(Json(ApiResponse::success(agent)))
}

/// `user_id` in the request is a query filter defaulting to the caller, not
/// an authorization decision.
#[instrument(skip(state, payload))]
async fn list_agents(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<AgentListRequest>,
) -> ApiResult<Json<ApiResponse<AgentListResponse>>> {
    payload.validate()?;
    let owner = payload.user_id.unwrap_or(caller);
    let agents = services::list_for_user(&state.db, owner, payload.skip, payload.limit).await?;
    Ok(Json(ApiResponse::success(agents)))
}

#[instrument(skip(state, payload))]
async fn get_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<AgentIdRequest>,
) -> ApiResult<Json<ApiResponse<AgentResponse>>> {
    let agent = services::get(&state.db, payload.agent_id, caller).await?;
    Ok(Json(ApiResponse::success(agent)))
}

#[instrument(skip(state, payload))]
async fn update_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<AgentUpdateRequest>,
) -> ApiResult<Json<ApiResponse<AgentResponse>>> {
    payload.patch.validate()?;
    let agent = services::update(&state.db, payload.agent_id, &payload.patch, caller).await?;
    Ok(Json(ApiResponse::success(agent)))
}

#[instrument(skip(state, payload))]
async fn delete_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<AgentIdRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    services::delete(&state.db, payload.agent_id, caller).await?;
    Ok(Json(ApiResponse::success_with_message(
        (),
        "Agent deleted successfully",
    )))
}
