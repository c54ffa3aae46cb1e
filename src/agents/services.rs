use sqlx::PgPool;
use tracing::info;

use crate::agents::dto::{AgentCreateRequest, AgentListResponse, AgentPatch, AgentResponse};
use crate::agents::repo::{self, Agent};
use crate::error::{ApiError, ApiResult};

/// Ownership decision on a lookup result: absent id is `AgentNotFound`,
/// someone else's agent is `PermissionDenied`. Existence is checked first so
/// the two outcomes stay distinguishable.
fn resolve_owned(found: Option<Agent>, requester_id: i64) -> ApiResult<Agent> {
    let agent = found.ok_or(ApiError::AgentNotFound)?;
    if agent.user_id != requester_id {
        return Err(ApiError::PermissionDenied(
            "no permission to access this agent".into(),
        ));
    }
    Ok(agent)
}

async fn get_owned(db: &PgPool, agent_id: i64, requester_id: i64) -> ApiResult<Agent> {
    resolve_owned(repo::get_by_id(db, agent_id).await?, requester_id)
}

/// List agents for an explicit owner filter; the caller supplied the filter,
/// so no ownership check applies here.
pub async fn list_for_user(
    db: &PgPool,
    user_id: i64,
    skip: i64,
    limit: i64,
) -> ApiResult<AgentListResponse> {
    let total = repo::count_by_user(db, user_id).await?;
    let agents = repo::list_by_user(db, user_id, skip, limit).await?;
    Ok(AgentListResponse {
        total,
        items: agents.into_iter().map(AgentResponse::from).collect(),
    })
}

pub async fn get(db: &PgPool, agent_id: i64, requester_id: i64) -> ApiResult<AgentResponse> {
    let agent = get_owned(db, agent_id, requester_id).await?;
    Ok(agent.into())
}

/// Ownership is forced to the authenticated caller; nothing in the payload
/// can assign the agent to another user.
pub async fn create(
    db: &PgPool,
    input: &AgentCreateRequest,
    owner_id: i64,
) -> ApiResult<AgentResponse> {
    let agent = repo::insert(db, owner_id, input).await?;
    info!(agent_id = %agent.id, user_id = %owner_id, "agent created");
    Ok(agent.into())
}

pub async fn update(
    db: &PgPool,
    agent_id: i64,
    patch: &AgentPatch,
    requester_id: i64,
) -> ApiResult<AgentResponse> {
    get_owned(db, agent_id, requester_id).await?;

    let updated = repo::update_partial(db, agent_id, patch)
        .await?
        .ok_or(ApiError::AgentNotFound)?;
    info!(agent_id = %agent_id, user_id = %requester_id, "agent updated");
    Ok(updated.into())
}

pub async fn delete(db: &PgPool, agent_id: i64, requester_id: i64) -> ApiResult<()> {
    get_owned(db, agent_id, requester_id).await?;

    if !repo::delete(db, agent_id).await? {
        return Err(ApiError::OperationFailed(
            "agent delete did not take effect".into(),
        ));
    }
    info!(agent_id = %agent_id, user_id = %requester_id, "agent deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn agent_owned_by(user_id: i64) -> Agent {
        Agent {
            id: 1,
            user_id,
            name: "Assistant".into(),
            description: None,
            short_description: None,
            avatar_url: None,
            agent_type: None,
            skills: None,
            permission: "private".into(),
            conversation_style: None,
            personality: None,
            voice_id: None,
            voice_settings: None,
            appearance_settings: None,
            temperature: 0.7,
            max_tokens: 2048,
            system_prompt: None,
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn owner_gets_their_agent() {
        let agent = resolve_owned(Some(agent_owned_by(42)), 42).expect("owner access");
        assert_eq!(agent.user_id, 42);
    }

    #[test]
    fn non_owner_is_denied_not_hidden() {
        let err = resolve_owned(Some(agent_owned_by(42)), 7).unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied(_)));
        assert_eq!(err.code().as_str(), "20004");
    }

    #[test]
    fn absent_agent_is_not_found_for_any_requester() {
        // Existence decides before ownership, even for a hypothetical owner.
        let err = resolve_owned(None, 42).unwrap_err();
        assert!(matches!(err, ApiError::AgentNotFound));

        let err = resolve_owned(None, 7).unwrap_err();
        assert!(matches!(err, ApiError::AgentNotFound));
        assert_eq!(err.code().as_str(), "30002");
    }
}
