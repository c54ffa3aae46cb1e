use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::agents::dto::{AgentCreateRequest, AgentPatch};

/// Raw database row; `skills`, `voice_settings` and `appearance_settings`
/// are stored as JSON text columns.
#[derive(Debug, FromRow)]
pub struct AgentRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub avatar_url: Option<String>,
    pub agent_type: Option<String>,
    pub skills: Option<String>,
    pub permission: String,
    pub conversation_style: Option<String>,
    pub personality: Option<String>,
    pub voice_id: Option<String>,
    pub voice_settings: Option<String>,
    pub appearance_settings: Option<String>,
    pub temperature: f64,
    pub max_tokens: i32,
    pub system_prompt: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Domain shape with the structured columns decoded.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub avatar_url: Option<String>,
    pub agent_type: Option<String>,
    pub skills: Option<Vec<String>>,
    pub permission: String,
    pub conversation_style: Option<String>,
    pub personality: Option<String>,
    pub voice_id: Option<String>,
    pub voice_settings: Option<serde_json::Value>,
    pub appearance_settings: Option<serde_json::Value>,
    pub temperature: f64,
    pub max_tokens: i32,
    pub system_prompt: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Decode a JSON text column. An empty string decodes to "absent", the same
/// as NULL; this is an explicit rule, some historical rows stored "".
pub(crate) fn decode_json_text<T: DeserializeOwned>(
    raw: Option<&str>,
) -> Result<Option<T>, serde_json::Error> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => serde_json::from_str(s).map(Some),
    }
}

pub(crate) fn encode_json_text<T: Serialize>(
    value: Option<&T>,
) -> Result<Option<String>, serde_json::Error> {
    value.map(serde_json::to_string).transpose()
}

/// JSON codec failures travel as `sqlx::Error` so every storage failure in
/// this module classifies the same way further up.
pub(crate) fn decode_error(column: &str, err: serde_json::Error) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.into(),
        source: Box::new(err),
    }
}

fn encode_error(err: serde_json::Error) -> sqlx::Error {
    sqlx::Error::Encode(Box::new(err))
}

impl TryFrom<AgentRow> for Agent {
    type Error = sqlx::Error;

    fn try_from(r: AgentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            description: r.description,
            short_description: r.short_description,
            avatar_url: r.avatar_url,
            agent_type: r.agent_type,
            skills: decode_json_text(r.skills.as_deref())
                .map_err(|e| decode_error("skills", e))?,
            permission: r.permission,
            conversation_style: r.conversation_style,
            personality: r.personality,
            voice_id: r.voice_id,
            voice_settings: decode_json_text(r.voice_settings.as_deref())
                .map_err(|e| decode_error("voice_settings", e))?,
            appearance_settings: decode_json_text(r.appearance_settings.as_deref())
                .map_err(|e| decode_error("appearance_settings", e))?,
            temperature: r.temperature,
            max_tokens: r.max_tokens,
            system_prompt: r.system_prompt,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const COLUMNS: &str = "id, user_id, name, description, short_description, avatar_url, \
     agent_type, skills, permission, conversation_style, personality, voice_id, \
     voice_settings, appearance_settings, temperature, max_tokens, system_prompt, \
     is_active, created_at, updated_at";

pub async fn get_by_id(db: &PgPool, agent_id: i64) -> Result<Option<Agent>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM agents WHERE id = $1");
    let row = sqlx::query_as::<_, AgentRow>(&sql)
        .bind(agent_id)
        .fetch_optional(db)
        .await?;
    row.map(Agent::try_from).transpose()
}

pub async fn list_by_user(
    db: &PgPool,
    user_id: i64,
    skip: i64,
    limit: i64,
) -> Result<Vec<Agent>, sqlx::Error> {
    let sql =
        format!("SELECT {COLUMNS} FROM agents WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3");
    let rows = sqlx::query_as::<_, AgentRow>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await?;
    rows.into_iter().map(Agent::try_from).collect()
}

pub async fn count_by_user(db: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(count.0)
}

/// The owner is always the given `user_id`; any ownership hint in the
/// payload was discarded before it got here.
pub async fn insert(
    db: &PgPool,
    user_id: i64,
    agent: &AgentCreateRequest,
) -> Result<Agent, sqlx::Error> {
    let skills = encode_json_text(agent.skills.as_ref()).map_err(encode_error)?;
    let voice_settings = encode_json_text(agent.voice_settings.as_ref()).map_err(encode_error)?;
    let appearance_settings =
        encode_json_text(agent.appearance_settings.as_ref()).map_err(encode_error)?;

    let sql = format!(
        "INSERT INTO agents (user_id, name, description, short_description, avatar_url, \
         agent_type, skills, permission, conversation_style, personality, voice_id, \
         voice_settings, appearance_settings, temperature, max_tokens, system_prompt, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, AgentRow>(&sql)
        .bind(user_id)
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(&agent.short_description)
        .bind(&agent.avatar_url)
        .bind(&agent.agent_type)
        .bind(skills)
        .bind(&agent.permission)
        .bind(&agent.conversation_style)
        .bind(&agent.personality)
        .bind(&agent.voice_id)
        .bind(voice_settings)
        .bind(appearance_settings)
        .bind(agent.temperature)
        .bind(agent.max_tokens)
        .bind(&agent.system_prompt)
        .bind(agent.is_active)
        .fetch_one(db)
        .await?;

    Agent::try_from(row)
}

/// Applies only the fields present in the patch and refreshes `updated_at`.
/// A `Some(None)` patch value clears the column; `None` leaves it untouched.
/// Returns `None` when the id does not exist.
pub async fn update_partial(
    db: &PgPool,
    agent_id: i64,
    patch: &AgentPatch,
) -> Result<Option<Agent>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE agents SET updated_at = now()");

    if let Some(name) = &patch.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(description) = &patch.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(short_description) = &patch.short_description {
        qb.push(", short_description = ")
            .push_bind(short_description.clone());
    }
    if let Some(avatar_url) = &patch.avatar_url {
        qb.push(", avatar_url = ").push_bind(avatar_url.clone());
    }
    if let Some(agent_type) = &patch.agent_type {
        qb.push(", agent_type = ").push_bind(agent_type.clone());
    }
    if let Some(skills) = &patch.skills {
        let encoded = encode_json_text(skills.as_ref()).map_err(encode_error)?;
        qb.push(", skills = ").push_bind(encoded);
    }
    if let Some(permission) = &patch.permission {
        qb.push(", permission = ").push_bind(permission);
    }
    if let Some(conversation_style) = &patch.conversation_style {
        qb.push(", conversation_style = ")
            .push_bind(conversation_style.clone());
    }
    if let Some(personality) = &patch.personality {
        qb.push(", personality = ").push_bind(personality.clone());
    }
    if let Some(voice_id) = &patch.voice_id {
        qb.push(", voice_id = ").push_bind(voice_id.clone());
    }
    if let Some(voice_settings) = &patch.voice_settings {
        let encoded = encode_json_text(voice_settings.as_ref()).map_err(encode_error)?;
        qb.push(", voice_settings = ").push_bind(encoded);
    }
    if let Some(appearance_settings) = &patch.appearance_settings {
        let encoded = encode_json_text(appearance_settings.as_ref()).map_err(encode_error)?;
        qb.push(", appearance_settings = ").push_bind(encoded);
    }
    if let Some(temperature) = patch.temperature {
        qb.push(", temperature = ").push_bind(temperature);
    }
    if let Some(max_tokens) = patch.max_tokens {
        qb.push(", max_tokens = ").push_bind(max_tokens);
    }
    if let Some(system_prompt) = &patch.system_prompt {
        qb.push(", system_prompt = ").push_bind(system_prompt.clone());
    }
    if let Some(is_active) = patch.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }

    qb.push(" WHERE id = ");
    qb.push_bind(agent_id);
    qb.push(" RETURNING ");
    qb.push(COLUMNS);

    let row = qb.build_query_as::<AgentRow>().fetch_optional(db).await?;
    row.map(Agent::try_from).transpose()
}

pub async fn delete(db: &PgPool, agent_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM agents WHERE id = $1")
        .bind(agent_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod codec_tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn null_and_empty_string_decode_to_absent() {
        let decoded: Option<Vec<String>> = decode_json_text(None).unwrap();
        assert!(decoded.is_none());

        let decoded: Option<Vec<String>> = decode_json_text(Some("")).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn skills_roundtrip() {
        let skills = vec!["chat".to_string(), "draw".to_string()];
        let encoded = encode_json_text(Some(&skills)).unwrap().unwrap();
        let decoded: Option<Vec<String>> = decode_json_text(Some(&encoded)).unwrap();
        assert_eq!(decoded, Some(skills));
    }

    #[test]
    fn settings_decode_arbitrary_objects() {
        let decoded: Option<serde_json::Value> =
            decode_json_text(Some(r#"{"pitch": 1.1, "voice": "alto"}"#)).unwrap();
        let value = decoded.unwrap();
        assert_eq!(value["voice"], "alto");
    }

    #[test]
    fn malformed_json_is_an_error_not_absent() {
        let result: Result<Option<serde_json::Value>, _> = decode_json_text(Some("{not json"));
        assert!(result.is_err());
    }

    #[test]
    fn encode_none_is_null() {
        let encoded = encode_json_text::<Vec<String>>(None).unwrap();
        assert!(encoded.is_none());
    }

    #[test]
    fn codec_failure_classifies_as_database_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ApiError::from(decode_error("skills", json_err));
        assert!(matches!(err, ApiError::Database(_)));
        assert_eq!(err.code().as_str(), "50002");
    }
}
