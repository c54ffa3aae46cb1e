use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::agents::repo::Agent;
use crate::error::{ApiError, ApiResult};

/// Deserializer for patch fields where "absent" and "set to null" must stay
/// distinguishable: a missing key stays `None` (via `#[serde(default)]`),
/// an explicit `null` becomes `Some(None)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

fn default_permission() -> String {
    "private".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> i32 {
    2048
}

fn default_is_active() -> bool {
    true
}

fn check_len(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::Param(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_name(name: &str) -> ApiResult<()> {
    let len = name.chars().count();
    if !(1..=100).contains(&len) {
        return Err(ApiError::Param(
            "name must be between 1 and 100 characters".into(),
        ));
    }
    Ok(())
}

fn check_temperature(temperature: f64) -> ApiResult<()> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ApiError::Param("temperature must be within [0, 2]".into()));
    }
    Ok(())
}

fn check_max_tokens(max_tokens: i32) -> ApiResult<()> {
    if !(1..=8192).contains(&max_tokens) {
        return Err(ApiError::Param(
            "max_tokens must be within [1, 8192]".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AgentCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default = "default_permission")]
    pub permission: String,
    #[serde(default)]
    pub conversation_style: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub voice_settings: Option<serde_json::Value>,
    #[serde(default)]
    pub appearance_settings: Option<serde_json::Value>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

impl AgentCreateRequest {
    pub fn validate(&self) -> ApiResult<()> {
        check_name(&self.name)?;
        if let Some(v) = &self.short_description {
            check_len("short_description", v, 200)?;
        }
        if let Some(v) = &self.avatar_url {
            check_len("avatar_url", v, 500)?;
        }
        if let Some(v) = &self.agent_type {
            check_len("agent_type", v, 50)?;
        }
        check_len("permission", &self.permission, 50)?;
        if let Some(v) = &self.conversation_style {
            check_len("conversation_style", v, 50)?;
        }
        if let Some(v) = &self.personality {
            check_len("personality", v, 100)?;
        }
        if let Some(v) = &self.voice_id {
            check_len("voice_id", v, 100)?;
        }
        check_temperature(self.temperature)?;
        check_max_tokens(self.max_tokens)?;
        Ok(())
    }
}

/// Partial patch for an agent. Plain `Option` fields cannot be nulled, only
/// replaced; the `double_option` fields distinguish "leave alone" from
/// "clear".
#[derive(Debug, Default, Deserialize)]
pub struct AgentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub short_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub agent_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub skills: Option<Option<Vec<String>>>,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub conversation_style: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub personality: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub voice_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub voice_settings: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub appearance_settings: Option<Option<serde_json::Value>>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub system_prompt: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl AgentPatch {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(Some(v)) = &self.short_description {
            check_len("short_description", v, 200)?;
        }
        if let Some(Some(v)) = &self.avatar_url {
            check_len("avatar_url", v, 500)?;
        }
        if let Some(Some(v)) = &self.agent_type {
            check_len("agent_type", v, 50)?;
        }
        if let Some(v) = &self.permission {
            check_len("permission", v, 50)?;
        }
        if let Some(Some(v)) = &self.conversation_style {
            check_len("conversation_style", v, 50)?;
        }
        if let Some(Some(v)) = &self.personality {
            check_len("personality", v, 100)?;
        }
        if let Some(Some(v)) = &self.voice_id {
            check_len("voice_id", v, 100)?;
        }
        if let Some(v) = self.temperature {
            check_temperature(v)?;
        }
        if let Some(v) = self.max_tokens {
            check_max_tokens(v)?;
        }
        Ok(())
    }
}

/// Update request: the target id plus the flattened patch fields.
#[derive(Debug, Deserialize)]
pub struct AgentUpdateRequest {
    pub agent_id: i64,
    #[serde(flatten)]
    pub patch: AgentPatch,
}

#[derive(Debug, Deserialize)]
pub struct AgentIdRequest {
    pub agent_id: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct AgentListRequest {
    /// Owner filter; defaults to the authenticated caller.
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl AgentListRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if self.skip < 0 {
            return Err(ApiError::Param("skip must be non-negative".into()));
        }
        if !(1..=100).contains(&self.limit) {
            return Err(ApiError::Param("limit must be within [1, 100]".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct AgentResponse {
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

impl From<Agent> for AgentResponse {
    fn from(a: Agent) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            name: a.name,
            description: a.description,
            short_description: a.short_description,
            avatar_url: a.avatar_url,
            agent_type: a.agent_type,
            skills: a.skills,
            permission: a.permission,
            conversation_style: a.conversation_style,
            personality: a.personality,
            voice_id: a.voice_id,
            voice_settings: a.voice_settings,
            appearance_settings: a.appearance_settings,
            temperature: a.temperature,
            max_tokens: a.max_tokens,
            system_prompt: a.system_prompt,
            is_active: a.is_active,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgentListResponse {
    pub total: i64,
    pub items: Vec<AgentResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_applies_defaults() {
        let req: AgentCreateRequest = serde_json::from_str(r#"{"name": "Assistant"}"#).unwrap();
        assert_eq!(req.name, "Assistant");
        assert_eq!(req.permission, "private");
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 2048);
        assert!(req.is_active);
        assert!(req.skills.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_request_bounds() {
        let long_name = format!(r#"{{"name": "{}"}}"#, "x".repeat(101));
        let req: AgentCreateRequest = serde_json::from_str(&long_name).unwrap();
        assert!(req.validate().is_err());

        let req: AgentCreateRequest =
            serde_json::from_str(r#"{"name": "A", "temperature": 2.5}"#).unwrap();
        assert!(req.validate().is_err());

        let req: AgentCreateRequest =
            serde_json::from_str(r#"{"name": "A", "max_tokens": 0}"#).unwrap();
        assert!(req.validate().is_err());

        let req: AgentCreateRequest =
            serde_json::from_str(r#"{"name": "A", "max_tokens": 8192, "temperature": 2.0}"#)
                .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn patch_distinguishes_omitted_null_and_value() {
        let patch: AgentPatch = serde_json::from_str(r#"{}"#).unwrap();
        assert!(patch.description.is_none());

        let patch: AgentPatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(patch.description, Some(None));

        let patch: AgentPatch = serde_json::from_str(r#"{"description": "hi"}"#).unwrap();
        assert_eq!(patch.description, Some(Some("hi".to_string())));
    }

    #[test]
    fn update_request_flattens_patch_fields() {
        let req: AgentUpdateRequest =
            serde_json::from_str(r#"{"agent_id": 7, "temperature": 1.2}"#).unwrap();
        assert_eq!(req.agent_id, 7);
        assert_eq!(req.patch.temperature, Some(1.2));
        assert!(req.patch.name.is_none());
        assert!(req.patch.max_tokens.is_none());
        assert!(req.patch.validate().is_ok());
    }

    #[test]
    fn patch_skills_can_be_cleared_or_replaced() {
        let patch: AgentPatch = serde_json::from_str(r#"{"skills": null}"#).unwrap();
        assert_eq!(patch.skills, Some(None));

        let patch: AgentPatch = serde_json::from_str(r#"{"skills": ["chat", "draw"]}"#).unwrap();
        assert_eq!(
            patch.skills,
            Some(Some(vec!["chat".to_string(), "draw".to_string()]))
        );
    }

    #[test]
    fn list_request_defaults_and_bounds() {
        let req: AgentListRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.user_id.is_none());
        assert_eq!(req.skip, 0);
        assert_eq!(req.limit, 100);
        assert!(req.validate().is_ok());

        let req: AgentListRequest = serde_json::from_str(r#"{"limit": 0}"#).unwrap();
        assert!(req.validate().is_err());

        let req: AgentListRequest = serde_json::from_str(r#"{"skip": -1}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
