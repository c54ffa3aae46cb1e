use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::users::repo::User;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ApiError::Param(
            "username must be between 3 and 50 characters".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> ApiResult<()> {
    if email.chars().count() > 100 || !is_valid_email(email) {
        return Err(ApiError::Param("invalid email address".into()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < 6 {
        return Err(ApiError::Param(
            "password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

/// Public part of the user returned to clients. Never carries the digest.
#[derive(Debug, Clone, Serialize)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    pub user_id: i64,
}

/// Partial update request; omitted fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdateRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_and_rejects() {
        assert!(is_valid_email("john@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn username_bounds() {
        assert!(validate_username("jo").is_err());
        assert!(validate_username("joe").is_ok());
        assert!(validate_username(&"x".repeat(50)).is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn password_minimum_length() {
        assert!(validate_password("pw123").is_err());
        assert!(validate_password("pw1234").is_ok());
    }

    #[test]
    fn update_request_omitted_fields_stay_none() {
        let req: UserUpdateRequest = serde_json::from_str(r#"{"user_id": 5}"#).unwrap();
        assert_eq!(req.user_id, 5);
        assert!(req.username.is_none());
        assert!(req.email.is_none());
        assert!(req.password.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn user_public_never_serializes_a_digest() {
        let public = UserPublic {
            id: 1,
            username: "john".into(),
            email: "john@x.com".into(),
        };
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }
}
