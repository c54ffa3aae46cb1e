use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::users::dto::{validate_email, validate_password, validate_username, UserPublic};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> ApiResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned after register or login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserPublic,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: UserPublic) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            username: "john".into(),
            email: "john@x.com".into(),
            password: "pw123456".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_username = RegisterRequest {
            username: "jo".into(),
            ..register("john@x.com", "pw123456")
        };
        assert!(bad_username.validate().is_err());

        let bad_email = register("nope", "pw123456");
        assert!(bad_email.validate().is_err());

        let bad_password = register("john@x.com", "pw1");
        assert!(bad_password.validate().is_err());
    }

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: "john".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn token_response_shape() {
        let resp = TokenResponse::bearer(
            "tok".into(),
            UserPublic {
                id: 1,
                username: "john".into(),
                email: "john@x.com".into(),
            },
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["access_token"], "tok");
        assert_eq!(json["user"]["username"], "john");
    }
}
