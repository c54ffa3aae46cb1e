use serde::Serialize;

use crate::error::ErrorCode;

/// Uniform response envelope. `code = "0"` means success, anything else is a
/// domain error code from [`ErrorCode`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: ErrorCode::Success.as_str().to_string(),
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success.as_str().to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code: code.as_str().to_string(),
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_zero_code() {
        let resp = ApiResponse::success(serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "0");
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"]["id"], 1);
    }

    #[test]
    fn error_envelope_carries_code_and_null_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::AgentNotFound, "Agent not found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "30002");
        assert_eq!(json["message"], "Agent not found");
        assert!(json["data"].is_null());
    }
}
