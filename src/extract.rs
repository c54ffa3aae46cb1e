use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body extractor that renders malformed payloads through the uniform
/// envelope instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                Err(match &rejection {
                    JsonRejection::MissingJsonContentType(_) => ApiError::ParamMissing(
                        "Expected request with `Content-Type: application/json`".to_string(),
                    ),
                    other => ApiError::ParamFormat(other.body_text()),
                })
            }
        }
    }
}
