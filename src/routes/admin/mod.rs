mod newsletters;
mod subscribers;

use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;

use crate::subscription::{error_chain_fmt, SubscriptionError};

pub use newsletters::publish_newsletter;
pub use subscribers::list_subscribers;

/// Bearer key guarding the `/admin` scope.
#[derive(Clone)]
pub struct AdminApiKey(pub Secret<String>);

#[derive(thiserror::Error)]
pub enum AdminError {
    #[error("Missing or invalid admin credentials.")]
    Unauthorized,
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

impl std::fmt::Debug for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AdminError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::Subscription(err) => err.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AdminError::Unauthorized => HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
                .body(self.to_string()),
            AdminError::Subscription(err) => err.error_response(),
        }
    }
}

/// Checks the `Authorization: Bearer <key>` header against the configured key.
pub fn authorize(request: &HttpRequest, api_key: &AdminApiKey) -> Result<(), AdminError> {
    let expected = api_key.0.expose_secret();
    if expected.is_empty() {
        return Err(AdminError::Unauthorized);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AdminError::Unauthorized)?;

    if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
        Ok(())
    } else {
        Err(AdminError::Unauthorized)
    }
}
