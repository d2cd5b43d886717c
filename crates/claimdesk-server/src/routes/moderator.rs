use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use claimdesk_core::{UserRef, MODERATOR_ID_HEADER, MODERATOR_USERNAME_HEADER};

use crate::error::AppError;

/// The acting moderator, taken from the identity headers.
#[derive(Debug, Clone)]
pub struct Moderator(pub UserRef);

impl<S> FromRequestParts<S> for Moderator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(MODERATOR_ID_HEADER)
            .ok_or_else(|| AppError::bad_request(format!("missing {MODERATOR_ID_HEADER} header")))?
            .parse::<u64>()
            .map_err(|_| AppError::bad_request(format!("invalid {MODERATOR_ID_HEADER} header")))?;
        let username = header(MODERATOR_USERNAME_HEADER).ok_or_else(|| {
            AppError::bad_request(format!("missing {MODERATOR_USERNAME_HEADER} header"))
        })?;

        Ok(Moderator(UserRef::new(id, username)))
    }
}
