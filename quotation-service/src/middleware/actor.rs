use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Caller identity forwarded by the gateway in `X-User-ID`.
///
/// Authorization is decided upstream; this extractor never rejects. When the
/// header is present it is recorded on the request span for auditing.
#[derive(Debug, Clone, Default)]
pub struct Actor(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());

        if let Some(user_id) = user_id {
            tracing::Span::current().record("user_id", user_id);
        }

        Ok(Actor(user_id.map(str::to_string)))
    }
}
