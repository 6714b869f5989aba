//! Extractor for the memorial unlock token header.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::state::AppState;

/// Header carrying a token issued by `POST /memorials/{id}/unlock`.
pub const MEMORIAL_ACCESS_HEADER: &str = "x-memorial-access";

/// The raw unlock token, if the client sent one. Validation happens once the
/// memorial id is known.
#[derive(Debug, Clone, Default)]
pub struct MemorialAccessToken(pub Option<String>);

impl FromRequestParts<AppState> for MemorialAccessToken {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(MEMORIAL_ACCESS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(MemorialAccessToken(token))
    }
}
