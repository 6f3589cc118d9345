use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use erpchat::session::SessionContext;
use serde_json::json;
use thiserror::Error;

use crate::state::AppState;

pub const USER_HEADER: &str = "x-frappe-user";
pub const ROLES_HEADER: &str = "x-frappe-roles";

#[derive(Error, Debug, PartialEq)]
pub enum AuthError {
    #[error("Missing or invalid authorization token")]
    InvalidToken,
    #[error("Missing session user")]
    MissingUser,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": self.to_string()})),
        )
            .into_response()
    }
}

/// The operator session forwarded by the host application
#[derive(Debug, Clone)]
pub struct Session(pub SessionContext);

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers, &state.auth_token).map(Session)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn session_from_headers(
    headers: &HeaderMap,
    auth_token: &str,
) -> Result<SessionContext, AuthError> {
    let token = header_str(headers, AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidToken)?;
    if auth_token.is_empty() || token != auth_token {
        return Err(AuthError::InvalidToken);
    }

    let user = header_str(headers, USER_HEADER)
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .ok_or(AuthError::MissingUser)?;

    let roles = header_str(headers, ROLES_HEADER)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect();

    Ok(SessionContext::new(user, roles))
}
