use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use erpchat::access::AccessDecision;
use serde::Deserialize;
use tracing::warn;

use crate::auth::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TestKeyRequest {
    #[serde(default)]
    api_key: String,
}

async fn test_key(
    State(state): State<AppState>,
    Session(_): Session,
    body: Result<Json<TestKeyRequest>, JsonRejection>,
) -> Json<bool> {
    match body {
        Ok(Json(request)) => Json(state.access.test_credential(&request.api_key).await),
        Err(rejection) => {
            warn!("OpenAI API Key Test Failed: {}", rejection.body_text());
            Json(false)
        }
    }
}

async fn check_access_and_role(
    State(state): State<AppState>,
    Session(context): Session,
) -> Json<AccessDecision> {
    Json(state.access.check_access(&context).await)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/test_key", post(test_key))
        .route("/api/check_access_and_role", get(check_access_and_role))
        .with_state(state)
}
