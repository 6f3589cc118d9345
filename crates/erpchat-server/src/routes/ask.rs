use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use erpchat::{errors::ErrorResult, models::message::Message, orchestrator::Reply};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    conversation: Vec<Message>,
}

async fn ask_question(
    State(state): State<AppState>,
    Session(context): Session,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Json<Reply> {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("ask_question body rejected: {}", rejection.body_text());
            return Json(Reply::Error(ErrorResult {
                error: rejection.body_text(),
            }));
        }
    };
    info!(
        "ask_question from {} with {} messages",
        context.user_id,
        request.conversation.len()
    );
    let mut conversation = request.conversation;
    Json(state.assistant.handle(&context, &mut conversation).await)
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/ask_question", post(ask_question))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_body, request, state, API_KEY};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ask_question_with_tool_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", format!("Bearer {}", API_KEY).as_str()))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {"name": "get_open_invoices", "arguments": "{}"}
                    }]
                }}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [{"role": "system"}, {"role": "user"}, {"role": "assistant"}, {"role": "tool"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Open total is 500."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = routes(state(&server.uri()));
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/ask_question",
                "System Manager",
                Some(json!({"conversation": [{"role": "user", "content": "How much is open?"}]})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"role": "assistant", "content": "Open total is 500."})
        );

        let requests = server.received_requests().await.unwrap();
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(
            second["messages"][3],
            json!({"role": "tool", "tool_call_id": "call_7", "name": "get_open_invoices", "content": "500"})
        );
    }

    #[tokio::test]
    async fn test_provider_failure_is_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let app = routes(state(&server.uri()));
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/ask_question",
                "System Manager",
                Some(json!({"conversation": [{"role": "user", "content": "hi"}]})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Server error: 503 Service Unavailable"})
        );
    }

    #[tokio::test]
    async fn test_malformed_conversation_is_error_body() {
        let app = routes(state("http://127.0.0.1:9"));
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/ask_question",
                "System Manager",
                Some(json!({"conversation": [{"role": "developer", "content": "hi"}]})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("unknown variant `developer`"), "{}", error);
    }

    #[tokio::test]
    async fn test_missing_body_is_error_body() {
        let app = routes(state("http://127.0.0.1:9"));
        let response = app
            .oneshot(request(Method::POST, "/api/ask_question", "System Manager", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = routes(state("http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/ask_question")
                    .header("Content-Type", "application/json")
                    .header("X-Frappe-User", "admin@example.com")
                    .body(axum::body::Body::from(r#"{"conversation": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Missing or invalid authorization token"})
        );
    }
}
