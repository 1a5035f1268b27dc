//! End-to-end route tests: router -> core services -> LM Studio client ->
//! mocked LM Studio server.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use lmbridge_backend::{LmStudioClient, LmStudioClientConfig};
use lmbridge_core::{GatewaySettings, SettingsStore};
use lmbridge_proxy::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "qwen2.5-coder-14b";

fn app(backend_url: &str) -> Router {
    let settings = Arc::new(
        SettingsStore::new(GatewaySettings {
            backend_url: backend_url.to_string(),
            request_timeout_secs: 5,
            stream_idle_timeout_secs: 2,
            ..GatewaySettings::default()
        })
        .unwrap(),
    );
    let client = LmStudioClient::new(Arc::clone(&settings), &LmStudioClientConfig::new()).unwrap();
    create_router(AppState::new(Arc::new(client), settings))
}

async fn lm_studio_with(models: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models))
        .mount(&server)
        .await;
    server
}

async fn lm_studio() -> MockServer {
    lm_studio_with(json!({"object": "list", "data": [{"id": MODEL, "object": "model"}]})).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn sse_payloads(body: &Bytes) -> Vec<String> {
    std::str::from_utf8(body)
        .unwrap()
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

fn chat_reply(content: &str) -> Value {
    json!({
        "id": "chatcmpl-upstream",
        "object": "chat.completion",
        "model": MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    })
}

#[tokio::test]
async fn health_reports_reachable_backend() {
    let server = lm_studio().await;

    let (status, _, body) = send(app(&server.uri()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["reachable"], true);
    assert_eq!(body["models_loaded"], 1);
    assert!(body["latency_ms"].is_u64());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn health_reports_unreachable_backend_as_503() {
    let (status, _, body) = send(app("http://127.0.0.1:1"), get("/health")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(&body);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["reachable"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn models_lists_snapshot() {
    let server = lm_studio().await;

    let (status, _, body) = send(app(&server.uri()), get("/v1/models")).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], MODEL);
    assert_eq!(body["data"][0]["object"], "model");
}

#[tokio::test]
async fn chat_completion_resolves_placeholder_model_and_clamps_tokens() {
    let server = lm_studio().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": MODEL, "max_tokens": 2048, "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer lm-studio")
        .body(Body::from(
            json!({
                "model": "gpt-4",
                "messages": [{"role": "user", "content": "Hello!"}],
                "max_tokens": 100_000
            })
            .to_string(),
        ))
        .unwrap();

    let (status, _, body) = send(app(&server.uri()), request).await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], MODEL);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Hi there");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
    assert_eq!(body["usage"]["total_tokens"], 12);
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
}

#[tokio::test]
async fn streaming_completion_emits_frames_then_done() {
    let server = lm_studio().await;
    let upstream = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(upstream, "text/event-stream"))
        .mount(&server)
        .await;

    let (status, headers, body) = send(
        app(&server.uri()),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "Hello!"}], "stream": true}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");

    let payloads = sse_payloads(&body);
    assert_eq!(payloads.last().map(String::as_str), Some("[DONE]"));

    let chunks: Vec<Value> = payloads[..payloads.len() - 1]
        .iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(chunks[0]["model"], MODEL);

    let text: String = chunks
        .iter()
        .filter_map(|c| c["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(text, "Hello");

    let finishes: Vec<&Value> = chunks
        .iter()
        .map(|c| &c["choices"][0]["finish_reason"])
        .filter(|f| !f.is_null())
        .collect();
    assert_eq!(finishes, vec![&json!("stop")]);
}

#[tokio::test]
async fn interrupted_stream_ends_with_error_chunk_and_done() {
    let server = lm_studio().await;
    let upstream = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"one\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"two\"}}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(upstream, "text/event-stream"))
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(&server.uri()),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "count"}], "stream": true}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let payloads = sse_payloads(&body);
    assert_eq!(payloads.len(), 4);
    assert_eq!(payloads[3], "[DONE]");
    let last: Value = serde_json::from_str(&payloads[2]).unwrap();
    assert_eq!(last["choices"][0]["finish_reason"], "error");
}

#[tokio::test]
async fn malformed_json_is_400() {
    let server = lm_studio().await;
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = send(app(&server.uri()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["code"], "invalid_json");
}

#[tokio::test]
async fn invalid_request_never_reaches_backend() {
    let server = lm_studio().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(&server.uri()),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}], "max_tokens": 0}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn no_loaded_model_is_503_with_retry_after() {
    let server = lm_studio_with(json!({
        "data": [{"id": MODEL, "state": "not-loaded"}]
    }))
    .await;

    let (status, headers, body) = send(
        app(&server.uri()),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(headers[header::RETRY_AFTER], "5");
    let body = json_body(&body);
    assert_eq!(body["error"]["code"], "no_model_loaded");
    assert!(body["error"]["message"].as_str().unwrap().contains("Load a model"));
}

#[tokio::test]
async fn backend_rejection_status_passes_through() {
    let server = lm_studio().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Context length exceeded: 5000 > 4096"})),
        )
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(&server.uri()),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "long"}], "stream": true}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json_body(&body);
    assert_eq!(body["error"]["code"], "backend_rejected");
    assert!(body["error"]["message"].as_str().unwrap().contains("Context length"));
}

#[tokio::test]
async fn unreachable_backend_on_cold_start_is_503() {
    let (status, _, body) = send(
        app("http://127.0.0.1:1"),
        post_json(
            "/v1/chat/completions",
            &json!({"messages": [{"role": "user", "content": "hi"}]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&body)["error"]["code"], "no_model_loaded");
}

#[tokio::test]
async fn config_round_trip() {
    let server = lm_studio().await;
    let other = lm_studio().await;
    let app = app(&server.uri());

    let (status, _, body) = send(app.clone(), get("/config")).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["api_base"], format!("{}/v1", server.uri()));
    assert_eq!(body["max_tokens_ceiling"], 2048);

    let (status, _, body) = send(
        app.clone(),
        post_json(
            "/config",
            &json!({"lm_studio_url": other.uri(), "max_tokens_ceiling": 1024}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "updated");
    assert_eq!(body["config"]["backend_url"], other.uri());
    assert_eq!(body["config"]["max_tokens_ceiling"], 1024);

    let (_, _, body) = send(app, get("/config")).await;
    assert_eq!(json_body(&body)["api_base"], format!("{}/v1", other.uri()));
}

#[tokio::test]
async fn invalid_config_update_is_400() {
    let server = lm_studio().await;

    let (status, _, body) = send(
        app(&server.uri()),
        post_json("/config", &json!({"backend_url": "ftp://nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"]["code"], "invalid_config");
}

#[tokio::test]
async fn ask_answers_and_reports_errors_in_body() {
    let server = lm_studio().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("42")))
        .mount(&server)
        .await;

    let (status, _, body) = send(
        app(&server.uri()),
        post_json("/ask", &json!({"prompt": "What is the answer?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"response": "42"}));

    let (status, _, body) = send(
        app("http://127.0.0.1:1"),
        post_json("/ask", &json!({"prompt": "anyone there?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json_body(&body)["error"].is_string());
}

#[tokio::test]
async fn root_describes_service_and_allows_any_origin() {
    let server = lm_studio().await;
    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(app(&server.uri()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = json_body(&body);
    assert_eq!(body["name"], "lmbridge");
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["chat_completions"], "/v1/chat/completions");
}
