//! Provider adapter tests against a scripted transport
//!
//! Covers dialect payload shapes, auth header placement, response
//! classification and the missing-credential path.

mod helpers;

use helpers::{image_reply, test_config, text_reply, FakeTransport, DASHSCOPE_KEY, MUSIC_KEY};
use serde_json::json;
use songstep_gen::config::AuthStyle;
use songstep_gen::error::{CoreError, ErrorKind};
use songstep_gen::models::{
    GenerationRequest, ImageRequest, MusicRequest, MusicTaskState, ProviderPayload,
    TextCompletionRequest,
};
use songstep_gen::services::{
    AuthHeader, HttpMethod, MusicDialect, ProviderAdapter, TransportOutcome,
};
use std::sync::Arc;
use tempfile::TempDir;

fn adapter(base_url: &str, transport: Arc<FakeTransport>) -> (TempDir, ProviderAdapter) {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), base_url);
    (dir, ProviderAdapter::new(Arc::new(config), transport))
}

fn song() -> MusicRequest {
    MusicRequest {
        prompt: Some("[Verse]\nScrub scrub little hands".into()),
        title: Some("Clean Hands".into()),
        tags: Some("children's song, upbeat".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_defapi_submit_payload_and_auth() {
    let transport = FakeTransport::new();
    transport.respond_json(
        "/api/suno/generate",
        json!({ "code": 0, "data": { "task_id": "t-42" } }),
    );
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());
    assert_eq!(provider.dialect(), MusicDialect::DefApi);

    let submission = provider.submit_music(&song()).await.unwrap();
    assert_eq!(submission.task_id, "t-42");
    assert_eq!(submission.dialect, "defapi");

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, HttpMethod::Post);
    assert_eq!(call.url, "https://api.defapi.org/api/suno/generate");
    assert_eq!(call.auth, Some(AuthHeader::Bearer(MUSIC_KEY.to_string())));

    let body = call.body.as_ref().unwrap();
    assert_eq!(body["mv"], "chirp-v4-5");
    assert_eq!(body["custom_mode"], true);
    assert_eq!(body["make_instrumental"], false);
    assert_eq!(body["title"], "Clean Hands");
    assert_eq!(body["negative_tags"], "");
    assert!(body.get("continue_at").is_none());
    assert!(body.get("callback_url").is_none());
}

#[tokio::test]
async fn test_getgo_submit_folds_title_into_style() {
    let transport = FakeTransport::new();
    transport.respond_json(
        "/api/v1/generate",
        json!({ "code": 200, "data": { "taskId": "gg-1" } }),
    );
    let (_dir, provider) = adapter("https://cn.getgoapi.com", transport.clone());

    let submission = provider.submit_music(&song()).await.unwrap();
    assert_eq!(submission.task_id, "gg-1");

    let body = transport.calls()[0].body.clone().unwrap();
    assert_eq!(body["customMode"], true);
    assert_eq!(body["style"], "Clean Hands, children's song, upbeat");
    assert_eq!(body["callBackUrl"], "https://example.com/callback");
    assert!(body.get("title").is_none());
    assert!(body.get("mv").is_none());
}

#[tokio::test]
async fn test_music_key_as_api_key_header() {
    let transport = FakeTransport::new();
    transport.respond_json("/api/suno/generate", json!({ "task_id": "t-1" }));
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), "http://music.local");
    config.music_auth_style = AuthStyle::ApiKeyHeader;
    let provider = ProviderAdapter::new(Arc::new(config), transport.clone());
    assert_eq!(provider.dialect(), MusicDialect::Default);

    provider.submit_music(&song()).await.unwrap();
    assert_eq!(
        transport.calls()[0].auth,
        Some(AuthHeader::ApiKey(MUSIC_KEY.to_string()))
    );
}

#[tokio::test]
async fn test_submit_application_error_is_rejected() {
    let transport = FakeTransport::new();
    transport.respond_json(
        "/api/suno/generate",
        json!({ "code": 401, "msg": "invalid token" }),
    );
    let (_dir, provider) = adapter("https://api.defapi.org", transport);

    let err = provider.submit_music(&song()).await.unwrap_err();
    match err {
        CoreError::UpstreamRejected { status, body } => {
            assert_eq!(status, 200);
            assert!(body.contains("invalid token"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_http_error_keeps_status_and_body() {
    let transport = FakeTransport::new();
    transport.respond(
        "/api/suno/generate",
        TransportOutcome::Rejected {
            status: 429,
            body: "{\"msg\":\"quota exceeded\"}".into(),
        },
    );
    let (_dir, provider) = adapter("https://api.defapi.org", transport);

    let err = provider.submit_music(&song()).await.unwrap_err();
    assert_eq!(
        err,
        CoreError::UpstreamRejected {
            status: 429,
            body: "{\"msg\":\"quota exceeded\"}".into()
        }
    );
}

#[tokio::test]
async fn test_transport_failure_and_malformed_body() {
    let transport = FakeTransport::new();
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());

    // No route scripted: the fake reports a connect failure
    let err = provider.submit_music(&song()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);

    transport.respond(
        "/api/suno/generate",
        TransportOutcome::Completed {
            status: 200,
            body: "<html>bad gateway</html>".into(),
        },
    );
    let err = provider.submit_music(&song()).await.unwrap_err();
    assert_eq!(err, CoreError::UpstreamMalformed("<html>bad gateway</html>".into()));
}

#[tokio::test]
async fn test_fetch_status_url_and_states() {
    let transport = FakeTransport::new();
    transport.respond_json(
        "/api/task/query",
        json!({ "code": 0, "data": { "task_id": "t 1", "status": "processing" } }),
    );
    transport.respond_json(
        "/api/task/query",
        json!({
            "code": 0,
            "data": {
                "task_id": "t 1",
                "status": "SUCCESS",
                "result": [
                    { "id": "c1", "title": "Clean Hands", "audio_url": "https://cdn/a.mp3" }
                ]
            }
        }),
    );
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());

    let first = provider.fetch_music_status("t 1").await.unwrap();
    assert_eq!(first.state, MusicTaskState::Polling);

    let second = provider.fetch_music_status("t 1").await.unwrap();
    assert_eq!(second.state, MusicTaskState::Ready);
    assert_eq!(second.first_audio_url(), Some("https://cdn/a.mp3"));

    let call = &transport.calls()[0];
    assert_eq!(call.method, HttpMethod::Get);
    assert_eq!(call.url, "https://api.defapi.org/api/task/query?task_id=t+1");
}

#[tokio::test]
async fn test_fetch_requires_id() {
    let transport = FakeTransport::new();
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());

    let err = provider.fetch_music_status("  ").await.unwrap_err();
    assert_eq!(err, CoreError::Validation("missing id".into()));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_image_generation() {
    let transport = FakeTransport::new();
    transport.respond_json("multimodal-generation", image_reply("https://img/step1.png"));
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());

    let result = provider
        .generate_image(&ImageRequest {
            prompt: "Lele washing hands".into(),
            size: Some("999*999".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(result.image_url, "https://img/step1.png");
    assert_eq!(result.request_id.as_deref(), Some("req-image"));

    let call = &transport.calls()[0];
    assert_eq!(call.auth, Some(AuthHeader::Bearer(DASHSCOPE_KEY.to_string())));
    let body = call.body.as_ref().unwrap();
    assert_eq!(body["parameters"]["size"], "1664*928");
    assert_eq!(body["parameters"]["prompt_extend"], true);
    assert_eq!(body["parameters"]["watermark"], false);
}

#[tokio::test]
async fn test_image_error_code_in_success_body() {
    let transport = FakeTransport::new();
    transport.respond_json(
        "multimodal-generation",
        json!({ "code": "DataInspectionFailed", "message": "content blocked" }),
    );
    let (_dir, provider) = adapter("https://api.defapi.org", transport);

    let err = provider
        .generate_image(&ImageRequest {
            prompt: "something".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamRejected);
}

#[tokio::test]
async fn test_missing_dashscope_key_is_not_configured() {
    let transport = FakeTransport::new();
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), "https://api.defapi.org");
    config.dashscope_api_key.clear();
    let provider = ProviderAdapter::new(Arc::new(config), transport.clone());

    let err = provider
        .complete_text(&TextCompletionRequest::from_prompt("hello"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConfigured);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_generate_dispatches_by_kind() {
    let transport = FakeTransport::new();
    transport.respond_json("text-generation", text_reply("Hello there"));
    let (_dir, provider) = adapter("https://api.defapi.org", transport.clone());

    let request: GenerationRequest = serde_json::from_value(json!({
        "kind": "text_completion",
        "messages": [ { "role": "user", "content": "Say hello" } ]
    }))
    .unwrap();
    let payload = provider.generate(&request).await.unwrap();
    match payload {
        ProviderPayload::Text { content } => assert_eq!(content, "Hello there"),
        other => panic!("unexpected payload: {other:?}"),
    }
    let body = transport.calls_to("text-generation")[0].body.clone().unwrap();
    assert_eq!(body["model"], "qwen-plus");
}
