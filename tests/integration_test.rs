use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use kokorofile::backends::{AudioBuffer, SynthesisBackend, SynthesisRequest};
use kokorofile::error::KokoroError;
use kokorofile::server::{self, AppState, ServerSettings, SynthesizeRequest, TextRequest};

mockall::mock! {
    pub Backend {}
    impl SynthesisBackend for Backend {
        fn id(&self) -> &'static str;
        fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioBuffer, KokoroError>;
        fn list_voices(&self) -> Vec<String>;
    }
}

fn mock_with_voices(voices: &[&str]) -> MockBackend {
    let mut mock = MockBackend::new();
    let owned: Vec<String> = voices.iter().map(|v| v.to_string()).collect();
    mock.expect_list_voices().returning(move || owned.clone());
    mock
}

fn state_with(backend: MockBackend) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(backend),
        ServerSettings {
            lang_code: "en-us".to_string(),
            voice: "af_sarah".to_string(),
        },
    ))
}

fn short_buffer() -> AudioBuffer {
    AudioBuffer {
        samples: vec![0.1; 240],
        sample_rate: 24000,
    }
}

#[tokio::test]
async fn test_get_settings_lists_available_voices() {
    let state = state_with(mock_with_voices(&["af_sarah", "af_sky"]));

    let out = server::get_settings(State(state)).await;
    assert_eq!(out.0.voice, "af_sarah");
    assert_eq!(out.0.lang_code, "en-us");
    assert_eq!(out.0.available_voices, vec!["af_sarah", "af_sky"]);
}

#[tokio::test]
async fn test_update_settings_rejects_unknown_voice() {
    let state = state_with(mock_with_voices(&["af_sarah", "af_sky"]));

    let new = ServerSettings {
        lang_code: "en-gb".to_string(),
        voice: "zz_nobody".to_string(),
    };
    let err = server::update_settings(State(state.clone()), Json(new))
        .await
        .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

    // Prior settings must be untouched.
    let current = state.current_settings().await;
    assert_eq!(current.voice, "af_sarah");
    assert_eq!(current.lang_code, "en-us");
}

#[tokio::test]
async fn test_update_settings_replaces_state() {
    let state = state_with(mock_with_voices(&["af_sarah", "af_sky"]));

    let new = ServerSettings {
        lang_code: "en-gb".to_string(),
        voice: "af_sky".to_string(),
    };
    let out = server::update_settings(State(state.clone()), Json(new))
        .await
        .expect("update should succeed");
    assert_eq!(out.0.voice, "af_sky");

    let current = state.current_settings().await;
    assert_eq!(current.voice, "af_sky");
    assert_eq!(current.lang_code, "en-gb");
}

#[tokio::test]
async fn test_synthesize_file_rejects_empty_text() {
    // No synthesize expectation: the engine must not run for empty input.
    let state = state_with(mock_with_voices(&["af_sarah"]));

    let err = server::synthesize_file(
        State(state),
        Json(TextRequest {
            text: "   ".to_string(),
            voice: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_synthesize_file_returns_wav_attachment() {
    let mut mock = mock_with_voices(&["af_sarah"]);
    mock.expect_synthesize().returning(|_| Ok(short_buffer()));
    let state = state_with(mock);

    let resp = server::synthesize_file(
        State(state),
        Json(TextRequest {
            text: "colorless green ideas".to_string(),
            voice: None,
        }),
    )
    .await
    .expect("synthesis should succeed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/wav"
    );
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.starts_with(b"RIFF"));
    assert_eq!(body.len(), 44 + 240 * 2);
}

#[tokio::test]
async fn test_synthesize_maps_unknown_voice_to_400() {
    let mut mock = mock_with_voices(&["af_sarah"]);
    mock.expect_synthesize()
        .returning(|req| Err(KokoroError::VoiceNotFound(req.voice.clone())));
    let state = state_with(mock);

    let err = server::synthesize(
        State(state),
        Json(SynthesizeRequest {
            text: "hello".to_string(),
            voice: Some("zz_nobody".to_string()),
            speed: None,
            lang: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_engine_failure_maps_to_500() {
    let mut mock = mock_with_voices(&["af_sarah"]);
    mock.expect_synthesize()
        .returning(|_| Err(KokoroError::Synthesis("engine crashed".to_string())));
    let state = state_with(mock);

    let err = server::synthesize(
        State(state),
        Json(SynthesizeRequest {
            text: "hello".to_string(),
            voice: None,
            speed: None,
            lang: None,
        }),
    )
    .await
    .unwrap_err();

    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let detail: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(detail["detail"]
        .as_str()
        .unwrap()
        .contains("engine crashed"));
}

#[tokio::test]
async fn test_voices_route_reads_backend_catalog() {
    let state = state_with(mock_with_voices(&["af_sarah", "bf_emma"]));

    let out = server::list_voices(State(state)).await;
    assert_eq!(out.0["voices"], serde_json::json!(["af_sarah", "bf_emma"]));
}
