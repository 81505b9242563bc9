use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::audio;
use crate::backends::{AudioBuffer, SynthesisBackend, SynthesisRequest};
use crate::error::KokoroError;

/// Synthesis settings shared by every request until the next update.
/// Replaced wholesale by `POST /settings`; reads and writes go through
/// the state's `RwLock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub lang_code: String,
    pub voice: String,
}

#[derive(Debug, Serialize)]
pub struct SettingsOut {
    pub lang_code: String,
    pub voice: String,
    pub available_voices: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
    pub voice: Option<String>,
}

/// Shared state behind every route: the engine handle plus the mutable
/// settings pair.
pub struct AppState {
    backend: Arc<dyn SynthesisBackend>,
    settings: RwLock<ServerSettings>,
}

impl AppState {
    pub fn new(backend: Arc<dyn SynthesisBackend>, settings: ServerSettings) -> Self {
        Self {
            backend,
            settings: RwLock::new(settings),
        }
    }

    pub async fn current_settings(&self) -> ServerSettings {
        self.settings.read().await.clone()
    }
}

/// Error wrapper deciding between 400 (validation) and 500 responses,
/// with a FastAPI-style `{"detail": …}` body.
#[derive(Debug)]
pub struct ApiError(pub KokoroError);

impl From<KokoroError> for ApiError {
    fn from(err: KokoroError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/voices", get(list_voices))
        .route("/devices", get(list_devices))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/synthesize", post(synthesize))
        .route("/synthesize_file", post(synthesize_file))
        .route("/play_live", post(play_live))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<(), KokoroError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "kokorofile",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({ "voices": state.backend.list_voices() }))
}

pub async fn list_devices() -> Result<Json<serde_json::Value>, ApiError> {
    let devices = tokio::task::spawn_blocking(audio::output_devices)
        .await
        .map_err(|e| KokoroError::Device(format!("device enumeration failed: {e}")))??;

    let devices: Vec<serde_json::Value> = devices
        .into_iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    Ok(Json(json!({ "devices": devices })))
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<SettingsOut> {
    let settings = state.current_settings().await;
    Json(SettingsOut {
        lang_code: settings.lang_code,
        voice: settings.voice,
        available_voices: state.backend.list_voices(),
    })
}

/// Update lang/voice. An unknown voice is rejected with 400 and leaves
/// the previous settings untouched.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(new): Json<ServerSettings>,
) -> Result<Json<SettingsOut>, ApiError> {
    let voices = state.backend.list_voices();
    if !voices.iter().any(|v| *v == new.voice) {
        return Err(KokoroError::VoiceNotFound(new.voice).into());
    }

    *state.settings.write().await = new.clone();

    Ok(Json(SettingsOut {
        lang_code: new.lang_code,
        voice: new.voice,
        available_voices: voices,
    }))
}

/// Synthesize speech from text and return it as a WAV attachment.
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let settings = state.current_settings().await;
    let request = SynthesisRequest::new(
        req.text,
        req.voice.unwrap_or(settings.voice),
        req.speed.unwrap_or(1.0),
        req.lang.unwrap_or(settings.lang_code),
    )?;

    let buffer = run_synthesis(state.backend.clone(), request).await?;
    Ok(wav_response(audio::write_wav(&buffer)?))
}

/// Synthesize the full text with the current settings and return it as
/// a WAV attachment.
pub async fn synthesize_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> Result<Response, ApiError> {
    let settings = state.current_settings().await;
    let request = SynthesisRequest::new(
        req.text,
        req.voice.unwrap_or(settings.voice),
        1.0,
        settings.lang_code,
    )?;

    let buffer = run_synthesis(state.backend.clone(), request).await?;
    Ok(wav_response(audio::write_wav(&buffer)?))
}

/// Synthesize text and play it on the server host's default device.
pub async fn play_live(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let settings = state.current_settings().await;
    let request = SynthesisRequest::new(
        req.text,
        req.voice.unwrap_or(settings.voice),
        1.0,
        settings.lang_code,
    )?;

    let backend = state.backend.clone();
    tokio::task::spawn_blocking(move || -> Result<(), KokoroError> {
        let buffer = backend.synthesize(&request)?;
        audio::play(&buffer, None)
    })
    .await
    .map_err(|e| KokoroError::Synthesis(format!("playback task failed: {e}")))??;

    Ok(Json(json!({ "status": "played" })))
}

async fn run_synthesis(
    backend: Arc<dyn SynthesisBackend>,
    request: SynthesisRequest,
) -> Result<AudioBuffer, KokoroError> {
    tokio::task::spawn_blocking(move || backend.synthesize(&request))
        .await
        .map_err(|e| KokoroError::Synthesis(format!("synthesis task failed: {e}")))?
}

fn wav_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"output.wav\"",
            ),
        ],
        bytes,
    )
        .into_response()
}
