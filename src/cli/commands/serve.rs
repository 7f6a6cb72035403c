//! HTTP API server.
//!
//! Exposes sessions, transcripts, messages and question answering as JSON
//! endpoints for the web frontend.

use crate::cache::CacheOutcome;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::{ErrorKind, ScribeError};
use crate::orchestrator::Orchestrator;
use crate::session::{Message, NewTranscript, Sender, Session, Transcript, TranscriptSource};
use crate::transcription::MediaInput;
use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, warn};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    for warning in preflight::server_warnings(&settings) {
        Output::warning(&warning);
    }

    let orchestrator = Orchestrator::new(settings)?;
    let app = router(Arc::new(AppState { orchestrator }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("SmartScribe API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Sessions", "GET  /sessions?user_id=  POST /sessions");
    Output::kv("Transcripts", "GET  /transcripts?session_id=&user_id=  POST /transcripts");
    Output::kv("Messages", "GET  /messages?session_id=  POST /messages");
    Output::kv("Talk (RAG)", "POST /talk");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let settings = state.orchestrator.settings();

    let origins: Vec<HeaderValue> = settings
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    // Room for the largest accepted upload plus the other form fields.
    let body_limit = settings.transcription.max_upload_bytes + 1024 * 1024;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/transcripts", get(list_transcripts).post(create_transcript))
        .route("/messages", get(list_messages).post(create_message))
        .route("/talk", post(talk))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// === Errors ===

/// Error response: `{"error": message}` with a status derived from the error kind.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ScribeError> for ApiError {
    fn from(err: ScribeError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput | ErrorKind::Configuration => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// === Request/Response Types ===

#[derive(Deserialize)]
struct CreateSessionRequest {
    title: String,
    user_id: String,
}

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: String,
}

#[derive(Deserialize)]
struct TranscriptQuery {
    session_id: Option<String>,
    user_id: Option<String>,
}

/// JSON transcript submission: exactly one of `original_text` and `youtube_url`.
#[derive(Deserialize)]
struct CreateTranscriptRequest {
    session_id: String,
    #[serde(default = "default_user")]
    user_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    original_text: Option<String>,
    #[serde(default)]
    youtube_url: Option<String>,
}

fn default_user() -> String {
    "anonymous".to_string()
}

#[derive(Deserialize)]
struct CreateMessageRequest {
    session_id: String,
    sender: Sender,
    text: String,
}

#[derive(Deserialize)]
struct TalkRequest {
    session_id: String,
    prompt: String,
}

#[derive(Serialize)]
struct TalkResponse {
    response: String,
    cache: CacheOutcome,
    degraded: bool,
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "SmartScribe API is running" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = state.orchestrator.create_session(&req.title, &req.user_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<Session>>> {
    let sessions = state
        .orchestrator
        .list_sessions(query.user_id.as_deref())
        .await?;
    Ok(Json(sessions))
}

/// Accepts either a JSON body or a multipart upload with a `file` field.
async fn create_transcript(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> ApiResult<(StatusCode, Json<Transcript>)> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let transcript = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        transcript_from_upload(&state.orchestrator, multipart).await?
    } else {
        let Json(req) = Json::<CreateTranscriptRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        transcript_from_json(&state.orchestrator, req).await?
    };

    Ok((StatusCode::CREATED, Json(transcript)))
}

async fn transcript_from_json(
    orchestrator: &Orchestrator,
    req: CreateTranscriptRequest,
) -> ApiResult<Transcript> {
    let transcript = match (req.original_text, req.youtube_url) {
        (Some(text), None) => {
            orchestrator
                .add_transcript(NewTranscript {
                    session_id: req.session_id,
                    user_id: req.user_id,
                    title: req.title.unwrap_or_default(),
                    original_text: text,
                    source: TranscriptSource::Text,
                })
                .await?
        }
        (None, Some(url)) => {
            orchestrator
                .transcribe_and_add(
                    &req.session_id,
                    &req.user_id,
                    req.title.as_deref(),
                    MediaInput::Url(url),
                )
                .await?
        }
        _ => {
            return Err(ApiError::bad_request(
                "Provide exactly one of original_text or youtube_url",
            ))
        }
    };
    Ok(transcript)
}

async fn transcript_from_upload(
    orchestrator: &Orchestrator,
    mut multipart: Multipart,
) -> ApiResult<Transcript> {
    let mut session_id = None;
    let mut user_id = None;
    let mut title = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.mp3").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                file = Some((filename, bytes.to_vec()));
            }
            "session_id" | "user_id" | "title" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                match name.as_str() {
                    "session_id" => session_id = Some(value),
                    "user_id" => user_id = Some(value),
                    _ => title = Some(value),
                }
            }
            _ => {}
        }
    }

    let session_id = session_id.ok_or_else(|| ApiError::bad_request("Missing session_id field"))?;
    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    let user_id = user_id.unwrap_or_else(default_user);

    Ok(orchestrator
        .transcribe_and_add(
            &session_id,
            &user_id,
            title.as_deref(),
            MediaInput::File { filename, bytes },
        )
        .await?)
}

async fn list_transcripts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranscriptQuery>,
) -> ApiResult<Json<Vec<Transcript>>> {
    if query.session_id.is_none() && query.user_id.is_none() {
        return Err(ApiError::bad_request("session_id or user_id is required"));
    }
    let transcripts = state
        .orchestrator
        .find_transcripts(query.session_id.as_deref(), query.user_id.as_deref())
        .await?;
    Ok(Json(transcripts))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state
        .orchestrator
        .post_message(&req.session_id, req.sender, &req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.orchestrator.list_messages(&query.session_id).await?))
}

async fn talk(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TalkRequest>,
) -> ApiResult<Json<TalkResponse>> {
    let result = state
        .orchestrator
        .answer_question(&req.session_id, &req.prompt)
        .await?;

    Ok(Json(TalkResponse {
        response: result.answer.text,
        cache: result.cache,
        degraded: result.answer.degraded,
    }))
}
