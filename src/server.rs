//! HTTP API over the same quiz operations as the CLI.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path as UrlPath, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::config::{self, Config};
use crate::error::{MkquizError, Result};
use crate::folders::AutoConfirm;
use crate::gemini::GeminiClient;
use crate::manifest::{self, QuestionType, QuizFor, Year};
use crate::paths::sanitize_strict;
use crate::quiz::{self, NewQuiz, QuizSelection};
use crate::AppState;

/// Scratch uploads older than this are deleted when the server starts.
pub const STALE_UPLOAD_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

static UPLOAD_COUNTER: AtomicU64 = AtomicU64::new(0);

// ---- Errors ----

fn status_of(err: &MkquizError) -> StatusCode {
    match err {
        MkquizError::ConfigMissing(_) => StatusCode::NOT_FOUND,
        MkquizError::Config(_)
        | MkquizError::Validation { .. }
        | MkquizError::Json { .. }
        | MkquizError::QuizOperation { .. } => StatusCode::BAD_REQUEST,
        MkquizError::Extraction(_) => StatusCode::BAD_GATEWAY,
        MkquizError::FileSystem { .. } | MkquizError::Template { .. } | MkquizError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for MkquizError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }
        (
            status,
            Json(json!({ "error": self.to_string(), "type": self.kind() })),
        )
            .into_response()
    }
}

// ---- Scratch uploads ----

/// An uploaded file in the scratch directory, deleted when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "failed to remove scratch upload");
            }
        }
    }
}

/// Unique scratch file name that keeps the upload's extension.
fn scratch_name(original: Option<&str>, fallback_ext: &str) -> String {
    let original = original
        .and_then(|n| Path::new(n).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let as_path = Path::new(&original);
    let stem = as_path
        .file_stem()
        .map(|s| sanitize_strict(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let ext = as_path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| fallback_ext.to_string());

    format!(
        "{}-{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        UPLOAD_COUNTER.fetch_add(1, Ordering::Relaxed),
        stem,
        ext
    )
}

fn write_scratch(dir: &Path, name: String, bytes: &[u8]) -> Result<ScratchFile> {
    std::fs::create_dir_all(dir).map_err(|e| {
        MkquizError::fs(format!("Failed to create uploads directory: {}", e), dir)
    })?;
    let path = dir.join(name);
    std::fs::write(&path, bytes).map_err(|e| {
        MkquizError::fs(format!("Failed to store upload: {}", e), &path)
    })?;
    Ok(ScratchFile(path))
}

/// Deletes files in `dir` last modified more than `max_age` ago. Returns how
/// many were removed.
pub fn sweep_stale_uploads(dir: &Path, max_age: Duration) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age >= max_age {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove stale upload"),
            }
        }
    }
    if removed > 0 {
        tracing::info!(removed, dir = %dir.display(), "cleaned up stale uploads");
    }
    removed
}

// ---- Multipart forms ----

#[derive(Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<(Option<String>, Bytes)>,
}

impl UploadForm {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.field(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| MkquizError::validation(format!("Missing required field: {}", name), name))
    }

    /// Reads the quiz fields shared by the add and from-PDF endpoints.
    fn new_quiz(&self) -> Result<NewQuiz> {
        Ok(NewQuiz {
            quiz_name: self.required("quizName")?.trim().to_string(),
            quiz_for: self.required("quizFor")?.parse::<QuizFor>()?,
            question_type: self.required("questionType")?.parse::<QuestionType>()?,
            year: self.required("year")?.parse::<Year>()?,
            published: self.field("published").map(|v| v.trim() == "true").unwrap_or(false),
        })
    }

    /// Folder overwrite is allowed unless the form says `overwrite=false`.
    fn overwrite(&self) -> bool {
        self.field("overwrite").map(|v| v.trim() != "false").unwrap_or(true)
    }
}

async fn read_form(mut multipart: Multipart, file_field: &str) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        MkquizError::validation(format!("Failed to read multipart field: {}", e), "form")
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                MkquizError::validation(format!("Failed to read uploaded file: {}", e), file_field)
            })?;
            form.file = Some((file_name, bytes));
        } else {
            let text = field.text().await.map_err(|e| {
                MkquizError::validation(format!("Failed to read field '{}': {}", name, e), &name)
            })?;
            form.fields.insert(name, text);
        }
    }
    Ok(form)
}

// ---- Handlers ----

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| MkquizError::Internal(format!("Background task failed: {}", e)))?
}

/// Unwraps an extractor, turning axum's plain-text rejection into a JSON
/// validation error.
fn accept<T, R: std::fmt::Display>(extracted: std::result::Result<T, R>, field: &str) -> Result<T> {
    extracted.map_err(|rejection| {
        MkquizError::validation(format!("Invalid request body: {}", rejection), field)
    })
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn handle_get_config(State(state): State<AppState>) -> Result<Json<Config>> {
    Ok(Json(config::load(&state.config_path)?))
}

async fn handle_save_config(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = accept(body, "body")?;
    let new_config = config::validate_fields(&body)?;
    let _guard = state.manifest_lock.lock().await;
    config::save(&state.config_path, &new_config)?;
    Ok(Json(json!({ "success": true, "config": new_config })))
}

async fn handle_list_quizzes(State(state): State<AppState>) -> Result<Json<manifest::Manifest>> {
    let cfg = config::load(&state.config_path)?;
    Ok(Json(manifest::load(&cfg.all_quizzez_json_path)?))
}

async fn handle_list_year(
    State(state): State<AppState>,
    UrlPath(year): UrlPath<String>,
) -> Result<Response> {
    let cfg = config::load(&state.config_path)?;
    let all = manifest::load(&cfg.all_quizzez_json_path)?;
    match all.list_for_year(&year) {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("No quizzes found for {} year", year) })),
        )
            .into_response()),
    }
}

/// Adds a quiz from a question file already sitting in the scratch directory.
async fn add_from_scratch(state: &AppState, request: NewQuiz, scratch: ScratchFile, overwrite: bool) -> Result<Json<Value>> {
    let cfg = config::load_and_validate(&state.config_path)?;
    let _guard = state.manifest_lock.lock().await;
    let outcome = blocking(move || {
        let outcome = quiz::add_quiz(&cfg, &request, &scratch.0, &mut AutoConfirm(overwrite));
        drop(scratch);
        outcome
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "quiz": outcome.quiz,
        "questionsCount": outcome.questions_count,
    })))
}

async fn handle_add_quiz(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let form = read_form(accept(multipart, "form")?, "jsonFile").await?;
    let (file_name, bytes) = form
        .file
        .as_ref()
        .ok_or_else(|| MkquizError::validation("No JSON file uploaded", "jsonFile"))?;
    let scratch = write_scratch(&state.uploads_dir, scratch_name(file_name.as_deref(), "json"), bytes)?;
    let request = form.new_quiz()?;

    add_from_scratch(&state, request, scratch, form.overwrite()).await
}

async fn handle_add_from_pdf(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>> {
    let form = read_form(accept(multipart, "form")?, "pdfFile").await?;
    let (_, pdf) = form
        .file
        .as_ref()
        .ok_or_else(|| MkquizError::validation("No PDF file uploaded", "pdfFile"))?;
    let request = form.new_quiz()?;

    let api_key = form
        .field("geminiApiKey")
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| state.gemini_api_key.clone())
        .ok_or_else(|| {
            MkquizError::validation(
                "Gemini API key is required. Provide it in the form or set GEMINI_API_KEY.",
                "geminiApiKey",
            )
        })?;
    let mut client = GeminiClient::new(api_key)?;
    if let Some(base) = &state.gemini_base_url {
        client = client.with_base_url(base.clone());
    }

    let questions = client.extract_questions(pdf).await?;
    if questions.is_empty() {
        return Err(MkquizError::validation("No questions found in the PDF", "pdfFile"));
    }
    let content = manifest::to_pretty_string(&questions, b"  ")?;
    let scratch = write_scratch(
        &state.uploads_dir,
        scratch_name(Some("extracted.json"), "json"),
        content.as_bytes(),
    )?;

    add_from_scratch(&state, request, scratch, form.overwrite()).await
}

async fn handle_delete_quizzes(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = accept(body, "quizzes")?;
    let list = match body {
        Value::Object(mut obj) => obj.remove("quizzes").unwrap_or(Value::Null),
        other => other,
    };
    let selections: Vec<QuizSelection> = serde_json::from_value(list).map_err(|e| {
        MkquizError::validation(format!("Invalid quizzes list: {}", e), "quizzes")
    })?;
    if selections.is_empty() {
        return Err(MkquizError::validation("No quizzes specified for removal", "quizzes"));
    }

    let cfg = config::load_and_validate(&state.config_path)?;
    let _guard = state.manifest_lock.lock().await;
    let removed = blocking(move || quiz::remove_quizzes(&cfg, &selections)).await?;
    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// First and last four characters with the middle starred; keys of eight
/// characters or fewer are starred entirely.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

async fn handle_gemini_key(State(state): State<AppState>) -> Json<Value> {
    match state.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Json(json!({ "hasKey": true, "maskedKey": mask_key(key) })),
        None => Json(json!({ "hasKey": false })),
    }
}

// ---- Router ----

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/config", get(handle_get_config).post(handle_save_config))
        .route(
            "/api/quizzes",
            get(handle_list_quizzes)
                .post(handle_add_quiz)
                .delete(handle_delete_quizzes),
        )
        .route("/api/quizzes/from-pdf", post(handle_add_from_pdf))
        .route("/api/quizzes/{year}", get(handle_list_year))
        .route("/api/gemini-key", get(handle_gemini_key))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Sweeps stale uploads, then serves the API (and `static_dir` at `/` when
/// given) until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr, static_dir: Option<PathBuf>) -> anyhow::Result<()> {
    std::fs::create_dir_all(&state.uploads_dir)?;
    sweep_stale_uploads(&state.uploads_dir, STALE_UPLOAD_AGE);

    let mut app = router(state);
    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", addr, e))?;
    tracing::info!("mkquiz API listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("AIzaSyExampleKey1234"), "AIza************1234");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("12345678"), "********");
    }

    #[test]
    fn test_scratch_name_keeps_extension() {
        let name = scratch_name(Some("../../My Quiz.JSON"), "json");
        assert!(name.ends_with("-my_quiz.json"), "{}", name);
        assert!(!name.contains('/'));

        let name = scratch_name(None, "json");
        assert!(name.ends_with("-upload.json"), "{}", name);
        assert_ne!(scratch_name(None, "json"), scratch_name(None, "json"));
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let scratch = write_scratch(dir.path(), "x.json".into(), b"[]").unwrap();
        let path = scratch.0.clone();
        assert!(path.exists());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_sweep_stale_uploads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        assert_eq!(sweep_stale_uploads(dir.path(), STALE_UPLOAD_AGE), 0);
        assert!(dir.path().join("a.json").exists());

        assert_eq!(sweep_stale_uploads(dir.path(), Duration::ZERO), 1);
        assert!(!dir.path().join("a.json").exists());
        assert!(dir.path().join("nested").exists());

        assert_eq!(sweep_stale_uploads(&dir.path().join("missing"), Duration::ZERO), 0);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(&MkquizError::ConfigMissing("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&MkquizError::config("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&MkquizError::validation("v", "f")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(&MkquizError::Extraction("e".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(&MkquizError::fs("disk", Path::new("/x"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(&MkquizError::Internal("join".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_blocking_panic_is_internal() {
        let err = blocking(|| -> Result<()> { panic!("worker died") }).await.unwrap_err();
        assert_eq!(err.kind(), "InternalError");
        assert_eq!(status_of(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
