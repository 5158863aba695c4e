use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::ExtractionError;
use crate::models::candidature::CandidatureRecord;
use crate::state::AppState;

/// Upload size cap, matching typical résumé sizes with headroom for scans.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct TextAnalysisRequest {
    pub cv_text: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/v1/analysis/upload
///
/// Multipart form with a required `file` part (PDF) and an optional `email`
/// part. Runs the full byte pipeline and returns the persistence-ready
/// record.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CandidatureRecord>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut email: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        // Copy part metadata out before `bytes()`/`text()` consume the field.
        let part_name = field.name().map(str::to_string);
        match part_name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::Validation("File part has no filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file part: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("email") => {
                email = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read email part: {e}")))
                    .map(Some)?;
            }
            _ => {}
        }
    }

    let (filename, bytes) = file
        .ok_or_else(|| AppError::Validation("Missing required 'file' part".to_string()))?;

    validate_upload(&filename, bytes.len())?;

    info!(filename, size = bytes.len(), "analyzing uploaded document");

    let outcome = state
        .analyzer
        .analyze_bytes(&bytes, Some(&filename))
        .await
        .map_err(map_extraction_error)?;

    let record = CandidatureRecord::from_outcome(outcome, &storage_key(&filename), email);
    Ok(Json(record))
}

/// POST /api/v1/analysis/text
///
/// Accepts already-extracted CV text and an optional contact email. The
/// email is recorded on the result, never fed to the model.
pub async fn handle_text_analysis(
    State(state): State<AppState>,
    Json(req): Json<TextAnalysisRequest>,
) -> Result<Json<CandidatureRecord>, AppError> {
    if req.cv_text.trim().is_empty() {
        return Err(AppError::Validation("cv_text must not be empty".to_string()));
    }

    let outcome = state.analyzer.analyze_text(&req.cv_text, None).await;
    let record = CandidatureRecord::from_outcome(outcome, "text-submission", req.email);
    Ok(Json(record))
}

fn validate_upload(filename: &str, size: usize) -> Result<(), AppError> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation(format!(
            "Unsupported file type for '{filename}': only PDF is accepted"
        )));
    }
    if size == 0 {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "File exceeds the {} MB limit",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

fn map_extraction_error(err: ExtractionError) -> AppError {
    match err {
        // Malformed structure is consumed inside the pipeline; reaching here
        // would be a routing bug, so surface it loudly.
        ExtractionError::MalformedStructure(msg) => {
            AppError::Internal(anyhow::anyhow!("unrouted structural failure: {msg}"))
        }
        ExtractionError::Unreadable(msg) => AppError::UnprocessableEntity(msg),
    }
}

fn storage_key(filename: &str) -> String {
    format!("uploads/{}/{filename}", uuid::Uuid::new_v4())
}
