//! Recitation analysis endpoint
//!
//! `POST /analyze` accepts a multipart upload (field `audio`) and runs:
//! 1. Transcription (remote)
//! 2. Verse matching and weak-point summary (local)
//! 3. Report phrasing (remote)

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tilawa_common::Summary;
use tracing::{info, warn};
use uuid::Uuid;

use super::matching::match_and_compose;
use crate::{ApiError, ApiResult, AppState};

/// Form field carrying the recording
const AUDIO_FIELD: &str = "audio";

/// Report returned when the recording contained no recognizable speech
pub const NO_SPEECH_REPORT: &str = "لم يتمكن النموذج من فهم التسجيل الصوتي. حاول التسجيل مرة أخرى بصوت أوضح.";

/// Analysis response body
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub report_text: String,
    pub transcription: String,
    pub summary: Summary,
}

struct AudioUpload {
    filename: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_audio_field(multipart: &mut Multipart) -> ApiResult<AudioUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Audio file is empty".to_string()));
        }

        return Ok(AudioUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest(format!("Missing '{}' field", AUDIO_FIELD)))
}

/// POST /analyze
pub async fn analyze(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<AnalyzeResponse>> {
    let analysis_id = Uuid::new_v4();
    let upload = read_audio_field(&mut multipart).await?;

    info!(
        analysis_id = %analysis_id,
        filename = upload.filename.as_deref().unwrap_or("<unnamed>"),
        bytes = upload.bytes.len(),
        "Recitation received"
    );

    let transcription = match state.transcriber.transcribe(upload.bytes, &upload.content_type).await {
        Ok(t) => t,
        Err(e) => {
            warn!(analysis_id = %analysis_id, error = %e, "Transcription failed");
            state.record_error(format!("transcription: {}", e)).await;
            return Err(e.into());
        }
    };

    if transcription.text.is_empty() {
        info!(analysis_id = %analysis_id, "Transcription empty");
        return Ok(Json(AnalyzeResponse {
            analysis_id,
            report_text: NO_SPEECH_REPORT.to_string(),
            transcription: String::new(),
            summary: Summary::no_recognizable_verse(0.0),
        }));
    }

    let (summary, _) = match_and_compose(&state, transcription.text.clone(), 0).await?;

    info!(
        analysis_id = %analysis_id,
        reference = ?summary.matched_reference.map(|r| r.to_string()),
        score = summary.score,
        weak_points = summary.weak_points.len(),
        "Recitation matched"
    );

    let report_text = match state.report_writer.write_report(&summary, &state.corpus).await {
        Ok(text) => text,
        Err(e) => {
            warn!(analysis_id = %analysis_id, error = %e, "Report generation failed");
            state.record_error(format!("report: {}", e)).await;
            return Err(e.into());
        }
    };

    Ok(Json(AnalyzeResponse {
        analysis_id,
        report_text,
        transcription: transcription.text,
        summary,
    }))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
