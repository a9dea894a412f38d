//! Frame and audio analysis endpoints.
//!
//! These are the hot path: one POST per captured frame / recorded audio blob
//! per session. Both endpoints follow the same shape:
//!
//! 1. Decode the base64 payload (data-URI prefixes are tolerated).
//! 2. Run the detector backend off the request thread, with a timeout.
//! 3. Fold the result into the session state under the entry lock.
//! 4. Broadcast the scores into the result room.
//!
//! Malformed payloads and per-frame detector failures are *soft*: the
//! response is still 200 with `detected=false` / `success=false`, because a
//! live capture pipeline produces them routinely and the client should just
//! move on to the next frame. Only a missing backend is a hard 503.

use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::analysis::ScoreSample;
use crate::detector::DetectorError;
use crate::error::{AppError, AppResult};
use crate::service::{LatestResult, MonitorService};

fn default_session_id() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Base64-encoded image, with or without a `data:image/...;base64,`
    /// prefix.
    pub image: String,
    /// Room to broadcast results into; defaults to the session id.
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    pub session_id: String,
    /// Base64-encoded compressed audio blob.
    pub audio: String,
    pub room_id: Option<String>,
}

/// Strip an optional data-URI prefix and decode.
fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = payload
        .rsplit_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    general_purpose::STANDARD.decode(encoded.trim())
}

fn frame_body(session_id: &str, sample: &ScoreSample, error: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "session_id": session_id,
        "detected": sample.detected,
        "dominant_emotion": sample.dominant_emotion,
        "emotions": sample.emotions,
        "gaze_score": sample.gaze_score,
        "stability_score": sample.stability_score,
        "confidence_score": sample.confidence,
    });
    if let Some(error) = error {
        body["error"] = json!(error);
    }
    body
}

/// POST /api/v1/analyze
pub async fn analyze_frame(
    service: web::Data<MonitorService>,
    body: web::Json<FrameRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let image = match decode_payload(&req.image) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(session_id = %req.session_id, "Undecodable frame payload: {}", err);
            return Ok(HttpResponse::Ok().json(frame_body(
                &req.session_id,
                &ScoreSample::not_detected(),
                Some("invalid base64 payload"),
            )));
        }
    };

    // Detector calls run to completion before any session lock is taken.
    let observation = match service.detect_face(image.clone()).await {
        Ok(observation) => observation,
        Err(DetectorError::Unavailable) => {
            return Err(AppError::from(DetectorError::Unavailable));
        }
        Err(err) => {
            warn!(session_id = %req.session_id, "Face detection failed: {}", err);
            return Ok(HttpResponse::Ok().json(frame_body(
                &req.session_id,
                &ScoreSample::not_detected(),
                Some(&err.to_string()),
            )));
        }
    };

    // Emotion classification degrades independently of gaze/stability, so
    // every failure here (a missing classifier included) just means no
    // emotion update this frame. Skipped entirely when no face was found.
    let raw_emotions = if observation.is_some() {
        match service.classify_emotions(image).await {
            Ok(raw) => Some(raw),
            Err(err) => {
                debug!(session_id = %req.session_id, "Emotion classification skipped: {}", err);
                None
            }
        }
    } else {
        None
    };

    // get_or_create refreshes the idle clock on every call.
    let entry = service.store().get_or_create(&req.session_id);

    let sample = match observation {
        Some(observation) => {
            let mut state = entry.state.lock().unwrap();
            state.apply_frame(&observation, raw_emotions.as_ref())
        }
        // No face in frame: the session stays alive, scores report absence.
        None => ScoreSample::not_detected(),
    };

    service.publish_latest(LatestResult {
        session_id: req.session_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        sample: sample.clone(),
    });

    let room = req.room_id.as_deref().unwrap_or(&req.session_id);
    let mut broadcast = frame_body(&req.session_id, &sample, None);
    broadcast["type"] = json!("ai_results");
    service.hub().broadcast(room, &broadcast.to_string(), None);

    Ok(HttpResponse::Ok().json(frame_body(&req.session_id, &sample, None)))
}

/// POST /api/v1/analyze_audio
pub async fn analyze_audio(
    service: web::Data<MonitorService>,
    body: web::Json<AudioRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let audio = match decode_payload(&req.audio) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(session_id = %req.session_id, "Undecodable audio payload: {}", err);
            return Ok(HttpResponse::Ok().json(json!({
                "session_id": req.session_id,
                "success": false,
                "error": "invalid base64 payload",
            })));
        }
    };

    let stats = match service.analyze_audio(audio).await {
        Ok(stats) => stats,
        Err(DetectorError::Unavailable) => {
            return Err(AppError::from(DetectorError::Unavailable));
        }
        Err(err) => {
            warn!(session_id = %req.session_id, "Voice activity detection failed: {}", err);
            return Ok(HttpResponse::Ok().json(json!({
                "session_id": req.session_id,
                "success": false,
                "error": err.to_string(),
            })));
        }
    };

    // get_or_create refreshes the idle clock on every call.
    let entry = service.store().get_or_create(&req.session_id);

    let vocal = {
        let mut state = entry.state.lock().unwrap();
        state.apply_audio(&stats)
    };

    let body = json!({
        "session_id": req.session_id,
        "success": true,
        "fluency": vocal.fluency,
        "is_speaking": vocal.is_speaking,
        "vocal_status": vocal.status,
        "silence_streak": vocal.silence_streak_secs,
    });

    let room = req.room_id.as_deref().unwrap_or(&req.session_id);
    let mut broadcast = body.clone();
    broadcast["type"] = json!("vocal_results");
    service.hub().broadcast(room, &broadcast.to_string(), None);

    Ok(HttpResponse::Ok().json(body))
}
