//! Session lifecycle endpoints.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::AppResult;
use crate::service::MonitorService;

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: String,
}

/// POST /api/v1/end_session
///
/// Idempotent: ending a session that does not exist (already swept, or
/// never started) still answers 200, with `success: false`.
pub async fn end_session(
    service: web::Data<MonitorService>,
    body: web::Json<EndSessionRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let existed = service.store().delete(&req.session_id);

    if existed {
        info!(session_id = %req.session_id, "Session ended by client");
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": existed,
        "session_id": req.session_id,
    })))
}

/// GET /api/v1/status
///
/// Liveness plus a one-line picture of what the server is carrying.
pub async fn status(service: web::Data<MonitorService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "detector_backend": service.backend(),
        "active_sessions": service.store().len(),
        "rooms": service.hub().room_count(),
        "connections": service.hub().connection_count(),
    }))
}
