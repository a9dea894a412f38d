//! Debug endpoints for poking at the engine without a capture pipeline.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::service::MonitorService;

/// GET /api/v1/debug/latest
///
/// The most recent frame analysis across all sessions, whatever the slot
/// currently holds. Latest-wins; intermediate results are dropped, which is
/// exactly what a poll-based debug view wants.
pub async fn latest_result(service: web::Data<MonitorService>) -> AppResult<HttpResponse> {
    match service.latest_result() {
        Some(result) => Ok(HttpResponse::Ok().json(json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "result": result,
        }))),
        None => Err(AppError::NotFound(
            "no analysis results published yet".to_string(),
        )),
    }
}

/// GET /api/v1/debug/sessions
pub async fn sessions_overview(service: web::Data<MonitorService>) -> HttpResponse {
    let store = service.store();
    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "count": store.len(),
        "session_ids": store.session_ids(),
    }))
}
