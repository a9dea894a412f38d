use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "detector": {
                "backend": config.detector.backend,
                "timeout_ms": config.detector.timeout_ms
            },
            "session": {
                "ttl_secs": config.session.ttl_secs,
                "sweep_interval_secs": config.session.sweep_interval_secs
            }
        }
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str)?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "server": {
                "host": current_config.server.host,
                "port": current_config.server.port
            },
            "detector": {
                "backend": current_config.detector.backend,
                "timeout_ms": current_config.detector.timeout_ms
            },
            "session": {
                "ttl_secs": current_config.session.ttl_secs,
                "sweep_interval_secs": current_config.session.sweep_interval_secs
            }
        }
    })))
}
