//! # Application State Management
//!
//! Shared state handed to every HTTP request handler: the runtime
//! configuration and the request metrics. Both sit behind `Arc<RwLock<...>>`
//! so many handlers can read concurrently while config updates and metric
//! writes stay exclusive.
//!
//! Session state does NOT live here; the session store and relay hub have
//! their own synchronization and are owned by the monitor service.

use crate::config::AppConfig;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration, updatable at runtime via the config
    /// endpoint.
    pub config: Arc<RwLock<AppConfig>>,

    /// Request metrics, updated by the metrics middleware on every request.
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started. Never changes, so no lock needed.
    pub start_time: Instant,
}

#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total HTTP requests processed since server start.
    pub request_count: u64,

    /// Total errors encountered since server start.
    pub error_count: u64,

    /// Currently connected signaling WebSocket clients.
    pub active_connections: u32,

    /// Per-endpoint statistics, keyed by e.g. "POST /api/v1/analyze".
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Clone out the current configuration so the lock is released
    /// immediately.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn increment_active_connections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_connections += 1;
    }

    pub fn decrement_active_connections(&self) {
        let mut metrics = self.metrics.write().unwrap();
        // Guard against underflow if disconnect fires twice.
        if metrics.active_connections > 0 {
            metrics.active_connections -= 1;
        }
    }

    /// Snapshot the metrics so the lock is not held while serializing the
    /// HTTP response.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_connections: metrics.active_connections,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate as a fraction between 0.0 and 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_counter_never_underflows() {
        let state = AppState::new(AppConfig::default());
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 0);

        state.increment_active_connections();
        state.increment_active_connections();
        state.decrement_active_connections();
        assert_eq!(state.get_metrics_snapshot().active_connections, 1);
    }

    #[test]
    fn test_endpoint_metrics_accumulate() {
        let state = AppState::new(AppConfig::default());
        state.record_endpoint_request("POST /api/v1/analyze", 10, false);
        state.record_endpoint_request("POST /api/v1/analyze", 30, true);

        let snapshot = state.get_metrics_snapshot();
        let metric = &snapshot.endpoint_metrics["POST /api/v1/analyze"];
        assert_eq!(metric.request_count, 2);
        assert_eq!(metric.error_count, 1);
        assert!((metric.average_duration_ms() - 20.0).abs() < f64::EPSILON);
        assert!((metric.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_config_rejects_invalid() {
        let state = AppState::new(AppConfig::default());
        let mut bad = AppConfig::default();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());
        // The existing config is untouched.
        assert_eq!(state.get_config().server.port, 8080);
    }
}
