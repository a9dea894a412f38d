//! # Monitor Service
//!
//! The long-lived object that owns everything outliving a single request:
//! the session store, the relay hub, the registered detector backends, the
//! latest-result slot for the debug endpoint, and the background session
//! sweeper. Constructed once at startup and shared with handlers as
//! `Arc<MonitorService>`; `close()` tears the sweeper down on shutdown.
//!
//! Detector backends are synchronous (model inference), so every call goes
//! through `web::block` onto the blocking pool with a hard timeout. Detector
//! calls always complete before any session lock is taken.

use actix_web::web;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::analysis::mailbox::LatestSlot;
use crate::analysis::ScoreSample;
use crate::detector::{
    BlobStats, DetectorError, EmotionClassifier, FaceObservation, VisualDetector,
    VoiceActivityDetector,
};
use crate::relay::RelayHub;
use crate::session::SessionStore;

/// The most recent frame analysis, tagged with the session it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct LatestResult {
    pub session_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub sample: ScoreSample,
}

pub struct MonitorService {
    store: Arc<SessionStore>,
    hub: Arc<RelayHub>,
    visual: Option<Arc<dyn VisualDetector>>,
    emotion: Option<Arc<dyn EmotionClassifier>>,
    vad: Option<Arc<dyn VoiceActivityDetector>>,
    latest: LatestSlot<LatestResult>,
    detector_timeout: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorService {
    pub fn new(detector_timeout: Duration) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            hub: Arc::new(RelayHub::new()),
            visual: None,
            emotion: None,
            vad: None,
            latest: LatestSlot::new(),
            detector_timeout,
            sweeper: Mutex::new(None),
        }
    }

    pub fn with_visual_detector(mut self, detector: Arc<dyn VisualDetector>) -> Self {
        self.visual = Some(detector);
        self
    }

    pub fn with_emotion_classifier(mut self, classifier: Arc<dyn EmotionClassifier>) -> Self {
        self.emotion = Some(classifier);
        self
    }

    pub fn with_voice_activity_detector(mut self, vad: Arc<dyn VoiceActivityDetector>) -> Self {
        self.vad = Some(vad);
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn hub(&self) -> &Arc<RelayHub> {
        &self.hub
    }

    /// Backend identifier for the status endpoint, "none" when no visual
    /// detector is registered.
    pub fn backend(&self) -> String {
        self.visual
            .as_ref()
            .map(|d| d.backend().to_string())
            .unwrap_or_else(|| "none".to_string())
    }

    pub fn publish_latest(&self, result: LatestResult) {
        self.latest.publish(result);
    }

    pub fn latest_result(&self) -> Option<LatestResult> {
        self.latest.latest()
    }

    /// Run the visual detector on the blocking pool with the configured
    /// timeout.
    pub async fn detect_face(
        &self,
        image: Vec<u8>,
    ) -> Result<Option<FaceObservation>, DetectorError> {
        let detector = self.visual.clone().ok_or(DetectorError::Unavailable)?;
        Self::run_blocking(self.detector_timeout, move || detector.detect(&image)).await
    }

    /// Run emotion classification on the blocking pool with the configured
    /// timeout.
    pub async fn classify_emotions(
        &self,
        image: Vec<u8>,
    ) -> Result<BTreeMap<String, f64>, DetectorError> {
        let classifier = self.emotion.clone().ok_or(DetectorError::Unavailable)?;
        Self::run_blocking(self.detector_timeout, move || classifier.classify(&image)).await
    }

    /// Run voice activity detection on the blocking pool with the configured
    /// timeout.
    pub async fn analyze_audio(&self, audio: Vec<u8>) -> Result<BlobStats, DetectorError> {
        let vad = self.vad.clone().ok_or(DetectorError::Unavailable)?;
        Self::run_blocking(self.detector_timeout, move || vad.analyze(&audio)).await
    }

    async fn run_blocking<T, F>(timeout: Duration, f: F) -> Result<T, DetectorError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DetectorError> + Send + 'static,
    {
        match tokio::time::timeout(timeout, web::block(f)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DetectorError::Failed(format!(
                "blocking task failed: {}",
                join_err
            ))),
            Err(_elapsed) => Err(DetectorError::Timeout),
        }
    }

    /// Spawn the background sweeper that reclaims sessions idle longer than
    /// `ttl`. Idempotent start; a second call replaces the previous task.
    pub fn start_sweeper(self: &Arc<Self>, ttl: Duration, interval: Duration) {
        let service = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it so a fresh server does
            // not sweep an empty map at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // A failing sweep must not kill the loop; sessions would
                // leak forever after one bad pass.
                match Self::run_guarded_sweep(AssertUnwindSafe(|| service.store.sweep(ttl))) {
                    Some(evicted) if evicted > 0 => {
                        info!(evicted, remaining = service.store.len(), "Reclaimed expired sessions");
                    }
                    Some(_) => {
                        debug!(sessions = service.store.len(), "Session sweep found nothing to reclaim");
                    }
                    None => {
                        error!("Session sweep panicked; will retry on the next interval");
                    }
                }
            }
        });

        if let Some(previous) = self.sweeper.lock().unwrap().replace(handle) {
            warn!("Replacing an already-running session sweeper");
            previous.abort();
        }
    }

    /// Run one sweep pass, containing any panic (a poisoned store lock
    /// would otherwise tear the task down silently). `None` means the pass
    /// failed.
    fn run_guarded_sweep<F>(sweep: F) -> Option<usize>
    where
        F: FnOnce() -> usize + std::panic::UnwindSafe,
    {
        std::panic::catch_unwind(sweep).ok()
    }

    /// Stop background work. Safe to call more than once.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
            info!("Session sweeper stopped");
        }
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{EyeLandmarks, Point};

    struct StubDetector {
        delay: Duration,
    }

    impl VisualDetector for StubDetector {
        fn backend(&self) -> &str {
            "stub"
        }

        fn detect(&self, _image: &[u8]) -> Result<Option<FaceObservation>, DetectorError> {
            std::thread::sleep(self.delay);
            let eye = EyeLandmarks {
                iris: Point::new(0.45, 0.5),
                left_corner: Point::new(0.4, 0.5),
                right_corner: Point::new(0.5, 0.5),
            };
            Ok(Some(FaceObservation {
                head: Point::new(0.5, 0.5),
                left_eye: eye,
                right_eye: eye,
            }))
        }
    }

    #[actix_web::test]
    async fn test_unregistered_detector_is_unavailable() {
        let service = MonitorService::new(Duration::from_millis(100));
        let result = service.detect_face(vec![0u8; 4]).await;
        assert!(matches!(result, Err(DetectorError::Unavailable)));
        assert_eq!(service.backend(), "none");
    }

    #[actix_web::test]
    async fn test_detector_call_succeeds() {
        let service = MonitorService::new(Duration::from_millis(500)).with_visual_detector(
            Arc::new(StubDetector {
                delay: Duration::ZERO,
            }),
        );
        let observation = service.detect_face(vec![0u8; 4]).await.unwrap();
        assert!(observation.is_some());
        assert_eq!(service.backend(), "stub");
    }

    #[actix_web::test]
    async fn test_slow_detector_times_out() {
        let service = MonitorService::new(Duration::from_millis(20)).with_visual_detector(
            Arc::new(StubDetector {
                delay: Duration::from_millis(200),
            }),
        );
        let result = service.detect_face(vec![0u8; 4]).await;
        assert!(matches!(result, Err(DetectorError::Timeout)));
    }

    #[actix_web::test]
    async fn test_sweeper_reclaims_expired_sessions() {
        let service = Arc::new(MonitorService::new(Duration::from_millis(100)));
        let entry = service.store().get_or_create("stale-session");
        entry.touch(0);

        service.start_sweeper(Duration::from_millis(5), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(service.store().is_empty());
        service.close();
    }

    #[test]
    fn test_guarded_sweep_contains_panics() {
        assert_eq!(
            MonitorService::run_guarded_sweep(AssertUnwindSafe(|| panic!("poisoned"))),
            None
        );
        assert_eq!(
            MonitorService::run_guarded_sweep(AssertUnwindSafe(|| 3)),
            Some(3)
        );
    }

    #[actix_web::test]
    async fn test_latest_result_slot() {
        let service = MonitorService::new(Duration::from_millis(100));
        assert!(service.latest_result().is_none());

        service.publish_latest(LatestResult {
            session_id: "s1".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            sample: ScoreSample::not_detected(),
        });
        let latest = service.latest_result().unwrap();
        assert_eq!(latest.session_id, "s1");
    }
}
