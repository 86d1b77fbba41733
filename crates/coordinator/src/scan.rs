//! Request-scoped trigger for per-device profile scans.
//!
//! Validation runs on the caller. The scan itself runs on a spawned task that
//! first tries to take the device's guard and reports the result back over a
//! oneshot; the caller waits for that signal only, never for the scan.

use crate::guard::OperationGuard;
use crate::validation::{ensure_unlocked, parse_scan_request, resolve_scan_request};
use fieldops_core::{
    CorrelationId, ErrorKind, OperationError, OperationOutcome, ResolvedScanRequest,
};
use fieldops_provider::{ProfileScanner, ServiceState, TargetRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::oneshot;

pub struct ScanCoordinator {
    state: Arc<dyn ServiceState>,
    registry: Arc<dyn TargetRegistry>,
    guard: Arc<OperationGuard>,
    scanner: Option<Arc<dyn ProfileScanner>>,
}

impl ScanCoordinator {
    /// A coordinator with no scanner rejects every request as unavailable
    /// until one is attached with [`with_scanner`](Self::with_scanner).
    pub fn new(
        state: Arc<dyn ServiceState>,
        registry: Arc<dyn TargetRegistry>,
        guard: Arc<OperationGuard>,
    ) -> Self {
        Self {
            state,
            registry,
            guard,
            scanner: None,
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn ProfileScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn guard(&self) -> &Arc<OperationGuard> {
        &self.guard
    }

    /// Validates a JSON scan payload and, if the device is free, starts the
    /// scan. Returns as soon as the guard outcome is known.
    pub async fn trigger(&self, body: &[u8], correlation_id: CorrelationId) -> OperationOutcome {
        let (scanner, request) = match self.admit(body) {
            Ok(admitted) => admitted,
            Err(e) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    kind = %e.kind,
                    error = %e.message,
                    "profile scan rejected"
                );
                return e.into();
            }
        };
        self.dispatch(scanner, request, correlation_id).await
    }

    /// Reads the payload from `reader` first. A read failure is a
    /// `ServerError`; the lock check still comes before it.
    pub async fn trigger_reader<R>(
        &self,
        mut reader: R,
        correlation_id: CorrelationId,
    ) -> OperationOutcome
    where
        R: AsyncRead + Unpin,
    {
        if let Err(e) = ensure_unlocked(self.state.as_ref()) {
            return e.into();
        }

        let mut body = Vec::new();
        if let Err(e) = reader.read_to_end(&mut body).await {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "failed to read scan request"
            );
            return OperationOutcome::rejected(
                ErrorKind::ServerError,
                format!("Failed to read request body: {e}"),
            );
        }
        self.trigger(&body, correlation_id).await
    }

    fn admit(
        &self,
        body: &[u8],
    ) -> Result<(Arc<dyn ProfileScanner>, ResolvedScanRequest), OperationError> {
        ensure_unlocked(self.state.as_ref())?;
        let scanner = self.scanner.clone().ok_or_else(|| {
            OperationError::new(
                ErrorKind::ServiceUnavailable,
                "Profile scan is not implemented",
            )
        })?;
        let request = parse_scan_request(body)?;
        let resolved = resolve_scan_request(request, self.registry.as_ref())?;
        Ok((scanner, resolved))
    }

    async fn dispatch(
        &self,
        scanner: Arc<dyn ProfileScanner>,
        request: ResolvedScanRequest,
        correlation_id: CorrelationId,
    ) -> OperationOutcome {
        let device_name = request.device_name.clone();
        let profile_name = request.profile_name.clone();
        let guard = Arc::clone(&self.guard);
        let timeout = self.state.scan_timeout();
        let cid = correlation_id.clone();
        let (acquired_tx, acquired_rx) = oneshot::channel();

        tokio::spawn(async move {
            let lease = guard.try_lease(&request.device_name, &cid);
            // Always signal before doing any work; the caller is waiting.
            let _ = acquired_tx.send(lease.is_some());
            let Some(_lease) = lease else {
                return;
            };

            tracing::info!(
                correlation_id = %cid,
                device = %request.device_name,
                "profile scan triggered"
            );
            run_scan(scanner.as_ref(), request, timeout, &cid).await;
            tracing::info!(correlation_id = %cid, "profile scan done");
        });

        match acquired_rx.await {
            Ok(true) => OperationOutcome::Accepted {
                correlation_id,
                profile_name: Some(profile_name),
            },
            Ok(false) => {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    device = %device_name,
                    "profile scan already running"
                );
                OperationOutcome::rejected(
                    ErrorKind::Conflict,
                    format!("Another profile scan process for {device_name} is currently running"),
                )
            }
            Err(_) => OperationOutcome::rejected(
                ErrorKind::ServerError,
                "profile scan task exited before reporting guard state",
            ),
        }
    }
}

/// Runs the driver to completion (or until the watchdog fires) and logs the
/// result. Never returns an error: the triggering call has already returned.
async fn run_scan(
    scanner: &dyn ProfileScanner,
    request: ResolvedScanRequest,
    timeout: Option<Duration>,
    correlation_id: &CorrelationId,
) {
    let device = request.device_name.clone();
    let scan = scanner.scan(request);

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, scan).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    device = %device,
                    timeout_ms = limit.as_millis() as u64,
                    "profile scan timed out"
                );
                return;
            }
        },
        None => scan.await,
    };

    match result {
        Ok(profile) => tracing::info!(
            correlation_id = %correlation_id,
            device = %device,
            profile = %profile.name,
            resources = profile.resources.len(),
            "profile scan complete"
        ),
        Err(e) => tracing::error!(
            correlation_id = %correlation_id,
            device = %device,
            error = %e,
            "profile scan failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_core::{Device, ScanRequest};
    use fieldops_provider::{InMemoryRegistry, ServiceConfig, SharedConfig, SimulatedDriver};

    struct Fixture {
        config: Arc<SharedConfig>,
        driver: Arc<SimulatedDriver>,
        coordinator: ScanCoordinator,
    }

    fn fixture(delay: Duration) -> Fixture {
        fixture_with(ServiceConfig::default(), delay)
    }

    fn fixture_with(config: ServiceConfig, delay: Duration) -> Fixture {
        let config = Arc::new(SharedConfig::new(config));
        let registry = Arc::new(InMemoryRegistry::new());
        registry.add_device(Device::new("thermostat-1"));
        registry.add_profile("thermostat");
        let driver = Arc::new(SimulatedDriver::new(delay));
        let coordinator = ScanCoordinator::new(
            config.clone(),
            registry,
            Arc::new(OperationGuard::new()),
        )
        .with_scanner(driver.clone());
        Fixture {
            config,
            driver,
            coordinator,
        }
    }

    fn body(request: &ScanRequest) -> Vec<u8> {
        serde_json::to_vec(request).unwrap()
    }

    async fn wait_idle(guard: &OperationGuard, device: &str) {
        while guard.is_busy(device) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn accepted_scan_synthesizes_profile_name() {
        let f = fixture(Duration::ZERO);
        let outcome = f
            .coordinator
            .trigger(&body(&ScanRequest::for_device("thermostat-1")), CorrelationId::from("c1"))
            .await;

        assert!(outcome.is_accepted());
        assert!(outcome
            .profile_name()
            .unwrap()
            .starts_with("thermostat-1_profile_"));

        wait_idle(f.coordinator.guard(), "thermostat-1").await;
        assert_eq!(f.driver.scans(), 1);
    }

    #[tokio::test]
    async fn second_request_conflicts_while_first_runs() {
        let f = fixture(Duration::from_millis(100));
        let req = body(&ScanRequest::for_device("thermostat-1"));

        let first = f.coordinator.trigger(&req, CorrelationId::from("c1")).await;
        let second = f.coordinator.trigger(&req, CorrelationId::from("c2")).await;

        assert!(first.is_accepted());
        assert_eq!(second.error_kind(), Some(ErrorKind::Conflict));
        assert!(second.message().contains("currently running"));
        assert_eq!(
            f.coordinator.guard().owner("thermostat-1"),
            Some(CorrelationId::from("c1"))
        );

        wait_idle(f.coordinator.guard(), "thermostat-1").await;
        let third = f.coordinator.trigger(&req, CorrelationId::from("c3")).await;
        assert!(third.is_accepted());
    }

    #[tokio::test]
    async fn locked_service_rejects_before_parsing() {
        let f = fixture(Duration::ZERO);
        f.config.lock();
        let outcome = f.coordinator.trigger(b"garbage", CorrelationId::from("c1")).await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ServiceLocked));
    }

    #[tokio::test]
    async fn missing_scanner_is_unavailable() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.add_device(Device::new("thermostat-1"));
        let coordinator = ScanCoordinator::new(
            Arc::new(SharedConfig::default()),
            registry,
            Arc::new(OperationGuard::new()),
        );
        let outcome = coordinator
            .trigger(&body(&ScanRequest::for_device("thermostat-1")), CorrelationId::from("c1"))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ServiceUnavailable));
    }

    #[tokio::test]
    async fn driver_failure_releases_guard() {
        let f = fixture(Duration::ZERO);
        f.driver.set_failing(true);
        let req = body(&ScanRequest::for_device("thermostat-1"));

        assert!(f.coordinator.trigger(&req, CorrelationId::from("c1")).await.is_accepted());
        wait_idle(f.coordinator.guard(), "thermostat-1").await;
        assert_eq!(f.driver.scans(), 1);

        f.driver.set_failing(false);
        assert!(f.coordinator.trigger(&req, CorrelationId::from("c2")).await.is_accepted());
    }

    #[tokio::test]
    async fn watchdog_releases_hung_scan() {
        let f = fixture(Duration::from_secs(3600));
        f.config.set_scan_timeout(Some(Duration::from_millis(20)));
        let req = body(&ScanRequest::for_device("thermostat-1"));

        assert!(f.coordinator.trigger(&req, CorrelationId::from("c1")).await.is_accepted());
        assert!(f.coordinator.guard().is_busy("thermostat-1"));

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_idle(f.coordinator.guard(), "thermostat-1"),
        )
        .await
        .expect("guard released by watchdog");
        assert_eq!(f.driver.scans(), 0);
    }

    #[tokio::test]
    async fn zero_timeout_lets_scan_finish() {
        let config = ServiceConfig::from_json_str(r#"{"scan":{"timeoutMs":0}}"#).unwrap();
        let f = fixture_with(config, Duration::from_millis(1));
        let req = body(&ScanRequest::for_device("thermostat-1"));

        assert!(f.coordinator.trigger(&req, CorrelationId::from("c1")).await.is_accepted());
        wait_idle(f.coordinator.guard(), "thermostat-1").await;
        assert_eq!(f.driver.scans(), 1);
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            )))
        }
    }

    #[tokio::test]
    async fn unreadable_body_is_server_error() {
        let f = fixture(Duration::ZERO);
        let outcome = f
            .coordinator
            .trigger_reader(FailingReader, CorrelationId::from("c1"))
            .await;
        assert_eq!(outcome.error_kind(), Some(ErrorKind::ServerError));
    }

    #[tokio::test]
    async fn reader_body_is_scanned() {
        let f = fixture(Duration::ZERO);
        let req = body(&ScanRequest::for_device("thermostat-1").with_profile_name("custom"));
        let outcome = f
            .coordinator
            .trigger_reader(req.as_slice(), CorrelationId::from("c1"))
            .await;
        assert_eq!(outcome.profile_name(), Some("custom"));
    }
}
