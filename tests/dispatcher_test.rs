use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

use mobilecore::fraud::{StaticFraudPrevention, header_names};
use mobilecore::http::{BuildError, HeadersMap, HttpRequest, RequestBuilder, RequestHooks, Response};
use mobilecore::network::{
    AnalyticsDelegate, AnalyticsEvent, AuditDelegate, Dependencies, DispatcherSnapshot,
    ErrorDomain, NetworkService, NetworkSettings, ServiceError,
};
use mobilecore::spinner::{NetworkSpinner, SpinnerPolicy};
use mobilecore::transport::{self, Transport, TransportError};

/// Transport answering every request with a fixed response, optionally
/// holding each send until `gate` is notified
struct FakeTransport {
    status: u16,
    body: &'static str,
    gate: Option<Arc<Notify>>,
    failure: Option<TransportError>,
    panics: bool,
    sent: Mutex<Vec<HttpRequest>>,
    cancels: AtomicUsize,
}

impl FakeTransport {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            gate: None,
            failure: None,
            panics: false,
            sent: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
        }
    }

    fn gated(status: u16, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(status, "")
        }
    }

    fn failing(error: TransportError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(200, "")
        }
    }

    fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::new(200, "")
        }
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> transport::Result<Response> {
        self.sent.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.panics {
            panic!("transport bug");
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(Response::new(self.status, self.body))
    }

    // Ignores cancellation so completions arrive late
    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingSpinner {
    shows: AtomicUsize,
    pops: AtomicUsize,
}

impl NetworkSpinner for CountingSpinner {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn pop_activity(&self) {
        self.pops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingAudit {
    calls: AtomicUsize,
}

impl AuditDelegate for RecordingAudit {
    fn record(&self, _request: &HttpRequest, _body: &[u8], _response: &Response) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl AnalyticsDelegate for RecordingAnalytics {
    fn record(&self, event: AnalyticsEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Holds `build()` inside the header hook until notified
struct GatedHooks {
    gate: Arc<Notify>,
}

#[async_trait]
impl RequestHooks for GatedHooks {
    async fn additional_headers(&self) -> Result<HeadersMap, BuildError> {
        self.gate.notified().await;
        Ok(HeadersMap::new())
    }
}

struct Harness {
    service: NetworkService,
    transport: Arc<FakeTransport>,
    spinner: Arc<CountingSpinner>,
    audit: Arc<RecordingAudit>,
    analytics: Arc<RecordingAnalytics>,
}

fn harness_with(transport: FakeTransport, settings: NetworkSettings) -> Harness {
    let transport = Arc::new(transport);
    let spinner = Arc::new(CountingSpinner::default());
    let audit = Arc::new(RecordingAudit::default());
    let analytics = Arc::new(RecordingAnalytics::default());

    let dependencies = Dependencies::builder()
        .transport(transport.clone())
        .spinner(spinner.clone())
        .audit(audit.clone())
        .analytics(analytics.clone())
        .build();

    Harness {
        service: NetworkService::new(settings, dependencies),
        transport,
        spinner,
        audit,
        analytics,
    }
}

fn immediate_dismissal(suppressed: &[&str]) -> NetworkSettings {
    NetworkSettings {
        spinner_policy: SpinnerPolicy::new(
            suppressed,
            Vec::<String>::new(),
            Duration::ZERO,
            Duration::ZERO,
        )
        .unwrap(),
        ..NetworkSettings::default()
    }
}

fn harness(status: u16) -> Harness {
    harness_with(FakeTransport::new(status, "body"), immediate_dismissal(&[]))
}

async fn wait_for<F>(service: &NetworkService, condition: F) -> DispatcherSnapshot
where
    F: Fn(&DispatcherSnapshot) -> bool,
{
    for _ in 0..200 {
        let snapshot = service.snapshot().await.unwrap();
        if condition(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("dispatcher never reached the expected state");
}

#[tokio::test]
async fn test_success_is_delivered_once() {
    let h = harness(200);
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let counter = calls.clone();
    h.service
        .data(RequestBuilder::new("https://example.com/a"), move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });

    let result = rx.recv().await.unwrap();
    assert_eq!(result.unwrap().status, Some(200));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.audit.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spinner_counts_for_shown_and_suppressed_urls() {
    let h = harness_with(
        FakeTransport::new(200, ""),
        immediate_dismissal(&["/poll"]),
    );

    h.service
        .fetch(RequestBuilder::new("https://example.com/poll/status"))
        .await
        .unwrap();
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 0);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 0);

    h.service
        .fetch(RequestBuilder::new("https://example.com/accounts"))
        .await
        .unwrap();
    wait_for(&h.service, |s| s.spinner_visible == 0).await;
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 1);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spinner_dismissal_is_delayed() {
    let settings = NetworkSettings {
        spinner_policy: SpinnerPolicy::new(
            Vec::<String>::new(),
            ["/submit"],
            Duration::from_millis(30),
            Duration::from_millis(300),
        )
        .unwrap(),
        ..NetworkSettings::default()
    };
    let h = harness_with(FakeTransport::new(200, ""), settings);

    h.service
        .fetch(RequestBuilder::new("https://example.com/returns/submit"))
        .await
        .unwrap();

    // Still inside the extended delay
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.service.snapshot().await.unwrap().spinner_visible, 1);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 0);

    wait_for(&h.service, |s| s.spinner_visible == 0).await;
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spinner_hidden_after_error_status() {
    let h = harness(500);
    let result = h
        .service
        .fetch(RequestBuilder::new("https://example.com/a"))
        .await;

    assert!(matches!(result, Err(ServiceError::Retryable(_))));
    wait_for(&h.service, |s| s.spinner_visible == 0).await;
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 1);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spinner_hidden_after_transport_failure() {
    let h = harness_with(
        FakeTransport::failing(TransportError::Connect("refused".to_string())),
        immediate_dismissal(&[]),
    );
    let result = h
        .service
        .fetch(RequestBuilder::new("https://example.com/a"))
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::InternetConnectivityIssue(ref cause))
            if cause.domain == ErrorDomain::Connectivity
    ));
    let snapshot = wait_for(&h.service, |s| s.spinner_visible == 0).await;
    assert_eq!(snapshot.in_transport, 0);
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 1);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 1);
    assert_eq!(h.audit.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_forbidden_logs_out_with_one_event() {
    let h = harness(403);
    let result = h
        .service
        .fetch(RequestBuilder::new("https://example.com/a"))
        .await;

    assert_eq!(result, Err(ServiceError::Logout));
    let events = h.analytics.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].label.as_deref(), Some("403 forbidden"));
}

#[tokio::test]
async fn test_build_failure_skips_transport_and_spinner() {
    let h = harness(200);
    let result = h.service.fetch(RequestBuilder::new("no scheme here")).await;

    assert!(matches!(
        result,
        Err(ServiceError::Unrecoverable(ref cause)) if cause.domain == ErrorDomain::Build
    ));
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 0);
    assert_eq!(h.audit.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_error_from_hook_passes_through() {
    struct LockedOut;

    #[async_trait]
    impl RequestHooks for LockedOut {
        async fn additional_headers(&self) -> Result<HeadersMap, BuildError> {
            Err(ServiceError::Logout.into())
        }
    }

    let h = harness(200);
    let result = h
        .service
        .fetch(RequestBuilder::new("https://example.com/a").hooks(Arc::new(LockedOut)))
        .await;

    assert_eq!(result, Err(ServiceError::Logout));
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_cancel_completes_building_requests_once() {
    let h = harness(200);
    let gate = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let counter = calls.clone();
    h.service.data(
        RequestBuilder::new("https://example.com/slow").hooks(Arc::new(GatedHooks {
            gate: gate.clone(),
        })),
        move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        },
    );

    wait_for(&h.service, |s| s.pending_builds == 1).await;
    h.service.cancel_requests();

    let result = rx.recv().await.unwrap();
    assert!(matches!(
        result,
        Err(ServiceError::Unrecoverable(ref cause)) if cause.domain == ErrorDomain::Cancelled
    ));

    // Let the build finish after the fact
    gate.notify_one();
    wait_for(&h.service, |s| s.pending_builds == 0).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.transport.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_late_completion_after_cancel_is_delivered_once() {
    let gate = Arc::new(Notify::new());
    let h = harness_with(FakeTransport::gated(200, gate.clone()), immediate_dismissal(&[]));
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let counter = calls.clone();
    h.service
        .data(RequestBuilder::new("https://example.com/a"), move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result);
        });

    wait_for(&h.service, |s| s.in_transport == 1).await;
    h.service.cancel_requests();
    assert_eq!(h.transport.cancels.load(Ordering::SeqCst), 1);

    gate.notify_one();
    let result = rx.recv().await.unwrap();
    assert!(result.is_ok());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let snapshot = wait_for(&h.service, |s| s.in_transport == 0).await;
    assert_eq!(snapshot.spinner_visible, 0);
}

#[tokio::test]
async fn test_concurrent_requests_each_complete() {
    let h = harness(200);
    let (tx, mut rx) = mpsc::unbounded_channel();

    for i in 0..10 {
        let tx = tx.clone();
        h.service.data(
            RequestBuilder::new(format!("https://example.com/items/{i}")),
            move |result| {
                let _ = tx.send(result.is_ok());
            },
        );
    }
    drop(tx);

    let mut delivered = 0;
    while let Some(ok) = rx.recv().await {
        assert!(ok);
        delivered += 1;
    }

    assert_eq!(delivered, 10);
    assert_eq!(h.audit.calls.load(Ordering::SeqCst), 10);
    assert_eq!(h.service.metrics().requests_dispatched, 10);
    wait_for(&h.service, |s| s.spinner_visible == 0).await;
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_dispatcher() {
    let h = harness(200);
    let (tx, mut rx) = mpsc::unbounded_channel();

    h.service
        .data(RequestBuilder::new("https://example.com/a"), |_| {
            panic!("handler bug");
        });
    h.service
        .data(RequestBuilder::new("https://example.com/b"), move |result| {
            let _ = tx.send(result);
        });

    assert!(rx.recv().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_panicking_modifier_fails_the_build() {
    let h = harness(200);
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        h.service.fetch(
            RequestBuilder::new("https://example.com/a").modify_request(|_| panic!("modifier bug")),
        ),
    )
    .await
    .expect("handler called");

    assert!(matches!(
        result,
        Err(ServiceError::Unrecoverable(ref cause))
            if cause.domain == ErrorDomain::Build && cause.message.contains("modifier bug")
    ));
    let snapshot = wait_for(&h.service, |s| s.pending_builds == 0).await;
    assert_eq!(snapshot.spinner_visible, 0);
    assert!(h.transport.sent().is_empty());
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_transport_completes_and_hides_spinner() {
    let h = harness_with(FakeTransport::panicking(), immediate_dismissal(&[]));
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        h.service.fetch(RequestBuilder::new("https://example.com/a")),
    )
    .await
    .expect("handler called");

    assert!(matches!(
        result,
        Err(ServiceError::Unrecoverable(ref cause)) if cause.domain == ErrorDomain::Transport
    ));
    let snapshot = wait_for(&h.service, |s| s.in_transport == 0 && s.spinner_visible == 0).await;
    assert_eq!(snapshot, DispatcherSnapshot::default());
    assert_eq!(h.spinner.shows.load(Ordering::SeqCst), 1);
    assert_eq!(h.spinner.pops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dependencies_fraud_supplier_and_default_headers_applied() {
    let transport = Arc::new(FakeTransport::new(200, ""));
    let mut fraud_headers = HeadersMap::new();
    fraud_headers.insert(header_names::DEVICE_ID.to_string(), "dev-1".to_string());

    let mut settings = immediate_dismissal(&[]);
    settings
        .default_headers
        .insert("Accept".to_string(), "application/json".to_string());

    let dependencies = Dependencies::builder()
        .transport(transport.clone())
        .spinner(Arc::new(CountingSpinner::default()))
        .fraud_prevention(Arc::new(StaticFraudPrevention::from_map(fraud_headers)))
        .build();
    let service = NetworkService::new(settings, dependencies);

    service
        .fetch(RequestBuilder::new("https://example.com/a"))
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent[0].header(header_names::DEVICE_ID), Some("dev-1"));
    assert_eq!(sent[0].header("accept"), Some("application/json"));
}

#[tokio::test]
async fn test_anti_fraud_toggle_off_in_settings() {
    let transport = Arc::new(FakeTransport::new(200, ""));
    let mut fraud_headers = HeadersMap::new();
    fraud_headers.insert(header_names::DEVICE_ID.to_string(), "dev-1".to_string());

    let settings = NetworkSettings {
        include_anti_fraud_headers: false,
        ..immediate_dismissal(&[])
    };
    let dependencies = Dependencies::builder()
        .transport(transport.clone())
        .spinner(Arc::new(CountingSpinner::default()))
        .fraud_prevention(Arc::new(StaticFraudPrevention::from_map(fraud_headers)))
        .build();
    let service = NetworkService::new(settings, dependencies);

    service
        .fetch(RequestBuilder::new("https://example.com/a"))
        .await
        .unwrap();

    assert_eq!(transport.sent()[0].header(header_names::DEVICE_ID), None);
}

#[tokio::test]
async fn test_dropping_service_still_delivers_in_flight() {
    let h = harness(200);
    let (tx, mut rx) = mpsc::unbounded_channel();

    h.service
        .data(RequestBuilder::new("https://example.com/a"), move |result| {
            let _ = tx.send(result);
        });
    drop(h.service);

    assert!(rx.recv().await.unwrap().is_ok());
}
