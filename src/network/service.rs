//! Request dispatcher
//!
//! All dispatcher state (pending builds, handlers, spinner count) lives in a
//! single control task fed by an unbounded command channel. Builds and
//! transport sends run on spawned tasks and report back through the same
//! channel, so nothing here is behind a lock and every handler and spinner
//! call happens on the control task.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::classifier::ResponseClassifier;
use super::error::{ErrorCause, ErrorDomain, ServiceError};
use super::settings::{Dependencies, NetworkSettings};
use crate::fraud::FraudPrevention;
use crate::http::{BuildError, HttpRequest, RequestBuilder, Response};
use crate::observability::{Metrics, MetricsSnapshot};
use crate::spinner::SpinnerConsumer;
use crate::transport::{self, Transport, TransportError};

pub type RequestId = Uuid;

/// Completion callback; invoked exactly once, on the control task
pub type Handler = Box<dyn FnOnce(Result<Response, ServiceError>) + Send + 'static>;

/// Point-in-time view of the control task's bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    pub pending_builds: usize,
    pub in_transport: usize,
    pub spinner_visible: usize,
}

/// Sender carried by each request through its lifecycle; the control task
/// holds none itself, so it stops once the service and every request are gone
type Reply = mpsc::UnboundedSender<Command>;

enum Command {
    Dispatch {
        id: RequestId,
        builder: RequestBuilder,
        handler: Handler,
        reply: Reply,
    },
    Built {
        id: RequestId,
        result: Result<HttpRequest, BuildError>,
        reply: Reply,
    },
    Completed {
        id: RequestId,
        request: HttpRequest,
        result: transport::Result<Response>,
        reply: Reply,
    },
    DismissSpinner,
    Cancel,
    Inspect(oneshot::Sender<DispatcherSnapshot>),
}

/// Build, send and classify requests on behalf of the caller
///
/// Must be created inside a tokio runtime. Dropping the service lets requests
/// already in flight finish and deliver; the control task exits afterwards.
pub struct NetworkService {
    commands: mpsc::UnboundedSender<Command>,
    transport: Arc<dyn Transport>,
    fraud_prevention: Option<Arc<dyn FraudPrevention>>,
    settings: NetworkSettings,
    metrics: Arc<Metrics>,
}

impl NetworkService {
    pub fn new(settings: NetworkSettings, dependencies: Dependencies) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let metrics = Arc::new(Metrics::new());

        let classifier = ResponseClassifier::new(dependencies.audit, dependencies.analytics)
            .with_default_shuttered(settings.default_shuttered.clone());

        let control = ControlTask {
            transport: dependencies.transport.clone(),
            classifier,
            spinner: SpinnerConsumer::new(
                dependencies.spinner,
                settings.spinner_policy.clone(),
            ),
            pending: HashMap::new(),
            handlers: HashMap::new(),
            in_transport: HashMap::new(),
            metrics: metrics.clone(),
        };
        tokio::spawn(control.run(receiver));

        info!(
            anti_fraud = settings.include_anti_fraud_headers,
            base_url = ?settings.base_url.as_ref().map(|u| u.as_str()),
            "Network service started"
        );

        Self {
            commands,
            transport: dependencies.transport,
            fraud_prevention: dependencies.fraud_prevention,
            settings,
            metrics,
        }
    }

    /// Builder for `path`, resolved against the configured base URL if any
    pub fn request(&self, path: &str) -> RequestBuilder {
        match &self.settings.base_url {
            Some(base) => RequestBuilder::relative(base, path),
            None => RequestBuilder::new(path),
        }
    }

    /// Dispatch `builder`; `handler` receives the single outcome
    ///
    /// The handler normally runs on the control task. If that task is
    /// already gone the handler is called right here, on the caller's
    /// thread, with an `Unrecoverable` error.
    pub fn data<F>(&self, builder: RequestBuilder, handler: F) -> RequestId
    where
        F: FnOnce(Result<Response, ServiceError>) + Send + 'static,
    {
        let id = Uuid::now_v7();
        let builder = self.apply_defaults(builder);
        debug!(%id, method = %builder.http_method(), url = builder.url(), "Dispatching request");

        let command = Command::Dispatch {
            id,
            builder,
            handler: Box::new(handler),
            reply: self.commands.clone(),
        };
        if let Err(mpsc::error::SendError(command)) = self.commands.send(command) {
            error!(%id, "Dispatcher control task is gone");
            if let Command::Dispatch { handler, .. } = command {
                handler(Err(stopped()));
            }
        }
        id
    }

    /// Dispatch and await the outcome
    pub async fn fetch(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.data(builder, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or_else(|_| Err(stopped()))
    }

    /// Abandon outstanding work
    ///
    /// Requests still building complete immediately as cancelled. Requests
    /// already handed to the transport complete with whatever the transport
    /// reports.
    pub fn cancel_requests(&self) {
        info!("Cancelling outstanding requests");
        self.transport.cancel_all();
        let _ = self.commands.send(Command::Cancel);
    }

    pub async fn snapshot(&self) -> Option<DispatcherSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Inspect(tx)).ok()?;
        rx.await.ok()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    fn apply_defaults(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if !builder.has_fraud_prevention() {
            if let Some(supplier) = &self.fraud_prevention {
                builder = builder.fraud_prevention(supplier.clone());
            }
        }
        if !builder.has_preliminary_headers() && !self.settings.default_headers.is_empty() {
            builder = builder.preliminary_headers(self.settings.default_headers.clone());
        }
        if !self.settings.include_anti_fraud_headers {
            builder = builder.include_anti_fraud_headers(false);
        }
        builder
    }
}

fn stopped() -> ServiceError {
    ServiceError::Unrecoverable(ErrorCause::new(
        ErrorDomain::Cancelled,
        0,
        "dispatcher stopped",
    ))
}

fn cancelled() -> ServiceError {
    ServiceError::Unrecoverable(ErrorCause::new(
        ErrorDomain::Cancelled,
        0,
        "request cancelled before it was sent",
    ))
}

struct ControlTask {
    transport: Arc<dyn Transport>,
    classifier: ResponseClassifier,
    spinner: SpinnerConsumer,
    /// Builders kept alive until their build resolves
    pending: HashMap<RequestId, Arc<RequestBuilder>>,
    handlers: HashMap<RequestId, Handler>,
    /// Whether a spinner was shown for each request at the transport
    in_transport: HashMap<RequestId, bool>,
    metrics: Arc<Metrics>,
}

impl ControlTask {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        debug!("Dispatcher control task running");
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Dispatch {
                    id,
                    builder,
                    handler,
                    reply,
                } => self.dispatch(id, builder, handler, reply),
                Command::Built { id, result, reply } => self.built(id, result, reply),
                Command::Completed {
                    id,
                    request,
                    result,
                    reply,
                } => self.completed(id, request, result, reply),
                Command::DismissSpinner => self.spinner.pop_activity(),
                Command::Cancel => self.cancel(),
                Command::Inspect(reply) => {
                    let _ = reply.send(DispatcherSnapshot {
                        pending_builds: self.pending.len(),
                        in_transport: self.in_transport.len(),
                        spinner_visible: self.spinner.visible(),
                    });
                }
            }
        }
        debug!("Dispatcher control task stopped");
    }

    fn dispatch(&mut self, id: RequestId, builder: RequestBuilder, handler: Handler, reply: Reply) {
        self.metrics.request_dispatched();
        let builder = Arc::new(builder);
        self.pending.insert(id, builder.clone());
        self.handlers.insert(id, handler);

        tokio::spawn(async move {
            // Hooks and modifiers are caller code; a panic still resolves the build
            let result = tokio::spawn(async move { builder.build().await })
                .await
                .unwrap_or_else(|e| Err(BuildError::Panicked(join_failure(e))));
            let _ = reply.send(Command::Built {
                id,
                result,
                reply: reply.clone(),
            });
        });
    }

    fn built(&mut self, id: RequestId, result: Result<HttpRequest, BuildError>, reply: Reply) {
        self.pending.remove(&id);

        if !self.handlers.contains_key(&id) {
            debug!(%id, "Build resolved after cancellation, dropping");
            return;
        }

        let request = match result {
            Ok(request) => request,
            Err(e) => {
                warn!(%id, error = %e, "Request build failed");
                self.metrics.build_failed();
                self.finish(id, Err(e.into_service_error()));
                return;
            }
        };

        let shown = self.spinner.show_if_required(&request.url);
        self.in_transport.insert(id, shown);

        let transport = self.transport.clone();
        tokio::spawn(async move {
            let sent = request.clone();
            let result = tokio::spawn(async move { transport.send(sent).await })
                .await
                .unwrap_or_else(|e| {
                    Err(TransportError::RequestFailed(format!(
                        "transport panicked: {}",
                        join_failure(e)
                    )))
                });
            let _ = reply.send(Command::Completed {
                id,
                request,
                result,
                reply: reply.clone(),
            });
        });
    }

    fn completed(
        &mut self,
        id: RequestId,
        request: HttpRequest,
        result: transport::Result<Response>,
        reply: Reply,
    ) {
        if self.in_transport.remove(&id) == Some(true) {
            self.schedule_dismissal(&request, reply);
        }

        if !self.handlers.contains_key(&id) {
            debug!(%id, "Late completion with no waiting handler, ignoring");
            return;
        }

        let outcome = match result {
            Ok(response) => {
                let outcome = self.classifier.classify(&request, response);
                self.metrics.response_classified(outcome.is_ok());
                outcome
            }
            Err(e) => {
                warn!(%id, url = %request.url, error = %e, "Transport failed");
                self.metrics.transport_failed();
                Err(self.classifier.classify_error(ErrorCause::from(&e)))
            }
        };

        self.finish(id, outcome);
    }

    fn cancel(&mut self) {
        let building: Vec<RequestId> = self.pending.keys().copied().collect();
        debug!(
            building = building.len(),
            in_transport = self.in_transport.len(),
            "Cancel requested"
        );
        for id in building {
            self.finish(id, Err(cancelled()));
        }
    }

    fn schedule_dismissal(&mut self, request: &HttpRequest, reply: Reply) {
        let delay = self.spinner.dismissal_delay_for(&request.url);
        if delay.is_zero() {
            self.spinner.pop_activity();
            return;
        }

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = reply.send(Command::DismissSpinner);
        });
    }

    fn finish(&mut self, id: RequestId, outcome: Result<Response, ServiceError>) {
        match self.handlers.remove(&id) {
            Some(handler) => deliver(id, handler, outcome),
            None => debug!(%id, "Outcome already delivered"),
        }
    }
}

fn join_failure(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn deliver(id: RequestId, handler: Handler, outcome: Result<Response, ServiceError>) {
    match &outcome {
        Ok(response) => debug!(%id, status = ?response.status, "Delivering response"),
        Err(e) => debug!(%id, kind = e.kind(), "Delivering error"),
    }
    if panic::catch_unwind(AssertUnwindSafe(|| handler(outcome))).is_err() {
        error!(%id, "Request handler panicked");
    }
}
