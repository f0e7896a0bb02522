//! Typed results on top of the dispatcher
//!
//! A [`ResultTransformer`] turns the dispatcher's
//! `Result<Response, ServiceError>` into a decoded model or an
//! application-specific error. [`DataFetcher`] and [`DataPoster`] bundle a
//! transformer with a [`NetworkService`].

use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use crate::http::{RequestBuilder, Response};
use crate::network::{NetworkService, RequestId, ServiceError};

/// Maps the shared taxonomy onto an application error type
pub trait ServiceErrorTransformer<E>: Send + Sync {
    fn transform(&self, error: ServiceError) -> E;
}

/// Passes `ServiceError` through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NonTransformingErrorTransformer;

impl ServiceErrorTransformer<ServiceError> for NonTransformingErrorTransformer {
    fn transform(&self, error: ServiceError) -> ServiceError {
        error
    }
}

impl<E, F> ServiceErrorTransformer<E> for F
where
    F: Fn(ServiceError) -> E + Send + Sync,
{
    fn transform(&self, error: ServiceError) -> E {
        self(error)
    }
}

/// Decodes a JSON body into `D`; a body that does not decode is `MalformedJson`
pub struct ResultTransformer<D, E> {
    errors: Arc<dyn ServiceErrorTransformer<E>>,
    _model: PhantomData<fn() -> D>,
}

impl<D, E> Clone for ResultTransformer<D, E> {
    fn clone(&self) -> Self {
        Self {
            errors: self.errors.clone(),
            _model: PhantomData,
        }
    }
}

impl<D: DeserializeOwned, E> ResultTransformer<D, E> {
    pub fn new(errors: Arc<dyn ServiceErrorTransformer<E>>) -> Self {
        Self {
            errors,
            _model: PhantomData,
        }
    }

    pub fn transform(&self, result: Result<Response, ServiceError>) -> Result<D, E> {
        result
            .and_then(|response| {
                serde_json::from_slice::<D>(&response.body).map_err(|e| {
                    warn!(error = %e, status = ?response.status, "Response body did not decode");
                    ServiceError::MalformedJson
                })
            })
            .map_err(|error| self.errors.transform(error))
    }
}

impl<D: DeserializeOwned> ResultTransformer<D, ServiceError> {
    pub fn non_transforming() -> Self {
        Self::new(Arc::new(NonTransformingErrorTransformer))
    }
}

/// Discards the body of a successful response
pub struct VoidResultTransformer<E> {
    errors: Arc<dyn ServiceErrorTransformer<E>>,
}

impl<E> Clone for VoidResultTransformer<E> {
    fn clone(&self) -> Self {
        Self {
            errors: self.errors.clone(),
        }
    }
}

impl<E> VoidResultTransformer<E> {
    pub fn new(errors: Arc<dyn ServiceErrorTransformer<E>>) -> Self {
        Self { errors }
    }

    pub fn transform(&self, result: Result<Response, ServiceError>) -> Result<(), E> {
        result
            .map(|_| ())
            .map_err(|error| self.errors.transform(error))
    }
}

impl VoidResultTransformer<ServiceError> {
    pub fn non_transforming() -> Self {
        Self::new(Arc::new(NonTransformingErrorTransformer))
    }
}

/// Fetches and decodes a model
pub struct DataFetcher<D, E> {
    service: Arc<NetworkService>,
    transformer: ResultTransformer<D, E>,
}

impl<D, E> DataFetcher<D, E>
where
    D: DeserializeOwned + Send + 'static,
    E: Send + 'static,
{
    pub fn new(service: Arc<NetworkService>, transformer: ResultTransformer<D, E>) -> Self {
        Self {
            service,
            transformer,
        }
    }

    pub async fn fetch(&self, builder: RequestBuilder) -> Result<D, E> {
        let result = self.service.fetch(builder).await;
        self.transformer.transform(result)
    }

    /// Callback form; `handler` runs on the dispatcher's control task
    pub fn data<F>(&self, builder: RequestBuilder, handler: F) -> RequestId
    where
        F: FnOnce(Result<D, E>) + Send + 'static,
    {
        let transformer = self.transformer.clone();
        self.service
            .data(builder, move |result| handler(transformer.transform(result)))
    }

    pub fn cancel_requests(&self) {
        self.service.cancel_requests();
    }
}

/// Sends requests whose success carries no model
pub struct DataPoster<E> {
    service: Arc<NetworkService>,
    transformer: VoidResultTransformer<E>,
}

impl<E: Send + 'static> DataPoster<E> {
    pub fn new(service: Arc<NetworkService>, transformer: VoidResultTransformer<E>) -> Self {
        Self {
            service,
            transformer,
        }
    }

    pub async fn post(&self, builder: RequestBuilder) -> Result<(), E> {
        let result = self.service.fetch(builder).await;
        self.transformer.transform(result)
    }

    pub fn data<F>(&self, builder: RequestBuilder, handler: F) -> RequestId
    where
        F: FnOnce(Result<(), E>) + Send + 'static,
    {
        let transformer = self.transformer.clone();
        self.service
            .data(builder, move |result| handler(transformer.transform(result)))
    }

    pub fn cancel_requests(&self) {
        self.service.cancel_requests();
    }
}

impl DataPoster<ServiceError> {
    pub fn non_transforming(service: Arc<NetworkService>) -> Self {
        Self::new(service, VoidResultTransformer::non_transforming())
    }
}
