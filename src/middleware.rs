use axum::http::{Request, Response, StatusCode};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower_layer::Layer;
use tower_service::Service;
use tracing::{debug, error};

use crate::{backend::ResolutionBackend, context::ScopeContext, scope::ScopeHandle, utils::future::BoxFuture};

/// Layer that runs every request inside its own resolution scope.
#[derive(Clone)]
pub struct RequestScopeLayer {
    backend: Arc<dyn ResolutionBackend>,
}

impl RequestScopeLayer {
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn ResolutionBackend>) -> Self {
        Self { backend }
    }
}

impl<S> Layer<S> for RequestScopeLayer {
    type Service = RequestScope<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestScope {
            service,
            backend: self.backend.clone(),
        }
    }
}

/// Begins a scope for the request, publishes it for the inner service and ends it
/// when the response future completes, fails or is dropped.
///
/// If the backend can't allocate a scope, the inner service isn't called and the response is
/// `500 Internal Server Error` with the [`crate::ScopeErrorKind`] in its extensions as `Arc<ScopeErrorKind>`.
#[derive(Clone)]
pub struct RequestScope<S> {
    service: S,
    backend: Arc<dyn ResolutionBackend>,
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for RequestScope<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let scope = match self.backend.begin_scope() {
            Ok(scope) => Arc::new(scope),
            Err(err) => {
                error!(backend = self.backend.name(), %err, "Request scope not allocated");

                let mut response = Response::new(ResBody::default());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response.extensions_mut().insert(Arc::new(err));
                return Box::pin(async move { Ok(response) });
            }
        };
        debug!(backend = self.backend.name(), scope = %scope.id(), "Request scope begun");

        let guard = ScopeGuard::new(self.backend.clone(), scope.clone());
        let future = ScopeContext::publish_sync(scope.clone(), || self.service.call(request));

        Box::pin(async move {
            let _guard = guard;
            ScopeContext::publish(scope, future).await
        })
    }
}

/// Ends the scope on drop.
///
/// Owned by the response future, so completion, failure, panic and cancellation all end the scope.
pub struct ScopeGuard {
    backend: Arc<dyn ResolutionBackend>,
    scope: Arc<ScopeHandle>,
}

impl ScopeGuard {
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn ResolutionBackend>, scope: Arc<ScopeHandle>) -> Self {
        Self { backend, scope }
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Arc<ScopeHandle> {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.backend.end_scope(&self.scope);
        debug!(backend = self.backend.name(), scope = %self.scope.id(), "Request scope ended");
    }
}
