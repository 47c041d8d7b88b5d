use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    Extension, Router,
};
use std::{future::Future, sync::Arc};
use tracing::error;

use crate::{activation::ActivationProvider, errors::ResolveErrorKind, middleware::RequestScopeLayer};

tokio::task_local! {
    static CURRENT_REQUEST: Arc<Parts>;
}

#[derive(Debug, thiserror::Error)]
pub enum ActivateErrorKind {
    #[error("Activation provider not found in extensions")]
    ProviderNotFound,
    #[error(transparent)]
    Resolve(ResolveErrorKind),
}

impl ActivateErrorKind {
    #[inline]
    #[allow(clippy::unused_self)]
    const fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    #[inline]
    fn body(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for ActivateErrorKind {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        (status, body).into_response()
    }
}

/// Extractor of a controller activated from the request scope.
pub struct Activate<Dep>(pub Arc<Dep>);

#[allow(clippy::manual_async_fn)]
impl<S, Dep> FromRequestParts<S> for Activate<Dep>
where
    Dep: Send + Sync + 'static,
{
    type Rejection = ActivateErrorKind;

    fn from_request_parts(parts: &mut Parts, _state: &S) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let res = match parts.extensions.get::<ActivationProvider>() {
            Some(provider) => match provider.controller() {
                Ok(dep) => Ok(Self(dep)),
                Err(err) => Err(Self::Rejection::Resolve(err)),
            },
            None => Err(Self::Rejection::ProviderNotFound),
        };

        async move { res }
    }
}

/// Middleware resolved from the request scope on every request.
///
/// Installed with [`axum::middleware::from_fn`] and [`activated`]:
/// `router.layer(from_fn(activated::<RequestLogging>))`.
pub trait ScopedMiddleware: Send + Sync + 'static {
    fn invoke(self: Arc<Self>, request: Request, next: Next) -> impl Future<Output = Response> + Send;
}

/// Activates `M` for the current request and runs it.
///
/// Activation failures short-circuit the request with `500 Internal Server Error`.
pub async fn activated<M: ScopedMiddleware>(Extension(provider): Extension<ActivationProvider>, request: Request, next: Next) -> Response {
    match provider.middleware::<M>() {
        Ok(middleware) => middleware.invoke(request, next).await,
        Err(err) => {
            error!(%err, "Middleware not activated");
            ActivateErrorKind::Resolve(err).into_response()
        }
    }
}

/// Gives access to the request being handled on the current flow.
///
/// Meant to be cross-wired into the backend, so scoped services can read the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContextAccessor;

impl RequestContextAccessor {
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<Arc<Parts>> {
        CURRENT_REQUEST.try_with(Arc::clone).ok()
    }
}

/// Publishes the request parts for [`RequestContextAccessor`] while the rest of the stack runs.
pub async fn publish_request_context(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let context = Arc::new(parts.clone());

    CURRENT_REQUEST.scope(context, next.run(Request::from_parts(parts, body))).await
}

/// Installs the request scope, the request context and the activation provider on `router`.
#[inline]
pub fn setup<S>(router: Router<S>, provider: ActivationProvider) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let backend = provider.backend().clone();

    router
        .layer(from_fn(publish_request_context))
        .layer(Extension(provider))
        .layer(RequestScopeLayer::new(backend))
}
