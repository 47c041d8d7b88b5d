use std::{future::Future, sync::Arc};
use tokio::task::JoinHandle;

use crate::{errors::ResolveErrorKind, scope::ScopeHandle};

tokio::task_local! {
    static CURRENT_SCOPE: Arc<ScopeHandle>;
}

/// Ambient storage of the scope that is active on the current logical flow.
///
/// The association is bound to the future (task), not to the worker thread polling it,
/// so it survives suspension points and resumption on another thread of the runtime.
/// A plain [`tokio::spawn`] starts a new flow without a scope; use [`Self::spawn`]
/// or [`Self::fork`] to carry the scope into child tasks.
pub struct ScopeContext;

impl ScopeContext {
    /// Runs `future` with `scope` published as the current scope.
    ///
    /// Publication nested into another one shadows the outer scope for `future` only.
    #[inline]
    pub async fn publish<F: Future>(scope: Arc<ScopeHandle>, future: F) -> F::Output {
        CURRENT_SCOPE.scope(scope, future).await
    }

    /// Runs `f` with `scope` published as the current scope.
    #[inline]
    pub fn publish_sync<R>(scope: Arc<ScopeHandle>, f: impl FnOnce() -> R) -> R {
        CURRENT_SCOPE.sync_scope(scope, f)
    }

    /// Gets the scope published on the current flow.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoActiveScope`] if no scope is published on the current flow
    #[inline]
    pub fn current() -> Result<Arc<ScopeHandle>, ResolveErrorKind> {
        Self::try_current().ok_or(ResolveErrorKind::NoActiveScope)
    }

    #[inline]
    #[must_use]
    pub fn try_current() -> Option<Arc<ScopeHandle>> {
        CURRENT_SCOPE.try_with(Arc::clone).ok()
    }

    /// Binds `future` to the scope of the current flow, if any.
    ///
    /// The returned future observes the same scope wherever it's polled.
    pub fn fork<F: Future>(future: F) -> impl Future<Output = F::Output> {
        let scope = Self::try_current();
        async move {
            match scope {
                Some(scope) => CURRENT_SCOPE.scope(scope, future).await,
                None => future.await,
            }
        }
    }

    /// Spawns a child task that observes the scope of the current flow.
    pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(Self::fork(future))
    }

    /// Runs a blocking closure on the blocking pool with the scope of the current flow.
    pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let scope = Self::try_current();
        tokio::task::spawn_blocking(move || match scope {
            Some(scope) => CURRENT_SCOPE.sync_scope(scope, f),
            None => f(),
        })
    }
}
