use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::kernel::Kernel;
use crate::{
    any::{Instance, TypeInfo},
    backend::ResolutionBackend,
    cache::Cache,
    errors::{ResolveErrorKind, ScopeErrorKind, VerifyErrorKind},
    registry::Registry,
    scope::{ScopeHandle, ScopeId},
};

/// Backend that opens a nested child container for every scope.
///
/// Singletons live in the root container and are shared by all children;
/// scoped instances live in the child and are finalized when it's disposed.
pub struct ContainerBackend {
    kernel: Kernel,
}

struct ChildContainer {
    owner: ScopeId,
    cache: Mutex<Cache>,
}

impl ContainerBackend {
    #[inline]
    #[must_use]
    pub fn new(registry: impl Into<Registry>) -> Self {
        Self {
            kernel: Kernel::new(registry.into(), "container"),
        }
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        self.kernel.registry()
    }

    /// Closes the root container, calling finalizers for resolved singletons in LIFO order.
    ///
    /// # Warning
    /// This method can be called multiple times, but it will only call finalizers for singletons
    /// that were resolved since the last call. It's also called when the backend is dropped.
    #[inline]
    pub fn close(&self) {
        self.kernel.close();
    }

    fn child<'a>(&self, scope: &'a ScopeHandle) -> Option<&'a ChildContainer> {
        scope
            .state::<ChildContainer>()
            .filter(|child| child.owner == self.kernel.id())
    }
}

impl ResolutionBackend for ContainerBackend {
    fn name(&self) -> &'static str {
        "container"
    }

    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind> {
        let scope = ScopeHandle::new(ChildContainer {
            owner: self.kernel.id(),
            cache: Mutex::new(Cache::new()),
        });
        debug!(backend = self.name(), scope = %scope.id(), "Scope begun");
        Ok(scope)
    }

    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        let Some(child) = self.child(scope).filter(|_| scope.is_active()) else {
            error!(backend = self.name(), scope = %scope.id(), dependency = type_info.name, "Scope isn't active");
            return Err(ResolveErrorKind::NoActiveScope);
        };
        self.kernel.resolve(&child.cache, scope.id(), type_info, None)
    }

    fn end_scope(&self, scope: &ScopeHandle) {
        let Some(child) = self.child(scope) else {
            warn!(backend = self.name(), scope = %scope.id(), "Scope belongs to another backend");
            return;
        };
        if !scope.mark_disposed() {
            warn!(backend = self.name(), scope = %scope.id(), "Scope already disposed");
            return;
        }

        self.kernel.finalize(&child.cache, scope.id());
        debug!(backend = self.name(), scope = %scope.id(), "Scope ended");
    }

    fn verify(&self) -> Result<(), VerifyErrorKind> {
        self.kernel.verify(self)
    }
}
