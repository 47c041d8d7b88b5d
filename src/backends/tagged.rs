use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};
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

/// Backend with a single kernel that keeps scoped instances keyed by the scope they belong to.
///
/// The handle only carries a tag; the instances stay in the backend until the scope ends.
/// A handle dropped without [`ResolutionBackend::end_scope`] releases its entry without calling finalizers.
pub struct TaggedScopeBackend {
    kernel: Kernel,
    scopes: Arc<Mutex<Scopes>>,
    max_active_scopes: Option<usize>,
}

type Scopes = BTreeMap<ScopeId, Arc<Mutex<Cache>>>;

struct ScopeTag {
    owner: ScopeId,
    id: ScopeId,
    scopes: Weak<Mutex<Scopes>>,
}

impl Drop for ScopeTag {
    fn drop(&mut self) {
        let Some(scopes) = self.scopes.upgrade() else {
            return;
        };
        let abandoned = scopes.lock().remove(&self.id);
        if abandoned.is_some() {
            warn!(backend = "tagged", scope = %self.id, "Scope dropped without being ended, finalizers skipped");
        }
    }
}

impl TaggedScopeBackend {
    #[inline]
    #[must_use]
    pub fn new(registry: impl Into<Registry>) -> Self {
        Self {
            kernel: Kernel::new(registry.into(), "tagged"),
            scopes: Arc::new(Mutex::new(BTreeMap::new())),
            max_active_scopes: None,
        }
    }

    /// Limits the number of scopes that can be active at the same time.
    /// [`ResolutionBackend::begin_scope`] fails with [`ScopeErrorKind::AllocationFailure`] over the limit.
    #[inline]
    #[must_use]
    pub fn with_max_active_scopes(mut self, max_active_scopes: usize) -> Self {
        self.max_active_scopes = Some(max_active_scopes);
        self
    }

    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        self.kernel.registry()
    }

    #[inline]
    #[must_use]
    pub fn active_scopes(&self) -> usize {
        self.scopes.lock().len()
    }

    /// Calls finalizers for resolved singletons in LIFO order.
    /// Also called when the backend is dropped.
    #[inline]
    pub fn close(&self) {
        self.kernel.close();
    }

    fn cache(&self, scope: &ScopeHandle) -> Option<Arc<Mutex<Cache>>> {
        scope.state::<ScopeTag>().filter(|tag| tag.owner == self.kernel.id())?;
        self.scopes.lock().get(&scope.id()).cloned()
    }
}

impl ResolutionBackend for TaggedScopeBackend {
    fn name(&self) -> &'static str {
        "tagged"
    }

    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind> {
        let mut scopes = self.scopes.lock();
        if let Some(max_active_scopes) = self.max_active_scopes {
            if scopes.len() >= max_active_scopes {
                let err = ScopeErrorKind::AllocationFailure {
                    backend: self.name(),
                    reason: format!("active scopes limit ({max_active_scopes}) reached"),
                };
                error!("{}", err);
                return Err(err);
            }
        }

        let id = ScopeId::next();
        scopes.insert(id, Arc::new(Mutex::new(Cache::new())));
        let scope = ScopeHandle::with_id(
            id,
            ScopeTag {
                owner: self.kernel.id(),
                id,
                scopes: Arc::downgrade(&self.scopes),
            },
        );
        debug!(backend = self.name(), scope = %scope.id(), active_scopes = scopes.len(), "Scope begun");
        Ok(scope)
    }

    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        let Some(cache) = self.cache(scope).filter(|_| scope.is_active()) else {
            error!(backend = self.name(), scope = %scope.id(), dependency = type_info.name, "Scope isn't active");
            return Err(ResolveErrorKind::NoActiveScope);
        };
        self.kernel.resolve(&cache, scope.id(), type_info, None)
    }

    fn end_scope(&self, scope: &ScopeHandle) {
        if scope.state::<ScopeTag>().filter(|tag| tag.owner == self.kernel.id()).is_none() {
            warn!(backend = self.name(), scope = %scope.id(), "Scope belongs to another backend");
            return;
        }
        if !scope.mark_disposed() {
            warn!(backend = self.name(), scope = %scope.id(), "Scope already disposed");
            return;
        }

        let Some(cache) = self.scopes.lock().remove(&scope.id()) else {
            return;
        };
        self.kernel.finalize(&cache, scope.id());
        debug!(backend = self.name(), scope = %scope.id(), "Scope ended");
    }

    fn verify(&self) -> Result<(), VerifyErrorKind> {
        self.kernel.verify(self)
    }
}
