use parking_lot::Mutex;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, error, info_span, warn};

use crate::{
    any::{self, downcast, Instance, TypeInfo},
    backend::ResolutionBackend,
    errors::{ResolveErrorKind, ScopeErrorKind},
    scope::{ScopeHandle, ScopeId},
};

/// Hand-written object graph of the application.
///
/// No registrations, no reflection: the root builds whatever it knows how to build
/// and returns `None` for everything else.
pub trait CompositionRoot: Send + Sync + 'static {
    /// Builds an instance of `type_info`. Use [`CompositionScope::scoped`] for per-scope instances.
    fn compose(&self, scope: &CompositionScope, type_info: TypeInfo) -> Option<Instance>;

    /// Releases the scoped instances when the scope ends.
    #[allow(unused_variables)]
    fn dispose(&self, scope: &CompositionScope) {}
}

/// Per-scope storage of a [`CompositionRoot`].
pub struct CompositionScope {
    owner: ScopeId,
    instances: Mutex<any::Map>,
}

impl CompositionScope {
    /// Gets the instance of `T` created for this scope, creating it with `f` on first use.
    ///
    /// The lock isn't held while `f` runs, so `f` may ask the scope for other instances.
    /// If two flows race, the first stored instance is returned to both.
    pub fn scoped<T: Send + Sync + 'static>(&self, f: impl FnOnce() -> T) -> Arc<T> {
        let type_info = TypeInfo::of::<T>();
        if let Some(instance) = self.get::<T>() {
            return instance;
        }

        let created = Arc::new(f());
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(&type_info).cloned().and_then(|instance| downcast(instance).ok()) {
            return instance;
        }
        instances.insert(type_info, created.clone());
        created
    }

    /// Gets the instance of `T` created for this scope, if any.
    #[inline]
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let instance = self.instances.lock().get(&TypeInfo::of::<T>()).cloned()?;
        downcast(instance).ok()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

/// Backend over a [`CompositionRoot`] (pure DI).
pub struct CompositionRootBackend<R> {
    root: R,
    id: ScopeId,
}

impl<R: CompositionRoot> CompositionRootBackend<R> {
    #[inline]
    #[must_use]
    pub fn new(root: R) -> Self {
        Self { root, id: ScopeId::next() }
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> &R {
        &self.root
    }

    fn scope<'a>(&self, scope: &'a ScopeHandle) -> Option<&'a CompositionScope> {
        scope.state::<CompositionScope>().filter(|state| state.owner == self.id)
    }
}

impl<R: CompositionRoot> ResolutionBackend for CompositionRootBackend<R> {
    fn name(&self) -> &'static str {
        "composition-root"
    }

    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind> {
        let scope = ScopeHandle::new(CompositionScope {
            owner: self.id,
            instances: Mutex::new(any::Map::new()),
        });
        debug!(backend = self.name(), scope = %scope.id(), "Scope begun");
        Ok(scope)
    }

    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        let span = info_span!("resolve", backend = self.name(), dependency = type_info.name, scope = %scope.id());
        let _guard = span.enter();

        let Some(state) = self.scope(scope).filter(|_| scope.is_active()) else {
            error!("Scope isn't active");
            return Err(ResolveErrorKind::NoActiveScope);
        };

        match self.root.compose(state, type_info) {
            Some(_) if !scope.is_active() => {
                warn!("Scope ended while composing");
                Err(ResolveErrorKind::NoActiveScope)
            }
            Some(instance) => {
                debug!("Composed");
                Ok(instance)
            }
            None => {
                let err = ResolveErrorKind::UnregisteredType { type_info };
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn end_scope(&self, scope: &ScopeHandle) {
        let Some(state) = self.scope(scope) else {
            warn!(backend = self.name(), scope = %scope.id(), "Scope belongs to another backend");
            return;
        };
        if !scope.mark_disposed() {
            warn!(backend = self.name(), scope = %scope.id(), "Scope already disposed");
            return;
        }

        if catch_unwind(AssertUnwindSafe(|| self.root.dispose(state))).is_err() {
            error!(backend = self.name(), scope = %scope.id(), "Composition root panicked while disposing scope");
        }
        state.instances.lock().clear();
        debug!(backend = self.name(), scope = %scope.id(), "Scope ended");
    }
}
