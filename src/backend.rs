use std::sync::Arc;

use crate::{
    any::{downcast, Instance, TypeInfo},
    errors::{ResolveErrorKind, ScopeErrorKind, VerifyErrorKind},
    scope::ScopeHandle,
};

/// Capability set every resolution technology implements.
///
/// The host never branches on the concrete backend: it's chosen once at startup
/// and passed around as `Arc<dyn ResolutionBackend>`.
pub trait ResolutionBackend: Send + Sync + 'static {
    /// Name used in logs and errors.
    #[must_use]
    fn name(&self) -> &'static str;

    /// Allocates a new scope.
    ///
    /// # Errors
    /// - Returns [`ScopeErrorKind::AllocationFailure`] if the backend can't allocate scope resources
    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind>;

    /// Resolves an instance of `type_info` against `scope`.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoActiveScope`] if `scope` is already disposed
    /// - Returns [`ResolveErrorKind::UnregisteredType`] if `type_info` has no registration
    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind>;

    /// Releases the scope and everything it owns.
    ///
    /// Idempotent. Finalizer failures are logged by the backend and never propagated.
    fn end_scope(&self, scope: &ScopeHandle);

    /// Checks at startup that every registration can be resolved.
    ///
    /// # Errors
    /// Returns the first registration that can't be resolved
    fn verify(&self) -> Result<(), VerifyErrorKind> {
        Ok(())
    }
}

/// Typed helpers over any backend.
pub trait ResolutionBackendExt: ResolutionBackend {
    /// Resolves `Dep` against `scope` and downcasts it.
    ///
    /// # Errors
    /// Same as [`ResolutionBackend::resolve`], plus [`ResolveErrorKind::IncorrectType`]
    /// if the backend provided a different type
    fn get<Dep: Send + Sync + 'static>(&self, scope: &ScopeHandle) -> Result<Arc<Dep>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<Dep>();
        let instance = self.resolve(scope, type_info)?;
        downcast(instance).map_err(|actual| ResolveErrorKind::IncorrectType {
            expected: type_info,
            actual,
        })
    }
}

impl<T: ResolutionBackend + ?Sized> ResolutionBackendExt for T {}

impl<T: ResolutionBackend + ?Sized> ResolutionBackend for Arc<T> {
    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline]
    fn begin_scope(&self) -> Result<ScopeHandle, ScopeErrorKind> {
        (**self).begin_scope()
    }

    #[inline]
    fn resolve(&self, scope: &ScopeHandle, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        (**self).resolve(scope, type_info)
    }

    #[inline]
    fn end_scope(&self, scope: &ScopeHandle) {
        (**self).end_scope(scope);
    }

    #[inline]
    fn verify(&self) -> Result<(), VerifyErrorKind> {
        (**self).verify()
    }
}
