use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    any::{downcast, Instance, TypeInfo},
    backends::kernel::Kernel,
    cache::Cache,
    config::Lifetime,
    errors::ResolveErrorKind,
    scope::ScopeId,
};

/// Resolves the dependencies of one factory call against the scope it runs in.
///
/// It's handed to [`crate::DependencyResolver`] implementations and remembers
/// which registrations are being constructed, so cycles and captive dependencies are reported
/// instead of overflowing the stack or leaking a scoped instance into a singleton.
pub struct Resolver<'a> {
    pub(crate) kernel: &'a Kernel,
    pub(crate) scoped: &'a Mutex<Cache>,
    pub(crate) scope_id: ScopeId,
    pub(crate) type_info: TypeInfo,
    pub(crate) lifetime: Lifetime,
    pub(crate) parent: Option<&'a Resolver<'a>>,
}

impl Resolver<'_> {
    #[inline]
    #[must_use]
    pub const fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    /// Type being constructed by the factory this resolver was created for.
    #[inline]
    #[must_use]
    pub const fn dependent(&self) -> TypeInfo {
        self.type_info
    }

    /// Resolves a type-erased dependency.
    ///
    /// # Errors
    /// Same as [`crate::ResolutionBackend::resolve`], plus [`ResolveErrorKind::Cycle`] and
    /// [`ResolveErrorKind::CaptiveDependency`]
    #[inline]
    pub fn resolve(&self, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        self.kernel.resolve(self.scoped, self.scope_id, type_info, Some(self))
    }

    /// Resolves a dependency and downcasts it.
    ///
    /// # Errors
    /// Same as [`Self::resolve`], plus [`ResolveErrorKind::IncorrectType`]
    pub fn get<Dep: Send + Sync + 'static>(&self) -> Result<Arc<Dep>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<Dep>();
        let instance = self.resolve(type_info)?;
        downcast(instance).map_err(|actual| ResolveErrorKind::IncorrectType {
            expected: type_info,
            actual,
        })
    }

    /// Chain of types being constructed, from the outermost one to this resolver's own.
    #[must_use]
    pub(crate) fn path(&self) -> Vec<TypeInfo> {
        let mut path = Vec::new();
        let mut current = Some(self);
        while let Some(resolver) = current {
            path.push(resolver.type_info);
            current = resolver.parent;
        }
        path.reverse();
        path
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_constructing(&self, type_info: &TypeInfo) -> bool {
        let mut current = Some(self);
        while let Some(resolver) = current {
            if resolver.type_info == *type_info {
                return true;
            }
            current = resolver.parent;
        }
        false
    }

    /// Nearest type under construction that outlives any scope.
    #[must_use]
    pub(crate) fn singleton_owner(&self) -> Option<TypeInfo> {
        let mut current = Some(self);
        while let Some(resolver) = current {
            if resolver.lifetime == Lifetime::Singleton {
                return Some(resolver.type_info);
            }
            current = resolver.parent;
        }
        None
    }
}
