use std::sync::Arc;

use crate::{any::TypeInfo, dependency_resolver::DependencyResolver, resolver::Resolver, ResolveErrorKind};

/// Dependency of a factory, resolved from the same scope with its own registered lifetime.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    type Error = ResolveErrorKind;

    fn resolve(resolver: &Resolver<'_>) -> Result<Self, Self::Error> {
        resolver.get().map(Self)
    }

    fn type_info() -> TypeInfo {
        TypeInfo::of::<Dep>()
    }
}

/// Optional dependency: `None` if the type isn't registered.
pub struct InjectOptional<Dep>(pub Option<Arc<Dep>>);

impl<Dep: Send + Sync + 'static> DependencyResolver for InjectOptional<Dep> {
    type Error = ResolveErrorKind;

    fn resolve(resolver: &Resolver<'_>) -> Result<Self, Self::Error> {
        match resolver.get() {
            Ok(dependency) => Ok(Self(Some(dependency))),
            Err(ResolveErrorKind::UnregisteredType { type_info }) if type_info == TypeInfo::of::<Dep>() => Ok(Self(None)),
            Err(err) => Err(err),
        }
    }

    fn type_info() -> TypeInfo {
        TypeInfo::of::<Dep>()
    }
}
