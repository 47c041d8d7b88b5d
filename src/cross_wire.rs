use std::{marker::PhantomData, sync::Arc};
use tracing::debug;

use crate::{
    any::{Instance, TypeInfo},
    config::Config,
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    host::HostServices,
    instantiator::ErasedInstantiator,
    registry::RegistryBuilder,
    resolver::Resolver,
};

/// Instantiator that asks the host for the instance on every resolution.
struct HostLookup<F, Dep> {
    lookup: F,
    _dep: PhantomData<fn() -> Dep>,
}

impl<F, Dep> ErasedInstantiator for HostLookup<F, Dep>
where
    F: Fn() -> Option<Arc<Dep>> + Send + Sync,
    Dep: Send + Sync + 'static,
{
    fn instantiate(&self, _resolver: &Resolver<'_>) -> Result<Instance, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> {
        match (self.lookup)() {
            Some(dependency) => {
                debug!("Found in host");
                Ok(dependency)
            }
            None => Err(InstantiatorErrorKind::Factory(InstantiateErrorKind::HostServiceMissing {
                type_info: TypeInfo::of::<Dep>(),
            })),
        }
    }
}

impl RegistryBuilder {
    /// Makes a host-owned service resolvable from the backend.
    ///
    /// The service is looked up in `host` lazily, at resolution time. The backend neither caches
    /// nor finalizes it, so it can be injected into dependencies of any lifetime.
    ///
    /// # Errors
    /// Resolution fails with [`InstantiateErrorKind::HostServiceMissing`] if `host` doesn't have the service.
    #[inline]
    #[must_use]
    pub fn cross_wire<Dep: Send + Sync + 'static>(self, host: HostServices) -> Self {
        self.cross_wire_with(move || host.get::<Dep>())
    }

    /// Same as [`Self::cross_wire`], with an arbitrary host lookup.
    #[must_use]
    pub fn cross_wire_with<Dep, F>(mut self, lookup: F) -> Self
    where
        Dep: Send + Sync + 'static,
        F: Fn() -> Option<Arc<Dep>> + Send + Sync + 'static,
    {
        self.add_instantiator(
            TypeInfo::of::<Dep>(),
            Arc::new(HostLookup {
                lookup,
                _dep: PhantomData,
            }),
            Config::host_owned(),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        backend::{ResolutionBackend, ResolutionBackendExt as _},
        backends::ContainerBackend,
        config::{Lifetime::*, Ownership},
        errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
        host::{HostServices, LoggerFactory},
        inject::Inject,
        registry::RegistryBuilder,
        TypeInfo,
    };

    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };
    use tracing_test::traced_test;

    struct HomeController(Arc<LoggerFactory>);

    #[test]
    #[traced_test]
    fn test_cross_wire() {
        let factory = Arc::new(LoggerFactory::new("shop"));
        let mut host = HostServices::new();
        host.insert_arc(factory.clone());

        let backend = ContainerBackend::new(
            RegistryBuilder::new()
                .cross_wire::<LoggerFactory>(host)
                .provide(|Inject(factory): Inject<LoggerFactory>| Ok(HomeController(factory)), Scoped),
        );
        let config = backend.registry().config(&TypeInfo::of::<LoggerFactory>()).unwrap();
        assert_eq!((config.lifetime, config.ownership), (Singleton, Ownership::Host));

        let scope = backend.begin_scope().unwrap();

        assert!(Arc::ptr_eq(&backend.get::<LoggerFactory>(&scope).unwrap(), &factory));
        assert!(Arc::ptr_eq(&backend.get::<HomeController>(&scope).unwrap().0, &factory));
    }

    #[test]
    #[traced_test]
    fn test_cross_wire_lazy_and_not_finalized() {
        let lookups = Arc::new(AtomicU8::new(0));
        let finalized = Arc::new(AtomicU8::new(0));
        let factory = Arc::new(LoggerFactory::new("shop"));

        let backend = ContainerBackend::new(
            RegistryBuilder::new()
                .cross_wire_with({
                    let lookups = lookups.clone();
                    let factory = factory.clone();
                    move || {
                        lookups.fetch_add(1, Ordering::SeqCst);
                        Some(factory.clone())
                    }
                })
                .add_finalizer({
                    let finalized = finalized.clone();
                    move |_: Arc<LoggerFactory>| {
                        finalized.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>(())
                    }
                }),
        );
        assert!(logs_contain("Finalizer ignored"));
        assert_eq!(lookups.load(Ordering::SeqCst), 0);

        let scope = backend.begin_scope().unwrap();
        let _ = backend.get::<LoggerFactory>(&scope).unwrap();
        let _ = backend.get::<LoggerFactory>(&scope).unwrap();
        backend.end_scope(&scope);
        backend.close();

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(finalized.load(Ordering::SeqCst), 0);
        assert_eq!(Arc::strong_count(&factory), 2);
    }

    #[test]
    #[traced_test]
    fn test_cross_wire_missing() {
        let backend = ContainerBackend::new(RegistryBuilder::new().cross_wire::<LoggerFactory>(HostServices::new()));
        let scope = backend.begin_scope().unwrap();

        let err = backend.get::<LoggerFactory>(&scope).unwrap_err();

        assert!(matches!(
            err,
            ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(InstantiateErrorKind::HostServiceMissing { .. }))
        ));
        assert!(logs_contain("not found"));
    }

    #[test]
    #[traced_test]
    fn test_verify_skips_host_owned() {
        let backend = ContainerBackend::new(RegistryBuilder::new().cross_wire::<LoggerFactory>(HostServices::new()));

        assert!(backend.verify().is_ok());
    }
}
