use anyhow::anyhow;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info_span, warn};

use crate::{
    any::{Instance, TypeInfo},
    backend::ResolutionBackend,
    cache::{Cache, Resolved, ResolvedSet},
    config::{Lifetime, Ownership},
    errors::{DFSErrorKind, DisposalAnomaly, InstantiatorErrorKind, ResolveErrorKind, VerifyErrorKind},
    finalizer::BoxedFinalizer,
    registry::{Registration, Registry},
    resolver::Resolver,
    scope::ScopeId,
};

/// Resolution machinery shared by the registry-driven backends.
///
/// The kernel owns the frozen registry and the singleton cache; each backend decides
/// where the scoped cache of a scope lives and passes it in.
pub(crate) struct Kernel {
    registry: Registry,
    singletons: Mutex<Cache>,
    root_scope_id: ScopeId,
    backend: &'static str,
}

impl Kernel {
    #[inline]
    #[must_use]
    pub(crate) fn new(registry: Registry, backend: &'static str) -> Self {
        Self {
            registry,
            singletons: Mutex::new(Cache::new()),
            root_scope_id: ScopeId::next(),
            backend,
        }
    }

    /// Identifier of the kernel itself. Scopes remember it to reject handles of another backend.
    #[inline]
    #[must_use]
    pub(crate) const fn id(&self) -> ScopeId {
        self.root_scope_id
    }

    #[inline]
    #[must_use]
    pub(crate) const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn resolve(
        &self,
        scoped: &Mutex<Cache>,
        scope_id: ScopeId,
        type_info: TypeInfo,
        parent: Option<&Resolver<'_>>,
    ) -> Result<Instance, ResolveErrorKind> {
        let span = info_span!("resolve", backend = self.backend, dependency = type_info.name, scope = %scope_id);
        let _guard = span.enter();

        let Some(Registration {
            instantiator,
            finalizer,
            config,
        }) = self.registry.get(&type_info)
        else {
            let err = ResolveErrorKind::UnregisteredType { type_info };
            error!("{}", err);
            return Err(err);
        };

        if let Some(parent) = parent {
            if parent.is_constructing(&type_info) {
                let path = parent.path();
                let err = ResolveErrorKind::Cycle(DFSErrorKind::CyclicDependency {
                    graph: (type_info, path.into_iter().skip_while(|step| *step != type_info).skip(1).chain([type_info]).collect()),
                });
                error!("{}", err);
                return Err(err);
            }
            if config.ownership == Ownership::Backend && config.lifetime == Lifetime::Scoped {
                if let Some(dependent) = parent.singleton_owner() {
                    let err = ResolveErrorKind::CaptiveDependency {
                        dependent,
                        dependent_lifetime: Lifetime::Singleton,
                        dependency: type_info,
                        dependency_lifetime: Lifetime::Scoped,
                    };
                    error!("{}", err);
                    return Err(err);
                }
            }
        }

        let cache = match (config.ownership, config.lifetime) {
            (Ownership::Host, _) | (_, Lifetime::Transient) => None,
            (Ownership::Backend, Lifetime::Singleton) => Some(&self.singletons),
            (Ownership::Backend, Lifetime::Scoped) => Some(scoped),
        };

        if let Some(cache) = cache {
            let guard = cache.lock();
            if guard.is_closed() {
                error!("Scope isn't active");
                return Err(ResolveErrorKind::NoActiveScope);
            }
            if let Some(instance) = guard.get(&type_info) {
                debug!("Found in cache");
                return Ok(instance);
            }
            debug!("Not found in cache");
        }

        let resolver = Resolver {
            kernel: self,
            scoped,
            scope_id,
            type_info,
            lifetime: config.lifetime,
            parent,
        };
        let instance = match instantiator.instantiate(&resolver) {
            Ok(instance) => instance,
            Err(InstantiatorErrorKind::Deps(err)) => {
                error!("{}", err);
                return Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))));
            }
            Err(InstantiatorErrorKind::Factory(err)) => {
                error!("{}", err);
                return Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)));
            }
        };

        if let Some(cache) = cache {
            let mut guard = cache.lock();
            // The scope ended while the factory was running; nothing will finalize the instance later.
            if guard.is_closed() {
                drop(guard);
                warn!("Scope ended while resolving");
                if let Some(finalizer) = finalizer {
                    self.call_finalizer(finalizer, type_info, instance, scope_id);
                }
                return Err(ResolveErrorKind::NoActiveScope);
            }
            // Another flow of the same scope may have finished first; its instance wins.
            if let Some(instance) = guard.get(&type_info) {
                debug!("Resolved concurrently, cached instance kept");
                return Ok(instance);
            }
            guard.insert(type_info, instance.clone());
            debug!("Cached");
            if finalizer.is_some() {
                guard.push_resolved(Resolved {
                    type_info,
                    dependency: instance.clone(),
                });
                debug!("Pushed to resolved set");
            }
        }

        Ok(instance)
    }

    /// Closes the scoped `cache` and calls finalizers of everything resolved into it in LIFO order.
    ///
    /// Instances resolved into the cache after this call are finalized right away.
    /// Failures and panics are logged as [`DisposalAnomaly`] and don't stop the teardown.
    pub(crate) fn finalize(&self, cache: &Mutex<Cache>, scope_id: ScopeId) {
        let resolved_set = cache.lock().close();
        self.finalize_resolved(resolved_set, scope_id);
    }

    fn finalize_resolved(&self, mut resolved_set: ResolvedSet, scope_id: ScopeId) {
        while let Some(Resolved { type_info, dependency }) = resolved_set.pop() {
            let Some(finalizer) = self.registry.get(&type_info).and_then(|registration| registration.finalizer.as_ref()) else {
                continue;
            };
            self.call_finalizer(finalizer, type_info, dependency, scope_id);
        }
    }

    fn call_finalizer(&self, finalizer: &BoxedFinalizer, type_info: TypeInfo, dependency: Instance, scope_id: ScopeId) {
        let result = match catch_unwind(AssertUnwindSafe(|| finalizer.finalize(dependency))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("Box<dyn Any>");
                Err(anyhow!("panicked: {message}"))
            }
        };

        match result {
            Ok(()) => debug!(scope = %scope_id, dependency = type_info.name, "Finalizer called"),
            Err(source) => {
                let anomaly = DisposalAnomaly {
                    scope_id,
                    type_info,
                    source,
                };
                error!(backend = self.backend, "{}", anomaly);
            }
        }
    }

    /// Calls finalizers of resolved singletons.
    ///
    /// Can be called multiple times: only singletons resolved since the last call are finalized.
    pub(crate) fn close(&self) {
        let resolved_set = self.singletons.lock().drain();
        self.finalize_resolved(resolved_set, self.root_scope_id);
        debug!(backend = self.backend, "Singletons finalized");
    }

    /// Resolves every backend-owned registration in a throwaway scope of `backend`.
    pub(crate) fn verify(&self, backend: &dyn ResolutionBackend) -> Result<(), VerifyErrorKind> {
        let scope = backend.begin_scope().map_err(VerifyErrorKind::Scope)?;

        let result = self
            .registry
            .iter()
            .filter(|(_, registration)| registration.config.ownership == Ownership::Backend)
            .try_for_each(|(type_info, _)| {
                backend.resolve(&scope, *type_info).map(drop).map_err(|source| VerifyErrorKind::Resolve {
                    type_info: *type_info,
                    source,
                })
            });

        backend.end_scope(&scope);
        match &result {
            Ok(()) => debug!(backend = self.backend, registrations = self.registry.len(), "Verified"),
            Err(err) => error!(backend = self.backend, "{}", err),
        }
        result
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.close();
        debug!(backend = self.backend, "Kernel closed on drop");
    }
}
