use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::{
    any::TypeInfo,
    config::{Config, Lifetime},
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    finalizer::{boxed_finalizer, BoxedFinalizer, Finalizer},
    instantiator::{boxed_instantiator, BoxedInstantiator, Instantiator},
};

pub(crate) struct InstantiatorData {
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) config: Config,
}

/// Collects registrations at startup. [`Self::build`] freezes them into a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    instantiators: BTreeMap<TypeInfo, InstantiatorData>,
    finalizers: BTreeMap<TypeInfo, BoxedFinalizer>,
}

impl RegistryBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn provide<Inst, Deps>(self, instantiator: Inst, lifetime: Lifetime) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind> + 'static,
    {
        self.provide_with_config(instantiator, Config::new(lifetime))
    }

    #[inline]
    #[must_use]
    pub fn provide_with_config<Inst, Deps>(mut self, instantiator: Inst, config: Config) -> Self
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind> + 'static,
    {
        self.add_instantiator(TypeInfo::of::<Inst::Provides>(), boxed_instantiator(instantiator), config);
        self
    }

    /// Adds a finalizer for the given non-transient dependency type.
    /// The finalizer will be called when the owning scope ends (or the backend is closed, for singletons)
    /// in LIFO order of their resolution (not the order of registration).
    ///
    /// # Warning
    /// - Finalizers of transient and cross-wired dependencies are ignored,
    ///   because the backend neither caches nor owns them.
    #[inline]
    #[must_use]
    pub fn add_finalizer<Dep>(mut self, finalizer: impl Finalizer<Dep> + Send + Sync) -> Self
    where
        Dep: Send + Sync + 'static,
    {
        self.finalizers.insert(TypeInfo::of::<Dep>(), boxed_finalizer(finalizer));
        self
    }

    #[inline]
    pub(crate) fn add_instantiator(
        &mut self,
        type_info: TypeInfo,
        instantiator: BoxedInstantiator,
        config: Config,
    ) -> Option<InstantiatorData> {
        let replaced = self.instantiators.insert(type_info, InstantiatorData { instantiator, config });
        if replaced.is_some() {
            debug!(dependency = type_info.name, "Registration replaced");
        }
        replaced
    }

    #[must_use]
    pub fn build(mut self) -> Registry {
        let mut registrations = BTreeMap::new();
        for (type_info, InstantiatorData { instantiator, config }) in self.instantiators {
            let finalizer = match self.finalizers.remove(&type_info) {
                Some(finalizer) if config.is_finalizable() => Some(finalizer),
                Some(_) => {
                    warn!(
                        dependency = type_info.name,
                        lifetime = config.lifetime.name(),
                        "Finalizer ignored: dependency isn't owned and cached by the backend"
                    );
                    None
                }
                None => None,
            };

            registrations.insert(
                type_info,
                Registration {
                    instantiator,
                    finalizer,
                    config,
                },
            );
        }

        for type_info in self.finalizers.keys() {
            warn!(dependency = type_info.name, "Finalizer ignored: dependency isn't registered");
        }

        Registry { registrations }
    }
}

pub(crate) struct Registration {
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) finalizer: Option<BoxedFinalizer>,
    pub(crate) config: Config,
}

/// Frozen set of registrations. Read-only and shared by every scope.
pub struct Registry {
    registrations: BTreeMap<TypeInfo, Registration>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub(crate) fn get(&self, type_info: &TypeInfo) -> Option<&Registration> {
        self.registrations.get(type_info)
    }

    #[inline]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&TypeInfo, &Registration)> {
        self.registrations.iter()
    }

    #[inline]
    #[must_use]
    pub fn config(&self, type_info: &TypeInfo) -> Option<Config> {
        self.registrations.get(type_info).map(|registration| registration.config)
    }

    #[inline]
    #[must_use]
    pub fn contains<Dep: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeInfo::of::<Dep>())
    }

    #[inline]
    pub fn type_infos(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.registrations.keys().copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl From<RegistryBuilder> for Registry {
    fn from(builder: RegistryBuilder) -> Self {
        builder.build()
    }
}
