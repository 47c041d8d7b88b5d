use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};
use tracing::{debug, info_span};

use crate::{
    any::{downcast, Instance, TypeInfo},
    backend::ResolutionBackend,
    context::ScopeContext,
    errors::ResolveErrorKind,
};

/// Framework extension point an instance is activated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    Controller,
    ViewComponent,
    TagHelper,
    Middleware,
}

impl ActivationKind {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ActivationKind::Controller => "controller",
            ActivationKind::ViewComponent => "view_component",
            ActivationKind::TagHelper => "tag_helper",
            ActivationKind::Middleware => "middleware",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Decides whether a type of some [`ActivationKind`] is activated through the backend.
pub type ActivationFilter = fn(&TypeInfo) -> bool;

/// Creates controllers, view components, tag helpers and middleware from the scope
/// that is active on the current flow.
///
/// The provider holds no per-request state: it reads the scope from [`ScopeContext`] on every call,
/// so one instance is shared by the whole application.
#[derive(Clone)]
pub struct ActivationProvider {
    backend: Arc<dyn ResolutionBackend>,
    filters: [Option<ActivationFilter>; 4],
}

impl ActivationProvider {
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn ResolutionBackend>) -> Self {
        Self {
            backend,
            filters: [None; 4],
        }
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ResolutionBackend> {
        &self.backend
    }

    /// Restricts which types of `kind` the host should activate through the backend.
    /// Types rejected by the filter are left to the host's own activator.
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, kind: ActivationKind, filter: ActivationFilter) -> Self {
        self.filters[kind.index()] = Some(filter);
        self
    }

    /// Checks whether `type_info` of `kind` should be activated through the backend.
    ///
    /// The check is advisory: [`Self::create`] doesn't consult it.
    #[inline]
    #[must_use]
    pub fn claims(&self, kind: ActivationKind, type_info: &TypeInfo) -> bool {
        self.filters[kind.index()].map_or(true, |filter| filter(type_info))
    }

    /// Resolves `type_info` against the scope of the current flow.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoActiveScope`] if no scope is published on the current flow
    /// - Returns errors of [`ResolutionBackend::resolve`] unchanged
    pub fn create(&self, kind: ActivationKind, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
        let span = info_span!("activate", kind = kind.name(), dependency = type_info.name);
        let _guard = span.enter();

        let scope = ScopeContext::current()?;
        let instance = self.backend.resolve(&scope, type_info)?;
        debug!(scope = %scope.id(), "Activated");
        Ok(instance)
    }

    /// Typed version of [`Self::create`].
    ///
    /// # Errors
    /// Same as [`Self::create`], plus [`ResolveErrorKind::IncorrectType`]
    pub fn get<T: Send + Sync + 'static>(&self, kind: ActivationKind) -> Result<Arc<T>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<T>();
        let instance = self.create(kind, type_info)?;
        downcast(instance).map_err(|actual| ResolveErrorKind::IncorrectType {
            expected: type_info,
            actual,
        })
    }

    /// # Errors
    /// Same as [`Self::get`]
    #[inline]
    pub fn controller<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get(ActivationKind::Controller)
    }

    /// # Errors
    /// Same as [`Self::get`]
    #[inline]
    pub fn view_component<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get(ActivationKind::ViewComponent)
    }

    /// # Errors
    /// Same as [`Self::get`]
    #[inline]
    pub fn tag_helper<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get(ActivationKind::TagHelper)
    }

    /// # Errors
    /// Same as [`Self::get`]
    #[inline]
    pub fn middleware<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get(ActivationKind::Middleware)
    }
}

impl Debug for ActivationProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationProvider")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}
