#[macro_use]
pub(crate) mod macros;

pub(crate) mod activation;
pub(crate) mod any;
pub(crate) mod backend;
pub(crate) mod backends;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod cross_wire;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod host;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod middleware;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod utils;

pub mod integrations;

pub use activation::{ActivationFilter, ActivationKind, ActivationProvider};
pub use any::{Instance, TypeInfo};
pub use backend::{ResolutionBackend, ResolutionBackendExt};
pub use backends::{CompositionRoot, CompositionRootBackend, CompositionScope, ContainerBackend, TaggedScopeBackend};
pub use config::{Config, Lifetime, Ownership};
pub use context::ScopeContext;
pub use dependency_resolver::DependencyResolver;
pub use errors::{
    DFSErrorKind, DisposalAnomaly, InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind, ScopeErrorKind, VerifyErrorKind,
};
pub use finalizer::Finalizer;
pub use host::{HostServices, Logger, LoggerFactory};
pub use inject::{Inject, InjectOptional};
pub use instantiator::{instance, Instantiator};
pub use middleware::{RequestScope, RequestScopeLayer, ScopeGuard};
pub use registry::{Registry, RegistryBuilder};
pub use resolver::Resolver;
pub use scope::{ScopeHandle, ScopeId, ScopeState};

pub use integrations::axum;
