pub(crate) mod kernel;

mod composition;
mod container;
mod tagged;

pub use composition::{CompositionRoot, CompositionRootBackend, CompositionScope};
pub use container::ContainerBackend;
pub use tagged::TaggedScopeBackend;
