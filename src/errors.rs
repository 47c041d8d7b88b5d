mod dependency_resolver;
mod disposal;
mod instantiate;
mod instantiator;
mod scope;
mod verify;

pub use dependency_resolver::ResolveErrorKind;
pub use disposal::DisposalAnomaly;
pub use instantiate::InstantiateErrorKind;
pub use instantiator::{DFSErrorKind, InstantiatorErrorKind};
pub use scope::ScopeErrorKind;
pub use verify::VerifyErrorKind;
