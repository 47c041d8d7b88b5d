use crate::{any::TypeInfo, scope::ScopeId};

/// Failure of a finalizer while a scope was being disposed.
///
/// It's logged by the backend and never returned to the request.
#[derive(thiserror::Error, Debug)]
#[error("Finalizer of `{type_info}` failed while disposing scope {scope_id}: {source}")]
pub struct DisposalAnomaly {
    pub scope_id: ScopeId,
    pub type_info: TypeInfo,
    pub source: anyhow::Error,
}
