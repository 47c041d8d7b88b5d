#[derive(thiserror::Error, Debug)]
pub enum ScopeErrorKind {
    #[error("Backend `{backend}` can't allocate a scope: {reason}")]
    AllocationFailure { backend: &'static str, reason: String },
}
