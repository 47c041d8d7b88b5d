use super::{ResolveErrorKind, ScopeErrorKind};
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum VerifyErrorKind {
    #[error(transparent)]
    Scope(ScopeErrorKind),
    #[error("Registration `{type_info}` can't be resolved: {source}")]
    Resolve {
        type_info: TypeInfo,
        #[source]
        source: ResolveErrorKind,
    },
}
