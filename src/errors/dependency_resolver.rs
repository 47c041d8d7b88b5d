use std::any::TypeId;

use super::{instantiate::InstantiateErrorKind, instantiator::DFSErrorKind, instantiator::InstantiatorErrorKind};
use crate::{any::TypeInfo, config::Lifetime};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("No active scope on the current flow. Resolution is only valid inside a published request scope")]
    NoActiveScope,
    #[error("Type `{type_info}` isn't registered")]
    UnregisteredType { type_info: TypeInfo },
    #[error("Incorrect instantiator provides type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error(
        "\
        Captive dependency. \
        `{dependent}` ({} lifetime) can't depend on `{dependency}` ({} lifetime)\
        ",
        dependent_lifetime.name(),
        dependency_lifetime.name(),
    )]
    CaptiveDependency {
        dependent: TypeInfo,
        dependent_lifetime: Lifetime,
        dependency: TypeInfo,
        dependency_lifetime: Lifetime,
    },
    #[error(transparent)]
    Cycle(DFSErrorKind),
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}
