use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Host service `{type_info}` not found")]
    HostServiceMissing { type_info: TypeInfo },
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
