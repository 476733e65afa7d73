use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}
