use thiserror::Error;

mod registry_error;

pub use registry_error::RegistryError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Camera index {index} is out of range, {count} camera(s) available")]
    IndexOutOfRange { index: usize, count: usize },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
