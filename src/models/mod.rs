pub mod media_source;

pub use media_source::{CurrentSource, MediaSource, MediaType, SourceType};
