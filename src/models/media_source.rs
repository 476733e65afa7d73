use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Unknown,
    Capture,
    Test,
}

/// Description of a media source discovered by the device subsystem.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    name: String,
    media_types: Vec<MediaType>,
    #[serde(default)]
    source_type: SourceType,
}

/// The value published to media source listeners, `None` when no source is
/// currently available.
pub type CurrentSource = Option<Arc<MediaSource>>;

impl MediaSource {
    pub fn new(
        name: impl Into<String>,
        media_types: impl IntoIterator<Item = MediaType>,
        source_type: SourceType,
    ) -> Self {
        Self {
            name: name.into(),
            media_types: media_types.into_iter().collect(),
            source_type,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn media_types(&self) -> &[MediaType] {
        &self.media_types
    }
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }
    pub fn has_media_type(&self, media_type: MediaType) -> bool {
        self.media_types.contains(&media_type)
    }
}

impl Display for MediaSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}", self.name, self.media_types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let source: MediaSource = toml::from_str(
            r#"
            name = "Front facing Camera"
            media_types = ["video"]
            source_type = "capture"
            "#,
        )
        .unwrap();
        assert_eq!(source.name(), "Front facing Camera");
        assert_eq!(source.media_types(), &[MediaType::Video]);
        assert_eq!(source.source_type(), SourceType::Capture);
        assert!(source.has_media_type(MediaType::Video));
        assert!(!source.has_media_type(MediaType::Audio));
    }

    #[test]
    fn test_source_type_defaults_to_unknown() {
        let source: MediaSource = toml::from_str(
            r#"
            name = "tone"
            media_types = ["audio"]
            "#,
        )
        .unwrap();
        assert_eq!(source.source_type(), SourceType::Unknown);
        assert!(toml::from_str::<MediaSource>(r#"name = "x""#).is_err());
    }
}
