use crate::models::{MediaSource, MediaType, SourceType};

/// Lists the capture devices currently present for a media type.
pub trait DeviceEnumerator: Send + Sync {
    fn enumerate(&self, media_type: MediaType) -> Vec<MediaSource>;
}

/// A fixed device list, typically read from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticDevices {
    devices: Vec<MediaSource>,
}

impl StaticDevices {
    pub fn new(devices: Vec<MediaSource>) -> Self {
        Self { devices }
    }
}

impl DeviceEnumerator for StaticDevices {
    fn enumerate(&self, media_type: MediaType) -> Vec<MediaSource> {
        self.devices
            .iter()
            .filter(|it| it.source_type() == SourceType::Capture && it.has_media_type(media_type))
            .cloned()
            .collect()
    }
}
