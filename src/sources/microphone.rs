use crate::errors::RegistryError;
use crate::models::{CurrentSource, MediaType};
use crate::sources::{DeviceEnumerator, MediaSourceListener, MediaSourceProvider};
use crate::utils::{ListenerId, ListenerSet, Observable, lock};
use std::sync::{Arc, Mutex, Weak};

pub const DEFAULT_AUDIO_INPUT: &str = "Default audio input";

/// The default audio capture device.
pub struct MicrophoneSource {
    publish: Mutex<()>,
    listeners: ListenerSet<CurrentSource>,
}

impl MicrophoneSource {
    pub fn new(enumerator: &dyn DeviceEnumerator) -> Self {
        let source = Self {
            publish: Mutex::new(()),
            listeners: ListenerSet::new(),
        };
        source.refresh(enumerator);
        source
    }

    /// Name of the published device, [`DEFAULT_AUDIO_INPUT`] while none is present.
    pub fn name(&self) -> String {
        self.listeners
            .current()
            .map_or_else(|| DEFAULT_AUDIO_INPUT.to_string(), |it| it.name().to_string())
    }

    /// Re-enumerates audio inputs and publishes the first one. Returns `false`
    /// and publishes nothing when the device is unchanged.
    pub fn refresh(&self, enumerator: &dyn DeviceEnumerator) -> bool {
        let _publish = lock(&self.publish);
        let next = enumerator.enumerate(MediaType::Audio).into_iter().next();
        let current = self.listeners.current();
        if current.as_deref() == next.as_ref() {
            return false;
        }
        match &next {
            Some(device) => tracing::debug!(device = %device, "audio input changed"),
            None => tracing::debug!("audio input removed"),
        }
        self.listeners.notify_listeners(next.map(Arc::new));
        true
    }
}

impl Observable<CurrentSource> for MicrophoneSource {
    fn register(
        &self,
        observer: Weak<MediaSourceListener>,
    ) -> Result<ListenerId, RegistryError> {
        self.listeners.add_listener(observer)
    }

    fn unregister(&self, id: ListenerId) -> bool {
        self.listeners.remove_listener(id)
    }
}

impl MediaSourceProvider for MicrophoneSource {
    fn current_source(&self) -> CurrentSource {
        self.listeners.current()
    }
}
