//! Media source producers.
//!
//! A producer owns a [`ListenerSet`](crate::utils::ListenerSet) of
//! [`CurrentSource`] values and publishes through it whenever the available
//! source changes. Device discovery itself is an external collaborator reached
//! through [`DeviceEnumerator`].

mod camera;
mod devices;
mod microphone;

pub use camera::CameraSource;
pub use devices::{DeviceEnumerator, StaticDevices};
pub use microphone::{DEFAULT_AUDIO_INPUT, MicrophoneSource};

use crate::errors::RegistryError;
use crate::models::CurrentSource;
use crate::utils::{ListenerId, Observable, Observer};
use std::sync::{Arc, Weak};

pub type MediaSourceListener = dyn Observer<CurrentSource>;

/// A producer of [`CurrentSource`] values, observable through its listeners.
pub trait MediaSourceProvider: Observable<CurrentSource> + Send + Sync {
    /// Registers `listener`, which is called right away with the current
    /// source and then on every change until it is dropped or removed.
    fn add_media_source_listener(
        &self,
        listener: Weak<MediaSourceListener>,
    ) -> Result<ListenerId, RegistryError> {
        self.register(listener)
    }

    fn remove_media_source_listener(&self, id: ListenerId) -> bool {
        self.unregister(id)
    }

    fn current_source(&self) -> CurrentSource;

    /// Downgrades `listener` and registers it; the caller keeps it alive.
    fn subscribe<L>(&self, listener: &Arc<L>) -> Result<ListenerId, RegistryError>
    where
        Self: Sized,
        L: Observer<CurrentSource> + 'static,
    {
        let weak = Arc::downgrade(listener);
        self.add_media_source_listener(weak)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSource, MediaType, SourceType};
    use std::sync::Mutex;

    #[test]
    fn test_providers_share_listener_registry() {
        let devices = StaticDevices::new(vec![
            MediaSource::new(DEFAULT_AUDIO_INPUT, [MediaType::Audio], SourceType::Capture),
            MediaSource::new("Front facing Camera", [MediaType::Video], SourceType::Capture),
        ]);
        let microphone = MicrophoneSource::new(&devices);
        let camera = CameraSource::new(&devices);
        let providers: [&dyn MediaSourceProvider; 2] = [&microphone, &camera];

        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = seen.clone();
            Arc::new(move |it: CurrentSource| {
                seen.lock().unwrap().push(it.map(|s| s.name().to_string()))
            })
        };
        for provider in providers {
            let weak = Arc::downgrade(&listener) as Weak<MediaSourceListener>;
            let id = provider.add_media_source_listener(weak).unwrap();
            assert!(provider.unregister(id));
            assert!(!provider.remove_media_source_listener(id));
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Some(DEFAULT_AUDIO_INPUT.to_string()),
                Some("Front facing Camera".to_string())
            ]
        );

        camera.select_source(0).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
