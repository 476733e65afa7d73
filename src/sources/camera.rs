use crate::errors::{RegistryError, SourceError};
use crate::models::{CurrentSource, MediaSource, MediaType};
use crate::sources::{DeviceEnumerator, MediaSourceListener, MediaSourceProvider};
use crate::utils::{ListenerId, ListenerSet, Observable, lock};
use std::sync::{Arc, Mutex, Weak};

struct CameraState {
    cameras: Vec<Arc<MediaSource>>,
    selected: Option<usize>,
}

/// The video capture devices, one of which is selected at a time.
///
/// Listeners receive the selected camera, `None` while no camera is present.
pub struct CameraSource {
    /// Serializes `select_source` and `refresh` so the published value always
    /// matches `state`.
    publish: Mutex<()>,
    state: Mutex<CameraState>,
    listeners: ListenerSet<CurrentSource>,
}

impl CameraSource {
    pub fn new(enumerator: &dyn DeviceEnumerator) -> Self {
        let cameras = enumerator
            .enumerate(MediaType::Video)
            .into_iter()
            .map(Arc::new)
            .collect::<Vec<_>>();
        let selected = if cameras.is_empty() { None } else { Some(0) };
        let current = selected.and_then(|index| cameras.get(index).cloned());
        Self {
            publish: Mutex::new(()),
            state: Mutex::new(CameraState { cameras, selected }),
            listeners: ListenerSet::with_value(current),
        }
    }

    pub fn count(&self) -> usize {
        lock(&self.state).cameras.len()
    }

    pub fn name(&self, index: usize) -> Option<String> {
        lock(&self.state)
            .cameras
            .get(index)
            .map(|it| it.name().to_string())
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.state)
            .cameras
            .iter()
            .map(|it| it.name().to_string())
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        lock(&self.state).selected
    }

    /// Selects the camera at `index` and publishes it, even when it is
    /// already the selected one.
    pub fn select_source(&self, index: usize) -> Result<(), SourceError> {
        let _publish = lock(&self.publish);
        let source = {
            let mut state = lock(&self.state);
            let count = state.cameras.len();
            let source = state
                .cameras
                .get(index)
                .cloned()
                .ok_or(SourceError::IndexOutOfRange { index, count })?;
            state.selected = Some(index);
            source
        };
        tracing::debug!(index, camera = source.name(), "camera selected");
        self.listeners.notify_listeners(Some(source));
        Ok(())
    }

    /// Replaces the camera list with a fresh enumeration.
    ///
    /// The selected camera stays selected if a camera with the same name is
    /// still present, otherwise the first camera is selected. Returns whether
    /// the selected source changed, listeners are only notified in that case.
    pub fn refresh(&self, enumerator: &dyn DeviceEnumerator) -> bool {
        let _publish = lock(&self.publish);
        let discovered = enumerator.enumerate(MediaType::Video);
        let (previous, next) = {
            let mut state = lock(&self.state);
            let previous = state
                .selected
                .and_then(|index| state.cameras.get(index).cloned());
            // unchanged devices keep their identity
            let cameras = discovered
                .into_iter()
                .map(|device| {
                    state
                        .cameras
                        .iter()
                        .find(|it| ***it == device)
                        .cloned()
                        .unwrap_or_else(|| Arc::new(device))
                })
                .collect::<Vec<_>>();
            let selected = previous
                .as_ref()
                .and_then(|prev| cameras.iter().position(|it| it.name() == prev.name()))
                .or(if cameras.is_empty() { None } else { Some(0) });
            let next = selected.and_then(|index| cameras.get(index).cloned());
            tracing::debug!(
                before = state.cameras.len(),
                after = cameras.len(),
                "camera list refreshed"
            );
            state.cameras = cameras;
            state.selected = selected;
            (previous, next)
        };
        let changed = match (&previous, &next) {
            (Some(prev), Some(next)) => !Arc::ptr_eq(prev, next),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.listeners.notify_listeners(next);
        }
        changed
    }
}

impl Observable<CurrentSource> for CameraSource {
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

impl MediaSourceProvider for CameraSource {
    fn current_source(&self) -> CurrentSource {
        self.listeners.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use crate::sources::StaticDevices;

    fn camera(name: &str) -> MediaSource {
        MediaSource::new(name, [MediaType::Video], SourceType::Capture)
    }

    fn two_cameras() -> StaticDevices {
        StaticDevices::new(vec![
            camera("Front facing Camera"),
            camera("Back facing Camera"),
        ])
    }

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, Arc<impl Fn(CurrentSource) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = seen.clone();
            Arc::new(move |it: CurrentSource| {
                seen.lock().unwrap().push(it.map(|s| s.name().to_string()))
            })
        };
        (seen, listener)
    }

    #[test]
    fn test_camera_source_basic_functionality() {
        let source = CameraSource::new(&two_cameras());
        assert_eq!(source.count(), 2);
        assert_eq!(source.name(0).as_deref(), Some("Front facing Camera"));
        assert_eq!(source.name(1).as_deref(), Some("Back facing Camera"));
        assert_eq!(source.name(2), None);
        assert_eq!(source.selected_index(), Some(0));

        let (front, front_listener) = recorder();
        source.subscribe(&front_listener).unwrap();
        assert_eq!(
            *front.lock().unwrap(),
            vec![Some("Front facing Camera".to_string())]
        );

        let (back, back_listener) = recorder();
        source.subscribe(&back_listener).unwrap();
        source.select_source(1).unwrap();
        assert_eq!(
            back.lock().unwrap().last().cloned().flatten().as_deref(),
            Some("Back facing Camera")
        );
        assert_eq!(front.lock().unwrap().len(), 2);
        assert_eq!(source.selected_index(), Some(1));
    }

    #[test]
    fn test_select_out_of_range() {
        let source = CameraSource::new(&two_cameras());
        let (seen, listener) = recorder();
        source.subscribe(&listener).unwrap();
        assert_eq!(
            source.select_source(2),
            Err(SourceError::IndexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(source.selected_index(), Some(0));
    }

    #[test]
    fn test_no_cameras() {
        let source = CameraSource::new(&StaticDevices::default());
        assert_eq!(source.count(), 0);
        assert_eq!(source.selected_index(), None);
        let (seen, listener) = recorder();
        source.subscribe(&listener).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_refresh_keeps_selection() {
        let source = CameraSource::new(&two_cameras());
        source.select_source(1).unwrap();
        let before = source.current_source().unwrap();
        let (seen, listener) = recorder();
        source.subscribe(&listener).unwrap();

        // a camera appears in front of the selected one
        let devices = StaticDevices::new(vec![
            camera("USB Camera"),
            camera("Front facing Camera"),
            camera("Back facing Camera"),
        ]);
        assert!(!source.refresh(&devices));
        assert_eq!(source.selected_index(), Some(2));
        assert!(Arc::ptr_eq(&before, &source.current_source().unwrap()));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(source.names().len(), 3);
    }

    #[test]
    fn test_refresh_selected_camera_removed() {
        let source = CameraSource::new(&two_cameras());
        source.select_source(1).unwrap();
        let (seen, listener) = recorder();
        source.subscribe(&listener).unwrap();

        let devices = StaticDevices::new(vec![camera("Front facing Camera")]);
        assert!(source.refresh(&devices));
        assert_eq!(source.selected_index(), Some(0));
        assert!(source.refresh(&StaticDevices::default()));
        assert_eq!(source.selected_index(), None);
        assert!(!source.refresh(&StaticDevices::default()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Some("Back facing Camera".to_string()),
                Some("Front facing Camera".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_dropped_listener_is_skipped() {
        let source = CameraSource::new(&two_cameras());
        let (seen, listener) = recorder();
        source.subscribe(&listener).unwrap();
        drop(listener);
        source.select_source(1).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
