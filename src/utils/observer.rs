use crate::errors::RegistryError;
use crate::utils::ListenerId;
use std::sync::Weak;

pub trait Observer<V>: Send + Sync {
    fn notify(&self, value: V);
}

impl<V, F> Observer<V> for F
where
    F: Fn(V) + Send + Sync,
{
    fn notify(&self, value: V) {
        self(value)
    }
}

pub trait Observable<V> {
    fn register(
        &self,
        observer: Weak<dyn Observer<V> + 'static>,
    ) -> Result<ListenerId, RegistryError>;
    fn unregister(&self, id: ListenerId) -> bool;
}
