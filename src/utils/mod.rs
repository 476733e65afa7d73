mod listener_set;
mod observer;
mod pidfile;

pub use listener_set::*;
pub use observer::*;
pub use pidfile::Pidfile;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a panicking listener poisoned it.
/// None of the guarded state is left half-updated across a callback.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves `str` against the current working directory unless it is absolute.
pub fn read_path(str: &str) -> anyhow::Result<std::path::PathBuf> {
    use anyhow::Context;
    let path = std::path::Path::new(str);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir =
            std::env::current_dir().with_context(|| "Failed to read current directory")?;
        Ok(current_dir.join(path))
    }
}
