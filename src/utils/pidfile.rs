use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, process};

pub struct Pidfile {
    path: Option<PathBuf>,
}

impl Pidfile {
    #[cfg(target_os = "linux")]
    pub fn new() -> anyhow::Result<Self> {
        let uid = unsafe { nix::libc::getuid() as u32 };
        let path = if uid == 0 {
            PathBuf::from("/var/run/owr-sources.pid")
        } else {
            PathBuf::from(format!("/run/user/{}/owr-sources.pid", uid))
        };
        Self::create(path)
    }
    #[cfg(not(target_os = "linux"))]
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { path: None })
    }

    /// Writes the current process id to `path`; the file is removed on drop.
    pub fn create(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to create pidfile '{path:?}'"))?;
        file.write_all(format!("{}", process::id()).as_bytes())
            .with_context(|| format!("Failed to write pidfile '{path:?}'"))?;
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for Pidfile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(err) = fs::remove_file(&path) {
                eprintln!("Failed to remove pidfile '{path:?}', reason: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pidfile_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owr-sources.pid");
        let pidfile = Pidfile::create(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            process::id().to_string()
        );
        assert_eq!(pidfile.path(), Some(path.as_path()));
        drop(pidfile);
        assert!(!path.exists());
    }
}
