use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Detects when an archive on disk has been repacked.
#[derive(Debug)]
pub struct ReloadWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ReloadWatcher {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            last_modified: None,
        }
    }

    /// Returns true once per modification-time advance. The first poll that
    /// finds the archive counts as a change.
    pub fn poll(&mut self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                log::trace!("{}: {}", self.path.display(), e);
                return false;
            }
        };

        match self.last_modified {
            Some(last) if modified <= last => false,
            _ => {
                self.last_modified = Some(modified);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_archive_never_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = ReloadWatcher::new(dir.path().join("missing.arc"));
        assert!(!watcher.poll());
        assert!(!watcher.poll());
    }

    #[test]
    fn test_reports_first_sight_and_touch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.arc");
        fs::write(&path, b"v1").unwrap();

        let mut watcher = ReloadWatcher::new(&path);
        assert!(watcher.poll());
        assert!(!watcher.poll());

        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert!(watcher.poll());
        assert!(!watcher.poll());
    }
}
