use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File system abstraction for document storage and testing
pub trait FileSystem: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;

    fn write(&self, path: &Path, contents: &str) -> Result<(), std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), std::io::Error> {
        std::fs::write(path, contents)
    }
}

/// In-memory file system for testing
///
/// Clones share the same storage, so a test can keep a handle and inspect
/// what was written through another.
#[derive(Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.into());
        }
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.contents(path).is_some()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.contents(path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), std::io::Error> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "file table poisoned"))?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
