//! # Document Handle
//!
//! A Document is a single `.mos` file and its synchronization state.
//! Documents can be:
//! - **Memory-backed**: temporary, for tests or scratch buffers
//! - **File-backed**: loaded from and saved through a [`FileSystem`]
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Merge → Edit (model or text) → Save
//!   ↓      ↓            ↓                ↓
//! File   Model      Rewriter           File
//! ```

use crate::config::SyncConfig;
use crate::errors::{EditorError, EditorResult, ModelError};
use crate::events::ModelEditor;
use crate::rewriter::Rewriter;
use mosaic_common::{FileSystem, RealFileSystem};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Editable Mosaic document
pub struct Document {
    pub path: PathBuf,

    /// Incremented by every successful edit through this handle
    pub version: u64,

    rewriter: Rewriter,
    storage: DocumentStorage,
}

/// Storage backend for a document
pub enum DocumentStorage {
    Memory,

    File {
        fs: Arc<dyn FileSystem>,
        /// Text as last read or written
        saved: String,
    },
}

impl Document {
    /// Memory-backed document
    pub fn from_source(path: PathBuf, source: &str, config: SyncConfig) -> EditorResult<Self> {
        Ok(Self {
            path,
            version: 0,
            rewriter: Rewriter::new(source, config)?,
            storage: DocumentStorage::Memory,
        })
    }

    /// File-backed document on the real file system
    pub fn load(path: PathBuf, config: SyncConfig) -> EditorResult<Self> {
        Self::load_with(Arc::new(RealFileSystem), path, config)
    }

    pub fn load_with(fs: Arc<dyn FileSystem>, path: PathBuf, config: SyncConfig) -> EditorResult<Self> {
        let source = fs.read_to_string(&path)?;
        let rewriter = Rewriter::new(&source, config)?;
        info!(path = %path.display(), "Opened document");

        Ok(Self {
            path,
            version: 0,
            rewriter,
            storage: DocumentStorage::File { fs, saved: source },
        })
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    pub fn rewriter_mut(&mut self) -> &mut Rewriter {
        &mut self.rewriter
    }

    pub fn source(&self) -> &str {
        self.rewriter.text()
    }

    /// Edit the model; the text follows
    pub fn mutate<T>(&mut self, f: impl FnOnce(&mut ModelEditor<'_>) -> Result<T, ModelError>) -> EditorResult<T> {
        let result = self.rewriter.mutate(f)?;
        self.version += 1;
        Ok(result)
    }

    /// Edit the text; the model follows. Returns `false` if the new text
    /// did not merge.
    pub fn edit_text(&mut self, offset: usize, length: usize, text: &str) -> bool {
        let merged = self.rewriter.edit_text(offset, length, text);
        if merged {
            self.version += 1;
        }
        merged
    }

    /// Check if the text differs from what is on disk
    pub fn is_dirty(&self) -> bool {
        match &self.storage {
            DocumentStorage::File { saved, .. } => saved != self.rewriter.text(),
            DocumentStorage::Memory => false,
        }
    }

    /// Save to disk (if file-backed)
    pub fn save(&mut self) -> EditorResult<()> {
        match &mut self.storage {
            DocumentStorage::File { fs, saved } => {
                fs.write(&self.path, self.rewriter.text())?;
                *saved = self.rewriter.text().to_string();
                info!(path = %self.path.display(), "Saved document");
                Ok(())
            }
            DocumentStorage::Memory => Err(EditorError::NotFileBacked),
        }
    }
}
