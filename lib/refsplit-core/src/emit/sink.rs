use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tokio::fs;

use crate::RefsplitError;

/// Where generated files go.
///
/// A run calls [`clear`](Self::clear) once on the output root, then
/// [`write`](Self::write) for every unit and plugin file, sequentially.
pub trait UnitSink {
    /// Removes everything under `root` and leaves it as an empty directory.
    ///
    /// # Errors
    ///
    /// [`RefsplitError::OutputNotADirectory`] when `root` exists but is not a
    /// directory, [`RefsplitError::ClearOutput`] when clearing fails.
    fn clear(&mut self, root: &Path) -> impl Future<Output = Result<(), RefsplitError>> + Send;

    /// Writes `contents` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// [`RefsplitError::WriteUnit`] when the file cannot be written.
    fn write(
        &mut self,
        path: &Path,
        contents: &str,
    ) -> impl Future<Output = Result<(), RefsplitError>> + Send;
}

/// Writes files to disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl UnitSink for FsSink {
    async fn clear(&mut self, root: &Path) -> Result<(), RefsplitError> {
        let clear_error = |source: io::Error| RefsplitError::ClearOutput {
            path: root.to_path_buf(),
            source,
        };

        match fs::metadata(root).await {
            Ok(metadata) if !metadata.is_dir() => {
                return Err(RefsplitError::OutputNotADirectory {
                    path: root.to_path_buf(),
                });
            }
            Ok(_) => fs::remove_dir_all(root).await.map_err(clear_error)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(clear_error(err)),
        }
        fs::create_dir_all(root).await.map_err(clear_error)
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<(), RefsplitError> {
        let write_error = |source: io::Error| RefsplitError::WriteUnit {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        fs::write(path, contents).await.map_err(write_error)
    }
}

/// Keeps generated files in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: IndexMap<PathBuf, String>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The contents written to `path`.
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Iterates over written files in write order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|(path, contents)| (path.as_path(), contents.as_str()))
    }

    /// The number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` when nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl UnitSink for MemorySink {
    async fn clear(&mut self, root: &Path) -> Result<(), RefsplitError> {
        if self.files.contains_key(root) {
            return Err(RefsplitError::OutputNotADirectory {
                path: root.to_path_buf(),
            });
        }
        self.files.retain(|path, _| !path.starts_with(root));
        Ok(())
    }

    async fn write(&mut self, path: &Path, contents: &str) -> Result<(), RefsplitError> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}
