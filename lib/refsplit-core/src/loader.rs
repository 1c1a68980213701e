//! Reading the source document from disk.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::RefsplitError;

/// Resolves `path` to an absolute path and checks that it exists.
///
/// # Errors
///
/// Returns [`RefsplitError::SourceNotFound`] when nothing exists at `path`.
pub async fn resolve_source(path: &Path) -> Result<PathBuf, RefsplitError> {
    let resolved = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if fs::try_exists(&resolved).await.unwrap_or(false) {
        Ok(resolved)
    } else {
        Err(RefsplitError::SourceNotFound { path: resolved })
    }
}

/// Reads and parses the source document at `path`.
///
/// `.json` files are parsed as JSON, anything else as YAML.
///
/// # Errors
///
/// Returns an input error when the document is missing, unreadable,
/// unparsable, or when its root is not an object.
pub async fn load_document(path: &Path) -> Result<Value, RefsplitError> {
    let path = resolve_source(path).await?;
    let contents = fs::read_to_string(&path)
        .await
        .map_err(|source| RefsplitError::ReadSource {
            path: path.clone(),
            source,
        })?;
    debug!(path = %path.display(), bytes = contents.len(), "source document read");
    parse_document(&path, &contents)
}

/// Parses `contents`, choosing the format from the extension of `path`.
///
/// # Errors
///
/// Returns [`RefsplitError::ParseSource`] or [`RefsplitError::SourceNotAnObject`].
pub fn parse_document(path: &Path, contents: &str) -> Result<Value, RefsplitError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let document = if is_json {
        parse_json(path, contents)?
    } else {
        parse_yaml(path, contents)?
    };

    if !document.is_object() {
        return Err(RefsplitError::SourceNotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(document)
}

fn parse_json(path: &Path, contents: &str) -> Result<Value, RefsplitError> {
    let deserializer = &mut serde_json::Deserializer::from_str(contents);
    serde_path_to_error::deserialize(deserializer).map_err(|err| RefsplitError::ParseSource {
        path: path.to_path_buf(),
        reason: format!("at '{}': {}", err.path(), err.inner()),
    })
}

#[cfg(feature = "yaml")]
fn parse_yaml(path: &Path, contents: &str) -> Result<Value, RefsplitError> {
    serde_saphyr::from_str(contents).map_err(|err| RefsplitError::ParseSource {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(path: &Path, _contents: &str) -> Result<Value, RefsplitError> {
    Err(RefsplitError::ParseSource {
        path: path.to_path_buf(),
        reason: "YAML documents require the `yaml` feature".to_string(),
    })
}
