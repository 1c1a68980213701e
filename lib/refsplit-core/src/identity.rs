use std::path::{Path, PathBuf};

use crate::codec::{PATHS_SECTION, RelativePath, ref_to_path};
use crate::{Reference, RefsplitError};

/// Extension of every emitted unit file.
pub const UNIT_EXTENSION: &str = "ts";

/// The identity of a unit, derived from its reference and the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity {
    relative_path: RelativePath,
    unique_name: String,
    directory: PathBuf,
    import_path: PathBuf,
    file_path: PathBuf,
    public_id: String,
}

impl UnitIdentity {
    /// Derives the identity of `reference` for units written under `output_root`.
    ///
    /// The unique name camel-joins the reference segments:
    /// `#/components/schemas/Pet` becomes `componentsSchemasPet`.
    ///
    /// # Errors
    ///
    /// Returns [`RefsplitError::InvalidReference`] when the reference cannot be
    /// mapped to a unit path.
    pub fn assign(reference: &Reference, output_root: &Path) -> Result<Self, RefsplitError> {
        let relative_path = ref_to_path(reference)?;
        let unique_name = unique_name(&reference.segments()?);

        let directory = if relative_path.dir().is_empty() {
            output_root.to_path_buf()
        } else {
            output_root.join(relative_path.dir())
        };
        let import_path = directory.join(relative_path.name());
        let file_path = directory.join(format!("{}.{UNIT_EXTENSION}", relative_path.name()));

        Ok(Self {
            relative_path,
            unique_name,
            directory,
            import_path,
            file_path,
            public_id: reference.public_id(),
        })
    }

    /// The unit path relative to the output root.
    #[must_use]
    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    /// The identifier used to import this unit.
    #[must_use]
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Appends `_<suffix>` to the unique name.
    pub(crate) fn disambiguate(&mut self, suffix: usize) {
        self.unique_name = format!("{}_{suffix}", self.unique_name);
    }

    /// The absolute unit directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The unit path without extension, as used by module imports.
    #[must_use]
    pub fn import_path(&self) -> &Path {
        &self.import_path
    }

    /// The on-disk unit file.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// The root-relative path identity, e.g. `/components/schemas/Pet`.
    #[must_use]
    pub fn public_id(&self) -> &str {
        &self.public_id
    }
}

/// Camel-joins `segments` into an identifier.
///
/// ASCII alphanumerics are kept, the first one of each segment uppercased.
/// Every other character is written as its code point in hex between
/// underscores (`_` is `_5F_`, `/` is `_2F_`), so distinct segments keep distinct
/// names. A path-item key drops its leading `/` when a letter or digit follows.
fn unique_name(segments: &[String]) -> String {
    let in_paths = segments.first().is_some_and(|first| first == PATHS_SECTION);

    let mut name = String::new();
    for (index, segment) in segments.iter().enumerate() {
        let segment = match segment.strip_prefix('/') {
            Some(rest)
                if in_paths
                    && index == 1
                    && rest.starts_with(|ch: char| ch.is_ascii_alphanumeric()) =>
            {
                rest
            }
            _ => segment.as_str(),
        };
        for (position, ch) in segment.chars().enumerate() {
            if ch.is_ascii_alphanumeric() {
                name.push(if position == 0 {
                    ch.to_ascii_uppercase()
                } else {
                    ch
                });
            } else {
                name.push_str(&format!("_{:X}_", u32::from(ch)));
            }
        }
    }

    if let Some(first) = name.chars().next() {
        name.replace_range(..first.len_utf8(), &first.to_ascii_lowercase().to_string());
    }
    if name.chars().next().is_none_or(|first| first.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
