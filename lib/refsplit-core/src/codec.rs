//! Mapping between references and filesystem-safe unit paths.
//!
//! A reference such as `#/components/months/January` maps to the relative path
//! `components.months/January`: every segment but the last one is joined with `.`
//! into a single directory, the last segment is the file name.
//!
//! Escaping rules, applied on the decoded JSON pointer segments:
//!
//! - characters reserved on common filesystems (`" * : < > ? \ |`, control
//!   characters) and `%` are percent-encoded,
//! - a `/` inside a segment becomes `|` (`/v1/path-1` becomes `v1|path-1`),
//! - `.` is percent-encoded in directory segments, and in a file name made of dots only,
//! - the key right after `paths` is an OpenAPI path template that always starts
//!   with `/`: this leading slash is implied and dropped, and the root template `/`
//!   is written `%2F`.
//!
//! [`ref_to_path`] and [`path_to_ref`] are mutual inverses for local references.

use std::fmt::{self, Display};
use std::path::PathBuf;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::{Reference, RefsplitError};

/// The OpenAPI section whose keys are path templates.
pub const PATHS_SECTION: &str = "paths";

/// Stand-in for a literal `/` inside a single segment.
pub const SLASH_ESCAPE: char = '|';

const DIR_SEPARATOR: &str = ".";
const ROOT_PATH_ITEM: &str = "%2F";

const NAME_RESERVED: &AsciiSet = &CONTROLS
    .add(b'"')
    .add(b'*')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'|')
    .add(b'%');

const DIR_RESERVED: &AsciiSet = &NAME_RESERVED.add(b'.');

const DOT_RESERVED: &AsciiSet = &CONTROLS.add(b'.');

/// A unit location relative to the output root: `<dir>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativePath {
    dir: String,
    name: String,
}

impl RelativePath {
    /// The escaped directory, empty for top-level units.
    #[must_use]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// The escaped file name, without extension.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path as a relative [`PathBuf`].
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        if self.dir.is_empty() {
            PathBuf::from(&self.name)
        } else {
            PathBuf::from(&self.dir).join(&self.name)
        }
    }

    /// The module specifier to import `self` from a unit located at `from`.
    #[must_use]
    pub fn import_from(&self, from: &Self) -> String {
        if self.dir == from.dir {
            format!("./{}", self.name)
        } else if from.dir.is_empty() {
            format!("./{self}")
        } else {
            format!("../{self}")
        }
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.dir, self.name)
        }
    }
}

/// Maps a reference to its unit path.
///
/// # Errors
///
/// Returns [`RefsplitError::InvalidReference`] for the root reference, for empty
/// segments, and for path-item keys not starting with `/`.
pub fn ref_to_path(reference: &Reference) -> Result<RelativePath, RefsplitError> {
    let segments = reference.segments()?;
    let Some((leaf, dirs)) = segments.split_last() else {
        return Err(invalid(reference, "the document root cannot be a unit"));
    };
    let in_paths = segments.first().is_some_and(|first| first == PATHS_SECTION);

    let mut encoded_dirs = Vec::with_capacity(dirs.len());
    for (index, segment) in dirs.iter().enumerate() {
        let segment =
            encode_segment(reference, segment, in_paths && index == 1, DIR_RESERVED)?;
        encoded_dirs.push(segment);
    }
    let name = encode_segment(reference, leaf, in_paths && dirs.len() == 1, NAME_RESERVED)?;

    Ok(RelativePath {
        dir: encoded_dirs.join(DIR_SEPARATOR),
        name,
    })
}

/// Maps a unit path back to its reference.
///
/// # Errors
///
/// Returns [`RefsplitError::InvalidReference`] when a segment is empty or not a
/// valid escape sequence.
pub fn path_to_ref(relative_dir: &str, name: &str) -> Result<Reference, RefsplitError> {
    let invalid_path = |reason: &str| {
        let path = if relative_dir.is_empty() {
            name.to_string()
        } else {
            format!("{relative_dir}/{name}")
        };
        invalid(&Reference::new(path), reason)
    };

    let mut encoded = Vec::new();
    if !relative_dir.is_empty() {
        encoded.extend(relative_dir.split(DIR_SEPARATOR));
    }
    encoded.push(name);

    let mut segments = Vec::with_capacity(encoded.len());
    for (index, segment) in encoded.iter().enumerate() {
        if segment.is_empty() {
            return Err(invalid_path("empty segment"));
        }
        let is_path_item = index == 1
            && segments
                .first()
                .is_some_and(|first: &String| first == PATHS_SECTION);
        let decoded =
            decode_segment(segment).ok_or_else(|| invalid_path("invalid escape sequence"))?;
        let decoded = if !is_path_item {
            decoded
        } else if *segment == ROOT_PATH_ITEM {
            "/".to_string()
        } else {
            format!("/{decoded}")
        };
        segments.push(decoded);
    }

    Ok(Reference::from_segments(segments))
}

fn encode_segment(
    reference: &Reference,
    segment: &str,
    is_path_item: bool,
    reserved: &'static AsciiSet,
) -> Result<String, RefsplitError> {
    let segment = if is_path_item {
        match segment.strip_prefix('/') {
            Some("") => return Ok(ROOT_PATH_ITEM.to_string()),
            Some(rest) => rest,
            None => return Err(invalid(reference, "path item keys must start with '/'")),
        }
    } else {
        segment
    };
    if segment.is_empty() {
        return Err(invalid(reference, "empty segment"));
    }

    let encoded = if segment.chars().all(|ch| ch == '.') {
        utf8_percent_encode(segment, DOT_RESERVED).to_string()
    } else {
        utf8_percent_encode(segment, reserved).to_string()
    };
    Ok(encoded.replace('/', &SLASH_ESCAPE.to_string()))
}

fn decode_segment(segment: &str) -> Option<String> {
    let unescaped = segment.replace(SLASH_ESCAPE, "/");
    percent_decode_str(&unescaped)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn invalid(reference: &Reference, reason: &str) -> RefsplitError {
    RefsplitError::InvalidReference {
        reference: reference.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("#/components/schemas/Pet", "components.schemas", "Pet")]
    #[case("#/components/months/January", "components.months", "January")]
    #[case("#/paths/~1v1~1path-1", "paths", "v1|path-1")]
    #[case("#/paths/~1", "paths", "%2F")]
    #[case("#/paths/~1pets~1{id}/get", "paths.pets|{id}", "get")]
    #[case("#/definitions/Pet", "definitions", "Pet")]
    #[case("#/Pet", "", "Pet")]
    #[case("#/components/schemas/a|b", "components.schemas", "a%7Cb")]
    #[case("#/components/schemas/what?", "components.schemas", "what%3F")]
    #[case("#/components/schemas/100%", "components.schemas", "100%25")]
    #[case("#/components/schemas/..", "components.schemas", "%2E%2E")]
    #[case("#/components/my.schemas/Pet.v2", "components.my%2Eschemas", "Pet.v2")]
    fn should_map_reference_to_path(#[case] reference: &str, #[case] dir: &str, #[case] name: &str) {
        let reference = Reference::new(reference);

        let path = ref_to_path(&reference).expect("a valid reference");

        assert_eq!(path.dir(), dir);
        assert_eq!(path.name(), name);
        assert_eq!(
            path_to_ref(path.dir(), path.name()).expect("a valid path"),
            reference
        );
    }

    #[test]
    fn should_escape_slashes_without_directory_separator() {
        let reference = Reference::from_segments(["paths", "/v1/path-1"]);

        let path = ref_to_path(&reference).expect("a valid reference");

        assert!(!path.name().contains('/'));
        assert_eq!(path.to_string(), "paths/v1|path-1");
        assert_eq!(path.to_path_buf(), PathBuf::from("paths").join("v1|path-1"));
        assert_eq!(path_to_ref("paths", "v1|path-1").expect("a valid path"), reference);
    }

    #[test]
    fn should_keep_distinct_references_apart() {
        let slash = ref_to_path(&Reference::from_segments(["components", "schemas", "a/b"]))
            .expect("a valid reference");
        let pipe = ref_to_path(&Reference::from_segments(["components", "schemas", "a|b"]))
            .expect("a valid reference");

        assert_ne!(slash, pipe);
    }

    #[rstest]
    #[case("#")]
    #[case("#/components//Pet")]
    #[case("#/paths/pets")]
    fn should_reject_invalid_references(#[case] reference: &str) {
        let result = ref_to_path(&Reference::new(reference));

        assert!(matches!(result, Err(RefsplitError::InvalidReference { .. })));
    }

    #[test]
    fn should_reject_invalid_paths() {
        assert!(path_to_ref("components..schemas", "Pet").is_err());
        assert!(path_to_ref("components.schemas", "").is_err());
        assert!(path_to_ref("components.schemas", "%FF").is_err());
    }

    #[test]
    fn should_compute_import_specifiers() {
        let january = ref_to_path(&Reference::new("#/components/months/January")).expect("valid");
        let february = ref_to_path(&Reference::new("#/components/months/February")).expect("valid");
        let path_item = ref_to_path(&Reference::new("#/paths/~1v1~1path-1")).expect("valid");
        let top_level = ref_to_path(&Reference::new("#/Pet")).expect("valid");

        assert_eq!(january.import_from(&february), "./January");
        assert_eq!(january.import_from(&path_item), "../components.months/January");
        assert_eq!(january.import_from(&top_level), "./components.months/January");
        assert_eq!(top_level.import_from(&january), "../Pet");
    }
}
