use std::io;
use std::path::PathBuf;

use crate::Reference;

/// Errors that can occur while decomposing a schema document.
///
/// Every message starts with the `[refsplit]` prefix followed by a stable phrase
/// naming the failing precondition, so automation can match on it.
/// Use [`RefsplitError::kind`] to tell configuration mistakes from input,
/// resolution or environment problems.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum RefsplitError {
    /// A generation root was given as an absolute path.
    #[display("[refsplit] generation roots must be relative paths: \"{root}\" found")]
    AbsoluteRootPath {
        /// The offending root.
        root: String,
    },

    /// A generation root cannot be parsed as a path expression.
    #[display("[refsplit] invalid generation root \"{root}\": {reason}")]
    InvalidRootPath {
        /// The offending root.
        root: String,
        /// Why the root is invalid.
        reason: String,
    },

    /// [`Generator::generate`](crate::Generator::generate) was called without a source document.
    #[display("[refsplit] no source document configured")]
    MissingSource,

    /// Neither an output path nor a source document to derive it from was configured.
    #[display("[refsplit] no output path configured and none can be derived without a source document")]
    MissingOutputPath,

    /// The output root exists but is not a directory.
    #[display("[refsplit] output path is not a directory: {}", path.display())]
    OutputNotADirectory {
        /// The output root.
        path: PathBuf,
    },

    /// The output root could not be cleared.
    #[display("[refsplit] cannot clear output directory {}: {source}", path.display())]
    ClearOutput {
        /// The output root.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The source document does not exist.
    #[display("[refsplit] source document path doesn't exist: {}", path.display())]
    SourceNotFound {
        /// The resolved source path.
        path: PathBuf,
    },

    /// The source document exists but cannot be read.
    #[display("[refsplit] cannot read source document {}: {source}", path.display())]
    ReadSource {
        /// The source path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The source document is not valid JSON or YAML.
    #[display("[refsplit] cannot parse source document {}: {reason}", path.display())]
    ParseSource {
        /// The source path.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The source document parsed but its root is not an object.
    #[display("[refsplit] source document root must be an object: {}", path.display())]
    SourceNotAnObject {
        /// The source path.
        path: PathBuf,
    },

    /// A generation root does not exist in the document.
    #[display("[refsplit] generation root not found: \"{root}\" (missing \"{segment}\")")]
    RootNotFound {
        /// The requested root.
        root: String,
        /// The first segment that could not be resolved.
        segment: String,
    },

    /// A generation root exists but holds no schema.
    #[display("[refsplit] generation root yields no schemas: \"{root}\"")]
    EmptyRoot {
        /// The requested root.
        root: String,
    },

    /// A `$ref` cannot be resolved inside the document.
    #[display("[refsplit] unresolved reference \"{reference}\": {reason}")]
    UnresolvedReference {
        /// The reference.
        reference: Reference,
        /// Why it cannot be resolved.
        reason: String,
    },

    /// A reference cannot be mapped to a unit path.
    #[display("[refsplit] invalid reference \"{reference}\": {reason}")]
    InvalidReference {
        /// The reference.
        reference: Reference,
        /// Why the reference is invalid.
        reason: String,
    },

    /// A reference cycle was found while inlining every reference.
    #[display(
        "[refsplit] circular reference cannot be inlined: {} (use the keep reference handling)",
        format_chain(chain)
    )]
    CircularReference {
        /// The expansion chain, closed by its first element.
        chain: Vec<Reference>,
    },

    /// Reference expansion went deeper than the configured guard.
    #[display("[refsplit] reference depth exceeded {max_depth} while resolving \"{reference}\"")]
    DepthExceeded {
        /// The reference that would have exceeded the guard.
        reference: Reference,
        /// The configured maximum depth.
        max_depth: usize,
    },

    /// Two distinct references map to the same unit identity.
    ///
    /// The path codec is expected to rule this out; reaching it means a defect.
    #[display(
        "[refsplit] identity collision: \"{reference}\" and \"{existing}\" both map to {identity}"
    )]
    IdentityCollision {
        /// The reference being registered.
        reference: Reference,
        /// The already registered reference.
        existing: Reference,
        /// The colliding identity (unique name or file path).
        identity: String,
    },

    /// A unit or plugin file could not be written.
    #[display("[refsplit] cannot write unit {}: {source}", path.display())]
    WriteUnit {
        /// The target file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Broad classification of a [`RefsplitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid configuration, reported before any traversal.
    Configuration,
    /// The source document is missing or malformed.
    Input,
    /// References or roots cannot be resolved.
    Resolution,
    /// An invariant of the engine was broken.
    Defect,
    /// Writing the output failed.
    Io,
}

impl RefsplitError {
    /// Returns the class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AbsoluteRootPath { .. }
            | Self::InvalidRootPath { .. }
            | Self::MissingSource
            | Self::MissingOutputPath
            | Self::OutputNotADirectory { .. }
            | Self::ClearOutput { .. } => ErrorKind::Configuration,
            Self::SourceNotFound { .. }
            | Self::ReadSource { .. }
            | Self::ParseSource { .. }
            | Self::SourceNotAnObject { .. } => ErrorKind::Input,
            Self::RootNotFound { .. }
            | Self::EmptyRoot { .. }
            | Self::UnresolvedReference { .. }
            | Self::InvalidReference { .. }
            | Self::CircularReference { .. }
            | Self::DepthExceeded { .. } => ErrorKind::Resolution,
            Self::IdentityCollision { .. } => ErrorKind::Defect,
            Self::WriteUnit { .. } => ErrorKind::Io,
        }
    }
}

fn format_chain(chain: &[Reference]) -> String {
    chain
        .iter()
        .map(Reference::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
