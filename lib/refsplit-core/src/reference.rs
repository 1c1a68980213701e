use std::borrow::Cow;

use jsonptr::{Pointer, PointerBuf, Token};

use crate::RefsplitError;

/// A reference to a schema location in the source document.
///
/// Either a local JSON-pointer reference (`#/components/schemas/Pet`) or the
/// marker-less logical form (`components/schemas/Pet`). Both forms address the
/// same pointer and therefore share the same [`public id`](Self::public_id).
///
/// Two occurrences of the same string denote the same logical schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{_0}")]
pub struct Reference(String);

impl Reference {
    /// Wraps a raw reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Builds the local reference `#/<segments...>`, escaping each segment as a JSON pointer token.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pointer = PointerBuf::from_tokens(
            segments
                .into_iter()
                .map(|segment| Token::new(segment.into())),
        );
        Self(format!("#{pointer}"))
    }

    /// The raw reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for references local to the document (`#...`).
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with('#')
    }

    /// The JSON pointer part of the reference, always root-relative.
    ///
    /// `#/components/schemas/Pet` and `components/schemas/Pet` both yield
    /// `/components/schemas/Pet`; `#` yields the empty (root) pointer.
    #[must_use]
    pub fn pointer(&self) -> Cow<'_, str> {
        let raw = self.0.strip_prefix('#').unwrap_or(&self.0);
        if raw.is_empty() || raw.starts_with('/') {
            Cow::Borrowed(raw)
        } else {
            Cow::Owned(format!("/{raw}"))
        }
    }

    /// The identity exposed to consumers, e.g. `/components/schemas/Pet`.
    #[must_use]
    pub fn public_id(&self) -> String {
        self.pointer().into_owned()
    }

    /// The decoded pointer segments (`~1` becomes `/`, `~0` becomes `~`).
    ///
    /// # Errors
    ///
    /// Returns [`RefsplitError::InvalidReference`] when the pointer is malformed.
    pub fn segments(&self) -> Result<Vec<String>, RefsplitError> {
        let pointer = self.pointer();
        let pointer = Pointer::parse(pointer.as_ref()).map_err(|err| RefsplitError::InvalidReference {
            reference: self.clone(),
            reason: format!("malformed JSON pointer: {err}"),
        })?;
        let segments = pointer
            .tokens()
            .map(|token| token.decoded().into_owned())
            .collect();
        Ok(segments)
    }
}

impl From<&str> for Reference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Reference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
