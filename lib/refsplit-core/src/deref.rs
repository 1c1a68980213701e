//! Local `$ref` dereferencing.
//!
//! The [`Dereferencer`] expects a bundled document (remote references already
//! inlined) and replaces every local `$ref` with its resolved subtree wrapped in a
//! [`LinkMarker`]. Each replacement is reported to a callback.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use jsonptr::Pointer;
use jsonptr::resolve::Resolve;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::node::{LinkMarker, SchemaNode};
use crate::{Reference, RefsplitError};

/// Default bound on nested reference expansion.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const REF_KEYWORD: &str = "$ref";

/// How nested references are turned into units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefHandling {
    /// Every reference is inlined at its point of use.
    ///
    /// Cyclic schemas cannot be inlined and fail with
    /// [`RefsplitError::CircularReference`].
    #[default]
    Inline,
    /// References that are units are emitted as imports; cycles are cut.
    Keep,
}

/// A dereferenced `$ref`, reported while the tree is built.
#[derive(Debug, Clone, Copy)]
pub enum ReferenceEvent<'a> {
    /// The reference was replaced by its fully dereferenced subtree.
    Inlined {
        /// The original reference.
        reference: &'a Reference,
        /// The inlined subtree.
        target: &'a Arc<SchemaNode>,
    },
    /// The reference closes a cycle and was replaced by a circular cut.
    Circular {
        /// The original reference.
        reference: &'a Reference,
    },
}

/// Replaces local references of a bundled document with link markers.
#[derive(Debug)]
pub struct Dereferencer<'doc> {
    document: &'doc Value,
    handling: RefHandling,
    max_depth: usize,
    stack: Vec<Reference>,
    cache: HashMap<Reference, Arc<SchemaNode>>,
}

impl<'doc> Dereferencer<'doc> {
    /// Creates a dereferencer for `document`, in inline mode.
    #[must_use]
    pub fn new(document: &'doc Value) -> Self {
        Self {
            document,
            handling: RefHandling::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            stack: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Sets the reference handling, which decides what happens on cycles.
    #[must_use]
    pub fn with_handling(mut self, handling: RefHandling) -> Self {
        self.handling = handling;
        self
    }

    /// Sets the maximum nesting of reference expansion.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Dereferences the whole document.
    ///
    /// `on_reference` is called for each replaced `$ref`, after its subtree has
    /// been fully dereferenced, so inner references are reported first.
    ///
    /// # Errors
    ///
    /// - [`RefsplitError::UnresolvedReference`] for external references and
    ///   pointers that do not resolve,
    /// - [`RefsplitError::CircularReference`] on a cycle in inline mode,
    /// - [`RefsplitError::DepthExceeded`] when expansion goes deeper than the guard,
    /// - any error returned by `on_reference`.
    pub fn dereference<F>(mut self, mut on_reference: F) -> Result<SchemaNode, RefsplitError>
    where
        F: FnMut(ReferenceEvent<'_>) -> Result<(), RefsplitError>,
    {
        let document = self.document;
        self.node(document, &mut on_reference)
    }

    fn node<F>(
        &mut self,
        value: &'doc Value,
        on_reference: &mut F,
    ) -> Result<SchemaNode, RefsplitError>
    where
        F: FnMut(ReferenceEvent<'_>) -> Result<(), RefsplitError>,
    {
        match value {
            Value::Object(entries) => {
                if let Some(Value::String(reference)) = entries.get(REF_KEYWORD) {
                    if entries.len() > 1 {
                        warn!(%reference, "keywords next to $ref are ignored");
                    }
                    return self.link(Reference::new(reference.as_str()), on_reference);
                }

                let mut node = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    node.insert(key.clone(), self.node(value, on_reference)?);
                }
                Ok(SchemaNode::Object(node))
            }
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.node(item, on_reference))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SchemaNode::Array(items))
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(SchemaNode::from(value))
            }
        }
    }

    fn link<F>(
        &mut self,
        reference: Reference,
        on_reference: &mut F,
    ) -> Result<SchemaNode, RefsplitError>
    where
        F: FnMut(ReferenceEvent<'_>) -> Result<(), RefsplitError>,
    {
        if !reference.is_local() {
            return Err(RefsplitError::UnresolvedReference {
                reference,
                reason: "external references must be bundled before splitting".to_string(),
            });
        }

        if let Some(position) = self.stack.iter().position(|it| it == &reference) {
            return match self.handling {
                RefHandling::Inline => {
                    let mut chain = self.stack.iter().skip(position).cloned().collect::<Vec<_>>();
                    chain.push(reference);
                    Err(RefsplitError::CircularReference { chain })
                }
                RefHandling::Keep => {
                    debug!(%reference, "cutting reference cycle");
                    on_reference(ReferenceEvent::Circular {
                        reference: &reference,
                    })?;
                    Ok(SchemaNode::Link(LinkMarker::circular(reference)))
                }
            };
        }

        let target = if let Some(target) = self.cache.get(&reference) {
            Arc::clone(target)
        } else {
            let target = Arc::new(self.expand(&reference, on_reference)?);
            self.cache.insert(reference.clone(), Arc::clone(&target));
            target
        };

        on_reference(ReferenceEvent::Inlined {
            reference: &reference,
            target: &target,
        })?;
        Ok(SchemaNode::Link(LinkMarker::inlined(reference, target)))
    }

    fn expand<F>(
        &mut self,
        reference: &Reference,
        on_reference: &mut F,
    ) -> Result<SchemaNode, RefsplitError>
    where
        F: FnMut(ReferenceEvent<'_>) -> Result<(), RefsplitError>,
    {
        if self.stack.len() >= self.max_depth {
            return Err(RefsplitError::DepthExceeded {
                reference: reference.clone(),
                max_depth: self.max_depth,
            });
        }

        let unresolved = |reason: String| RefsplitError::UnresolvedReference {
            reference: reference.clone(),
            reason,
        };
        let pointer = reference.pointer();
        let pointer = Pointer::parse(pointer.as_ref())
            .map_err(|err| unresolved(format!("malformed JSON pointer: {err}")))?;
        let document = self.document;
        let value = document
            .resolve(pointer)
            .map_err(|err| unresolved(err.to_string()))?;

        debug!(%reference, depth = self.stack.len(), "expanding reference");
        self.stack.push(reference.clone());
        let node = self.node(value, on_reference);
        self.stack.pop();
        node
    }
}
