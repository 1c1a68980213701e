//! The dereferenced schema tree.
//!
//! Every `$ref` replaced during dereferencing leaves a [`LinkMarker`] in the tree,
//! recording which reference the inlined subtree came from. Later stages use the
//! marker to emit a cross-unit import instead of re-serializing the subtree.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Number, Value};

use crate::Reference;

/// A node of the dereferenced schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// `null`
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(Number),
    /// A string.
    String(String),
    /// An array.
    Array(Vec<SchemaNode>),
    /// An object, keys in document order.
    Object(IndexMap<String, SchemaNode>),
    /// A subtree that originates from a `$ref`.
    Link(LinkMarker),
}

/// Marks a subtree that replaced a `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMarker {
    reference: Reference,
    target: LinkTarget,
}

/// What a [`LinkMarker`] points to.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// The dereferenced subtree, shared by every occurrence of the reference.
    Inlined(Arc<SchemaNode>),
    /// The reference closes a cycle: its subtree is still being resolved.
    Circular,
}

impl LinkMarker {
    /// A marker for an inlined subtree.
    #[must_use]
    pub fn inlined(reference: Reference, target: Arc<SchemaNode>) -> Self {
        Self {
            reference,
            target: LinkTarget::Inlined(target),
        }
    }

    /// A marker cutting a reference cycle.
    #[must_use]
    pub fn circular(reference: Reference) -> Self {
        Self {
            reference,
            target: LinkTarget::Circular,
        }
    }

    /// The original reference.
    #[must_use]
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// The link target.
    #[must_use]
    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    /// Returns `true` when this marker cuts a cycle.
    #[must_use]
    pub fn is_circular(&self) -> bool {
        matches!(self.target, LinkTarget::Circular)
    }
}

impl SchemaNode {
    /// Follows link markers down to the first non-link node.
    ///
    /// Returns `None` when the chain ends on a circular cut.
    #[must_use]
    pub fn resolved(&self) -> Option<&Self> {
        let mut current = self;
        while let Self::Link(marker) = current {
            match &marker.target {
                LinkTarget::Inlined(target) => current = target.as_ref(),
                LinkTarget::Circular => return None,
            }
        }
        Some(current)
    }

    /// Looks up `key` in this object, following link markers.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self.resolved()? {
            Self::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// The references of the outermost link markers in this tree.
    ///
    /// Link targets are not traversed: the result lists the direct dependencies
    /// of a unit whose body is this tree, in first-occurrence order.
    #[must_use]
    pub fn direct_links(&self) -> IndexSet<Reference> {
        let mut links = IndexSet::new();
        self.collect_links(&mut links);
        links
    }

    fn collect_links(&self, links: &mut IndexSet<Reference>) {
        match self {
            Self::Array(items) => items.iter().for_each(|item| item.collect_links(links)),
            Self::Object(entries) => entries.values().for_each(|value| value.collect_links(links)),
            Self::Link(marker) => {
                links.insert(marker.reference.clone());
            }
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    /// Calls `patcher` on every object of this tree, parents before children.
    ///
    /// Inlined link targets are patched too: a shared target is copied first, so
    /// other trees holding it are left untouched. Circular cuts are skipped.
    pub fn patch(&mut self, patcher: &dyn Fn(&mut Self)) {
        if matches!(self, Self::Object(_)) {
            patcher(self);
        }
        match self {
            Self::Array(items) => items.iter_mut().for_each(|item| item.patch(patcher)),
            Self::Object(entries) => entries.values_mut().for_each(|value| value.patch(patcher)),
            Self::Link(marker) => {
                if let LinkTarget::Inlined(target) = &mut marker.target {
                    Arc::make_mut(target).patch(patcher);
                }
            }
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::String(_) => {}
        }
    }

    /// Converts back to a JSON value with every link inlined.
    ///
    /// Circular cuts are written back as `{ "$ref": ... }`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(value) => Value::Number(value.clone()),
            Self::String(value) => Value::String(value.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Link(marker) => match &marker.target {
                LinkTarget::Inlined(target) => target.to_value(),
                LinkTarget::Circular => {
                    let mut reference = Map::new();
                    reference.insert(
                        "$ref".to_string(),
                        Value::String(marker.reference.to_string()),
                    );
                    Value::Object(reference)
                }
            },
        }
    }
}

impl From<&Value> for SchemaNode {
    /// Plain conversion: `$ref` objects are kept as regular objects.
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(*value),
            Value::Number(value) => Self::Number(value.clone()),
            Value::String(value) => Self::String(value.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from(value)))
                    .collect(),
            ),
        }
    }
}
