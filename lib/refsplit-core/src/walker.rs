//! Reference-resolution walk: from a bundled document to the registry of units.

use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::PATHS_SECTION;
use crate::deref::{DEFAULT_MAX_DEPTH, Dereferencer, RefHandling, ReferenceEvent};
use crate::node::SchemaNode;
use crate::registry::MetadataRegistry;
use crate::root_path::RootPath;
use crate::{Reference, RefsplitError};

/// Knobs of the reference-resolution walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalkOptions {
    /// How nested references are handled.
    pub ref_handling: RefHandling,
    /// In keep mode, turn every dereferenced reference into a link unit.
    ///
    /// Cycle targets become link units regardless.
    pub link_units: bool,
    /// Warn instead of failing on roots that are missing or hold no schema.
    pub allow_empty_roots: bool,
    /// Maximum nesting of reference expansion.
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            ref_handling: RefHandling::default(),
            link_units: false,
            allow_empty_roots: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A callback applied to every unit body before it is registered.
///
/// It is called on each object of the body, see [`SchemaNode::patch`].
pub struct SchemaPatcher(Box<dyn Fn(&mut SchemaNode) + Send + Sync>);

impl SchemaPatcher {
    /// Wraps a patch function.
    pub fn new(patcher: impl Fn(&mut SchemaNode) + Send + Sync + 'static) -> Self {
        Self(Box::new(patcher))
    }

    /// Patches `schema` in place.
    pub fn apply(&self, schema: &mut SchemaNode) {
        schema.patch(&*self.0);
    }
}

impl Debug for SchemaPatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SchemaPatcher(<fn>)")
    }
}

/// Dereferences `document` and registers one unit per schema under each root.
///
/// Same as [`walk_with_patcher`] without patcher.
///
/// # Errors
///
/// See [`walk_with_patcher`].
pub fn walk(
    document: &Value,
    roots: &[RootPath],
    output_root: &Path,
    options: WalkOptions,
) -> Result<MetadataRegistry, RefsplitError> {
    walk_with_patcher(document, roots, output_root, options, None)
}

/// Dereferences `document` and registers one unit per schema under each root,
/// applying `patcher` to each unit body.
///
/// In keep mode, link units are registered first, in dereferencing order; the
/// requested units follow, root by root, in document order.
///
/// # Errors
///
/// Any dereferencing error, [`RefsplitError::RootNotFound`] and
/// [`RefsplitError::EmptyRoot`] (unless empty roots are allowed), and
/// registration errors.
///
/// Extension keys (`x-...`) of the `paths` section are not path items and are
/// skipped.
pub fn walk_with_patcher(
    document: &Value,
    roots: &[RootPath],
    output_root: &Path,
    options: WalkOptions,
    patcher: Option<&SchemaPatcher>,
) -> Result<MetadataRegistry, RefsplitError> {
    let body = |schema: &SchemaNode| {
        let mut schema = schema.clone();
        if let Some(patcher) = patcher {
            patcher.apply(&mut schema);
        }
        Arc::new(schema)
    };

    let mut registry = MetadataRegistry::new(output_root);
    if roots.is_empty() {
        return Ok(registry);
    }

    let keep = options.ref_handling == RefHandling::Keep;
    let mut circular = HashSet::<Reference>::new();

    let tree = Dereferencer::new(document)
        .with_handling(options.ref_handling)
        .with_max_depth(options.max_depth)
        .dereference(|event| {
            if !keep {
                return Ok(());
            }
            match event {
                ReferenceEvent::Circular { reference } => {
                    circular.insert(reference.clone());
                }
                ReferenceEvent::Inlined { reference, target } => {
                    if (options.link_units || circular.contains(reference))
                        && !registry.contains(reference)
                    {
                        registry.register(reference, body(target.as_ref()), true)?;
                    }
                }
            }
            Ok(())
        })?;

    for root in roots {
        let node = match root.resolve(&tree) {
            Ok(node) => node,
            Err(err) if options.allow_empty_roots => {
                warn!(%root, %err, "skipping generation root");
                continue;
            }
            Err(err) => return Err(err),
        };

        let children = children(node);
        if children.is_empty() {
            if options.allow_empty_roots {
                warn!(%root, "generation root yields no schemas");
                continue;
            }
            return Err(RefsplitError::EmptyRoot {
                root: root.to_string(),
            });
        }

        debug!(%root, count = children.len(), "registering requested schemas");
        let is_paths = root.segments() == [PATHS_SECTION];
        for (key, child) in children {
            if is_paths && key.starts_with("x-") {
                debug!(%root, %key, "skipping paths extension");
                continue;
            }
            let reference = root.child_reference(&key);
            if !registry.contains(&reference) {
                registry.register(&reference, body(child), false)?;
            }
        }
    }

    Ok(registry)
}

fn children(node: &SchemaNode) -> Vec<(String, &SchemaNode)> {
    match node.resolved() {
        Some(SchemaNode::Object(entries)) => entries
            .iter()
            .map(|(key, value)| (key.clone(), value))
            .collect(),
        Some(SchemaNode::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => Vec::new(),
    }
}
