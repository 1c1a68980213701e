use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::identity::UnitIdentity;
use crate::node::SchemaNode;
use crate::{Reference, RefsplitError};

/// Everything needed to emit one unit.
///
/// Dereferences to its [`UnitIdentity`].
#[derive(Debug, Clone, PartialEq, derive_more::Deref)]
pub struct UnitDescriptor {
    reference: Reference,
    is_link: bool,
    original_schema: Arc<SchemaNode>,
    #[deref]
    identity: UnitIdentity,
}

impl UnitDescriptor {
    /// The reference this unit was created from.
    #[must_use]
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Returns `true` when the unit exists because another schema links to it.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.is_link
    }

    /// The dereferenced unit body.
    #[must_use]
    pub fn original_schema(&self) -> &SchemaNode {
        &self.original_schema
    }

    /// The unit identity.
    #[must_use]
    pub fn identity(&self) -> &UnitIdentity {
        &self.identity
    }
}

/// The insertion-ordered map of every unit of a run.
///
/// Entries are only ever added: registering a reference twice returns the
/// first descriptor unchanged.
#[derive(Debug, Clone)]
pub struct MetadataRegistry {
    output_root: Arc<Path>,
    units: IndexMap<Reference, UnitDescriptor>,
}

impl MetadataRegistry {
    /// Creates an empty registry for units written under `output_root`.
    #[must_use]
    pub fn new(output_root: impl AsRef<Path>) -> Self {
        Self {
            output_root: Arc::from(output_root.as_ref()),
            units: IndexMap::new(),
        }
    }

    /// The root every unit path is derived from.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Registers a unit, or returns the existing one for `reference`.
    ///
    /// # Errors
    ///
    /// - [`RefsplitError::InvalidReference`] when no identity can be derived,
    /// - [`RefsplitError::IdentityCollision`] when another reference already owns
    ///   the same file path.
    ///
    /// Unique names differing only by the case of a segment initial (`pet` and
    /// `Pet`) get a numeric suffix: `componentsSchemasPet_2`.
    pub fn register(
        &mut self,
        reference: &Reference,
        schema: Arc<SchemaNode>,
        is_link: bool,
    ) -> Result<&UnitDescriptor, RefsplitError> {
        if self.units.contains_key(reference) {
            return self.registered(reference);
        }

        let mut identity = UnitIdentity::assign(reference, &self.output_root)?;
        if let Some(existing) = self
            .units
            .values()
            .find(|unit| unit.file_path() == identity.file_path())
        {
            return Err(RefsplitError::IdentityCollision {
                reference: reference.clone(),
                existing: existing.reference.clone(),
                identity: format!("file {}", identity.file_path().display()),
            });
        }
        if self.is_name_taken(identity.unique_name()) {
            let base = identity.clone();
            let mut suffix = 2;
            loop {
                identity = base.clone();
                identity.disambiguate(suffix);
                if !self.is_name_taken(identity.unique_name()) {
                    break;
                }
                suffix += 1;
            }
            debug!(%reference, name = identity.unique_name(), "unique name disambiguated");
        }

        debug!(%reference, is_link, name = identity.unique_name(), "registering unit");
        let descriptor = UnitDescriptor {
            reference: reference.clone(),
            is_link,
            original_schema: schema,
            identity,
        };
        match self.units.entry(reference.clone()) {
            Entry::Vacant(entry) => Ok(entry.insert(descriptor)),
            Entry::Occupied(entry) => Ok(entry.into_mut()),
        }
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.units.values().any(|unit| unit.unique_name() == name)
    }

    fn registered(&self, reference: &Reference) -> Result<&UnitDescriptor, RefsplitError> {
        self.units
            .get(reference)
            .ok_or_else(|| RefsplitError::InvalidReference {
                reference: reference.clone(),
                reason: "unit vanished from the registry".to_string(),
            })
    }

    /// The descriptor registered for `reference`.
    #[must_use]
    pub fn get(&self, reference: &Reference) -> Option<&UnitDescriptor> {
        self.units.get(reference)
    }

    /// Returns `true` when `reference` is a unit.
    #[must_use]
    pub fn contains(&self, reference: &Reference) -> bool {
        self.units.contains_key(reference)
    }

    /// The number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterates over the units in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.units.values()
    }

    /// The units registered because other schemas link to them.
    pub fn links(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.iter().filter(|unit| unit.is_link)
    }

    /// The units selected by a generation root.
    pub fn requested(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.iter().filter(|unit| !unit.is_link)
    }
}

impl<'a> IntoIterator for &'a MetadataRegistry {
    type Item = &'a UnitDescriptor;
    type IntoIter = indexmap::map::Values<'a, Reference, UnitDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.values()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema() -> Arc<SchemaNode> {
        Arc::new(SchemaNode::from(&json!({ "type": "object" })))
    }

    #[test]
    fn should_register_once() {
        let mut registry = MetadataRegistry::new("/out");
        let reference = Reference::new("#/components/schemas/Foo");

        let first = registry
            .register(&reference, schema(), true)
            .expect("should register")
            .clone();
        let other = Arc::new(SchemaNode::from(&json!({ "type": "string" })));
        let second = registry
            .register(&reference, other, false)
            .expect("should register")
            .clone();

        assert_eq!(first, second);
        assert!(second.is_link());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_expose_identity_through_descriptor() {
        let mut registry = MetadataRegistry::new("/absolute/output/path");
        let reference = Reference::new("#/components/schemas/Foo");

        let unit = registry
            .register(&reference, schema(), true)
            .expect("should register");

        assert_eq!(unit.reference(), &reference);
        assert_eq!(unit.unique_name(), "componentsSchemasFoo");
        assert_eq!(unit.public_id(), "/components/schemas/Foo");
        assert_eq!(
            unit.file_path(),
            Path::new("/absolute/output/path/components.schemas/Foo.ts")
        );
        assert_eq!(unit.original_schema().to_value(), json!({ "type": "object" }));
    }

    #[test]
    fn should_detect_identity_collisions() {
        let mut registry = MetadataRegistry::new("/out");
        registry
            .register(&Reference::new("#/components/schemas/Pet"), schema(), false)
            .expect("should register");

        let result = registry.register(&Reference::new("components/schemas/Pet"), schema(), false);

        let Err(RefsplitError::IdentityCollision {
            reference,
            existing,
            ..
        }) = result
        else {
            panic!("expected a collision, got {result:?}");
        };
        assert_eq!(reference.as_str(), "components/schemas/Pet");
        assert_eq!(existing.as_str(), "#/components/schemas/Pet");
    }

    #[test]
    fn should_suffix_names_differing_by_initial_case() {
        let mut registry = MetadataRegistry::new("/out");
        let names = ["Pet", "pet", "PetType", "pet_type"]
            .into_iter()
            .map(|name| {
                registry
                    .register(
                        &Reference::from_segments(["components", "schemas", name]),
                        schema(),
                        false,
                    )
                    .expect("should register")
                    .unique_name()
                    .to_string()
            })
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                "componentsSchemasPet",
                "componentsSchemasPet_2",
                "componentsSchemasPetType",
                "componentsSchemasPet_5F_type",
            ]
        );
    }

    #[test]
    fn should_keep_registration_order_and_filters() {
        let mut registry = MetadataRegistry::new("/out");
        for (reference, is_link) in [
            ("#/components/months/January", true),
            ("#/components/schemas/Answer", false),
            ("#/components/months/February", true),
        ] {
            registry
                .register(&Reference::new(reference), schema(), is_link)
                .expect("should register");
        }

        let names = |units: Vec<&UnitDescriptor>| {
            units
                .into_iter()
                .map(|unit| unit.unique_name().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(registry.iter().collect()),
            vec![
                "componentsMonthsJanuary",
                "componentsSchemasAnswer",
                "componentsMonthsFebruary"
            ]
        );
        assert_eq!(
            names(registry.links().collect()),
            vec!["componentsMonthsJanuary", "componentsMonthsFebruary"]
        );
        assert_eq!(names(registry.requested().collect()), vec!["componentsSchemasAnswer"]);
        assert!(registry.contains(&Reference::new("#/components/schemas/Answer")));
        assert!(!registry.contains(&Reference::new("#/components/months/March")));
    }
}
