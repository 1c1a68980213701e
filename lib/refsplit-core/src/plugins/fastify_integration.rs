use std::fmt::{self, Debug};
use std::path::PathBuf;

use super::{
    FilterDebug, Plugin, PluginContext, PluginOutput, SchemasWithId, UnitFilter, list,
    write_prelude,
};
use crate::RefsplitError;
use crate::emit::GENERATED_HEADER;
use crate::registry::UnitDescriptor;

/// File written by [`FastifyIntegrationPlugin`], relative to the output root.
pub const FASTIFY_INTEGRATION_FILE: &str = "fastify-integration.ts";

/// Aggregates units for registration with `fastify.addSchema`.
///
/// - `refSchemas` lists every link unit, with `$id` set to its public id, and the
///   `RefSchemas` type lists their types for `json-schema-to-ts`,
/// - `sharedSchemas` lists the requested units accepted by the shared schemas
///   filter (none without a filter).
///
/// Link units only exist in keep mode with link units enabled.
#[derive(Default)]
pub struct FastifyIntegrationPlugin {
    shared_schemas_filter: Option<UnitFilter>,
}

impl FastifyIntegrationPlugin {
    /// Creates the plugin without shared schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports the requested units accepted by `filter` as `sharedSchemas`.
    #[must_use]
    pub fn with_shared_schemas_filter(
        mut self,
        filter: impl Fn(&UnitDescriptor) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.shared_schemas_filter = Some(Box::new(filter));
        self
    }
}

impl Debug for FastifyIntegrationPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastifyIntegrationPlugin")
            .field("shared_schemas_filter", &FilterDebug(&self.shared_schemas_filter))
            .finish()
    }
}

impl Plugin for FastifyIntegrationPlugin {
    fn name(&self) -> &str {
        "fastify-integration"
    }

    fn generate(&self, context: &PluginContext<'_>) -> Result<Vec<PluginOutput>, RefsplitError> {
        let public_id = |unit: &UnitDescriptor| unit.public_id().to_string();
        let refs = SchemasWithId::new(context.metadata.links(), public_id);
        let shared = match &self.shared_schemas_filter {
            Some(filter) => SchemasWithId::new(
                context.metadata.requested().filter(|unit| filter(unit)),
                public_id,
            ),
            None => SchemasWithId::new(std::iter::empty(), public_id),
        };

        let mut contents = String::from(GENERATED_HEADER);
        contents.push_str("\n\n");
        write_prelude(&mut contents, &[&refs, &shared]);

        let ref_types = refs
            .names
            .iter()
            .map(|name| format!("typeof {name}"))
            .collect::<Vec<_>>();
        contents.push_str(
            "// Allows json-schema-to-ts to hydrate $refs via the \"references\" option\n",
        );
        contents.push_str(&format!(
            "export type RefSchemas = {};\n\n",
            list(ref_types.iter().map(String::as_str))
        ));
        contents.push_str("// $ref JSON schemas to be registered with \"fastify.addSchema\"\n");
        contents.push_str(&format!(
            "export const refSchemas = {};\n\n",
            list(refs.names.iter().map(String::as_str))
        ));
        contents.push_str("// Extra JSON schemas to be registered with \"fastify.addSchema\"\n");
        contents.push_str(&format!(
            "export const sharedSchemas = {};\n",
            list(shared.names.iter().map(String::as_str))
        ));

        Ok(vec![PluginOutput {
            path: PathBuf::from(FASTIFY_INTEGRATION_FILE),
            contents,
        }])
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::Reference;
    use crate::node::SchemaNode;
    use crate::registry::MetadataRegistry;

    fn registry() -> MetadataRegistry {
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        for (reference, is_link) in [
            ("#/components/schemas/Answer", true),
            ("#/components/months/January", true),
            ("#/components/months/March", false),
            ("#/components/schemas/Question", false),
        ] {
            registry
                .register(
                    &Reference::new(reference),
                    Arc::new(SchemaNode::from(&json!({ "type": "object" }))),
                    is_link,
                )
                .expect("should register");
        }
        registry
    }

    fn generate(plugin: &FastifyIntegrationPlugin) -> String {
        let registry = registry();
        let context = PluginContext {
            output_path: Path::new("/out"),
            metadata: &registry,
        };
        let mut outputs = plugin.generate(&context).expect("should generate");
        assert_eq!(outputs.len(), 1);
        let output = outputs.remove(0);
        assert_eq!(output.path, PathBuf::from(FASTIFY_INTEGRATION_FILE));
        output.contents
    }

    #[test]
    fn should_export_link_units() {
        let contents = generate(&FastifyIntegrationPlugin::new());

        insta::assert_snapshot!(contents, @r#"
        // File autogenerated by "refsplit". Do not edit.

        import componentsSchemasAnswer from "./components.schemas/Answer";
        import componentsMonthsJanuary from "./components.months/January";

        const componentsSchemasAnswerWithId = {
          ...componentsSchemasAnswer,
          $id: "/components/schemas/Answer",
        } as const;
        const componentsMonthsJanuaryWithId = {
          ...componentsMonthsJanuary,
          $id: "/components/months/January",
        } as const;

        // Allows json-schema-to-ts to hydrate $refs via the "references" option
        export type RefSchemas = [
          typeof componentsSchemasAnswerWithId,
          typeof componentsMonthsJanuaryWithId,
        ];

        // $ref JSON schemas to be registered with "fastify.addSchema"
        export const refSchemas = [
          componentsSchemasAnswerWithId,
          componentsMonthsJanuaryWithId,
        ];

        // Extra JSON schemas to be registered with "fastify.addSchema"
        export const sharedSchemas = [];
        "#);
    }

    #[test]
    fn should_export_filtered_shared_schemas() {
        let plugin = FastifyIntegrationPlugin::new().with_shared_schemas_filter(|unit| {
            unit.public_id().starts_with("/components/months")
        });

        let contents = generate(&plugin);

        assert!(
            contents.contains("import componentsMonthsMarch from \"./components.months/March\";")
        );
        assert!(
            contents.ends_with("export const sharedSchemas = [\n  componentsMonthsMarchWithId,\n];\n")
        );
        assert!(!contents.contains("componentsSchemasQuestion"));
    }
}
