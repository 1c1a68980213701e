use std::path::PathBuf;

use super::{Plugin, PluginContext, PluginOutput, SchemasWithId, list, write_prelude};
use crate::RefsplitError;
use crate::emit::GENERATED_HEADER;
use crate::registry::UnitDescriptor;

/// File written by [`FastifyTypeProviderPlugin`], relative to the output root.
pub const FASTIFY_TYPE_PROVIDER_FILE: &str = "fastifyTypeProvider.ts";

/// Exports link units for the fastify `json-schema-to-ts` type provider.
///
/// Each schema gets its raw reference (`#/components/schemas/Pet`) as `$id` so
/// the provider can hydrate `$ref`s left in route schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastifyTypeProviderPlugin;

impl Plugin for FastifyTypeProviderPlugin {
    fn name(&self) -> &str {
        "fastify-type-provider"
    }

    fn generate(&self, context: &PluginContext<'_>) -> Result<Vec<PluginOutput>, RefsplitError> {
        let references = SchemasWithId::new(context.metadata.links(), |unit: &UnitDescriptor| {
            unit.reference().to_string()
        });

        let mut contents = String::from(GENERATED_HEADER);
        contents.push_str("\n\n");
        write_prelude(&mut contents, &[&references]);

        let types = references
            .names
            .iter()
            .map(|name| format!("typeof {name}"))
            .collect::<Vec<_>>();
        contents.push_str(&format!(
            "export type References = {};\n\n",
            list(types.iter().map(String::as_str))
        ));
        contents.push_str(&format!(
            "export const referenceSchemas = {};\n",
            list(references.names.iter().map(String::as_str))
        ));

        Ok(vec![PluginOutput {
            path: PathBuf::from(FASTIFY_TYPE_PROVIDER_FILE),
            contents,
        }])
    }
}
