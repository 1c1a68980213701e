//! Unit emission: one generated module per registered unit.

mod render;
mod sink;

pub use render::{GENERATED_HEADER, render_unit};
pub(crate) use render::quote;
pub use sink::{FsSink, MemorySink, UnitSink};

use tracing::debug;

use crate::RefsplitError;
use crate::deref::RefHandling;
use crate::registry::MetadataRegistry;

/// Renders and writes every unit of `registry`, in registration order.
///
/// The output root is expected to be cleared beforehand with [`UnitSink::clear`].
///
/// # Errors
///
/// Returns the first write error of the sink.
pub async fn emit_units<S>(
    sink: &mut S,
    registry: &MetadataRegistry,
    ref_handling: RefHandling,
) -> Result<(), RefsplitError>
where
    S: UnitSink,
{
    for unit in registry {
        let contents = render_unit(unit, registry, ref_handling);
        debug!(reference = %unit.reference(), path = %unit.file_path().display(), "writing unit");
        sink.write(unit.file_path(), &contents).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::Reference;
    use crate::node::SchemaNode;

    #[tokio::test]
    async fn should_write_one_file_per_unit() {
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        for name in ["Pet", "Owner"] {
            registry
                .register(
                    &Reference::from_segments(["components", "schemas", name]),
                    Arc::new(SchemaNode::from(&json!({ "type": "object" }))),
                    false,
                )
                .expect("should register");
        }
        let mut sink = MemorySink::new();

        emit_units(&mut sink, &registry, RefHandling::Inline)
            .await
            .expect("should emit");

        let paths = sink.files().map(|(path, _)| path).collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                Path::new("/out/components.schemas/Pet.ts"),
                Path::new("/out/components.schemas/Owner.ts"),
            ]
        );
        let pet = sink
            .get("/out/components.schemas/Pet.ts")
            .expect("Pet should be written");
        assert!(pet.starts_with(GENERATED_HEADER));
        assert!(pet.ends_with("export const $id = \"/components/schemas/Pet\";\n"));
    }
}
