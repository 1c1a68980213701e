use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use crate::Reference;
use crate::deref::RefHandling;
use crate::node::{LinkTarget, SchemaNode};
use crate::registry::{MetadataRegistry, UnitDescriptor};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// File autogenerated by \"refsplit\". Do not edit.";

const INDENT: &str = "  ";

/// Renders `unit` as a module exporting its schema and its `$id`.
///
/// In keep mode, links to other registered units become imports. Every other
/// inlined subtree opens with a `// $ref: "..."` comment naming its origin.
#[must_use]
pub fn render_unit(
    unit: &UnitDescriptor,
    registry: &MetadataRegistry,
    ref_handling: RefHandling,
) -> String {
    let mut renderer = Renderer {
        unit,
        registry,
        keep: ref_handling == RefHandling::Keep,
        imports: IndexMap::new(),
    };

    let schema = unit.original_schema();
    let mut body = String::new();
    renderer.node(schema, 0, &mut body);
    let body_is_import = renderer.imported_unit(schema).is_some();

    let mut module = String::new();
    module.push_str(GENERATED_HEADER);
    module.push('\n');
    for (name, specifier) in &renderer.imports {
        module.push_str(&format!("import {name} from {};\n", quote(specifier)));
    }
    module.push('\n');
    if body_is_import {
        module.push_str(&format!("export default {body};\n"));
    } else {
        module.push_str(&format!("export default {body} as const;\n"));
    }
    module.push('\n');
    module.push_str(&format!("export const $id = {};\n", quote(unit.public_id())));
    module
}

/// JSON quoting, valid as a TypeScript string literal.
pub(crate) fn quote(value: &str) -> String {
    Value::from(value).to_string()
}

struct Renderer<'a> {
    unit: &'a UnitDescriptor,
    registry: &'a MetadataRegistry,
    keep: bool,
    imports: IndexMap<String, String>,
}

impl Renderer<'_> {
    /// The unit imported in place of `node`, if any.
    fn imported_unit(&self, node: &SchemaNode) -> Option<&UnitDescriptor> {
        let SchemaNode::Link(marker) = node else {
            return None;
        };
        if !self.keep || marker.reference() == self.unit.reference() {
            return None;
        }
        self.registry.get(marker.reference())
    }

    fn node(&mut self, node: &SchemaNode, depth: usize, out: &mut String) {
        self.value(node, depth, out, None);
    }

    /// Renders `node`; `origin` is the reference an object or array was inlined from.
    fn value(
        &mut self,
        node: &SchemaNode,
        depth: usize,
        out: &mut String,
        origin: Option<&Reference>,
    ) {
        match node {
            SchemaNode::Null => out.push_str("null"),
            SchemaNode::Bool(value) => out.push_str(&value.to_string()),
            SchemaNode::Number(value) => out.push_str(&value.to_string()),
            SchemaNode::String(value) => out.push_str(&quote(value)),
            SchemaNode::Array(items) => {
                if items.is_empty() && origin.is_none() {
                    out.push_str("[]");
                    return;
                }
                out.push('[');
                push_origin(out, depth + 1, origin);
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    out.push('\n');
                    push_indent(out, depth + 1);
                    self.node(item, depth + 1, out);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push(']');
            }
            SchemaNode::Object(entries) => {
                if entries.is_empty() && origin.is_none() {
                    out.push_str("{}");
                    return;
                }
                out.push('{');
                push_origin(out, depth + 1, origin);
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    out.push('\n');
                    push_indent(out, depth + 1);
                    out.push_str(&quote(key));
                    out.push_str(": ");
                    self.node(value, depth + 1, out);
                }
                out.push('\n');
                push_indent(out, depth);
                out.push('}');
            }
            SchemaNode::Link(marker) => {
                if let Some(target) = self.imported_unit(node) {
                    let name = target.unique_name().to_string();
                    let specifier = target
                        .relative_path()
                        .import_from(self.unit.relative_path());
                    out.push_str(&name);
                    self.imports.entry(name).or_insert(specifier);
                    return;
                }

                let reference = marker.reference();
                let is_self = self.keep && reference == self.unit.reference();
                match marker.target() {
                    LinkTarget::Inlined(_) if is_self => ref_object(reference, depth, out),
                    LinkTarget::Inlined(target) => {
                        self.value(target, depth, out, Some(reference));
                    }
                    LinkTarget::Circular => {
                        if !is_self {
                            warn!(
                                unit = %self.unit.reference(),
                                %reference,
                                "circular reference to a schema that is not a unit"
                            );
                        }
                        ref_object(reference, depth, out);
                    }
                }
            }
        }
    }
}

/// Writes the `// $ref` comment line opening an inlined object or array.
fn push_origin(out: &mut String, depth: usize, origin: Option<&Reference>) {
    if let Some(reference) = origin {
        out.push('\n');
        push_indent(out, depth);
        out.push_str("// $ref: ");
        out.push_str(&quote(reference.as_str()));
    }
}

fn ref_object(reference: &Reference, depth: usize, out: &mut String) {
    out.push_str("{\n");
    push_indent(out, depth + 1);
    out.push_str("\"$ref\": ");
    out.push_str(&quote(&reference.public_id()));
    out.push('\n');
    push_indent(out, depth);
    out.push('}');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::node::LinkMarker;

    fn months() -> (Reference, Arc<SchemaNode>, Reference, Arc<SchemaNode>) {
        (
            Reference::new("#/components/months/January"),
            Arc::new(SchemaNode::from(
                &json!({ "description": "January description", "type": "object" }),
            )),
            Reference::new("#/components/months/February"),
            Arc::new(SchemaNode::from(
                &json!({ "description": "February description", "type": "object" }),
            )),
        )
    }

    fn link(reference: &Reference, target: &Arc<SchemaNode>) -> SchemaNode {
        SchemaNode::Link(LinkMarker::inlined(reference.clone(), Arc::clone(target)))
    }

    fn path_item(
        january: &Reference,
        january_schema: &Arc<SchemaNode>,
        february: &Reference,
        february_schema: &Arc<SchemaNode>,
    ) -> Arc<SchemaNode> {
        let mut schema = IndexMap::new();
        schema.insert(
            "oneOf".to_string(),
            SchemaNode::Array(vec![
                link(january, january_schema),
                link(february, february_schema),
                link(january, january_schema),
            ]),
        );
        Arc::new(SchemaNode::Object(schema))
    }

    #[test]
    fn should_render_imports_in_keep_mode() {
        let (january, january_schema, february, february_schema) = months();
        let path = Reference::from_segments(["paths", "/v1/path-1"]);
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        registry
            .register(&january, Arc::clone(&january_schema), true)
            .expect("should register");
        registry
            .register(&february, Arc::clone(&february_schema), true)
            .expect("should register");
        let schema = path_item(&january, &january_schema, &february, &february_schema);
        let unit = registry
            .register(&path, schema, false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Keep);

        insta::assert_snapshot!(rendered, @r#"
        // File autogenerated by "refsplit". Do not edit.
        import componentsMonthsJanuary from "../components.months/January";
        import componentsMonthsFebruary from "../components.months/February";

        export default {
          "oneOf": [
            componentsMonthsJanuary,
            componentsMonthsFebruary,
            componentsMonthsJanuary
          ]
        } as const;

        export const $id = "/paths/~1v1~1path-1";
        "#);
    }

    #[test]
    fn should_inline_everything_in_inline_mode() {
        let (january, january_schema, february, february_schema) = months();
        let path = Reference::from_segments(["paths", "/v1/path-1"]);
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        registry
            .register(&january, Arc::clone(&january_schema), true)
            .expect("should register");
        let schema = path_item(&january, &january_schema, &february, &february_schema);
        let unit = registry
            .register(&path, schema, false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Inline);

        insta::assert_snapshot!(rendered, @r##"
        // File autogenerated by "refsplit". Do not edit.

        export default {
          "oneOf": [
            {
              // $ref: "#/components/months/January"
              "description": "January description",
              "type": "object"
            },
            {
              // $ref: "#/components/months/February"
              "description": "February description",
              "type": "object"
            },
            {
              // $ref: "#/components/months/January"
              "description": "January description",
              "type": "object"
            }
          ]
        } as const;

        export const $id = "/paths/~1v1~1path-1";
        "##);
    }

    #[test]
    fn should_comment_inlined_targets_outside_the_registry() {
        let (january, january_schema, february, february_schema) = months();
        let path = Reference::from_segments(["paths", "/v1/path-1"]);
        let empty = Reference::new("#/components/schemas/Empty");
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        registry
            .register(&january, Arc::clone(&january_schema), true)
            .expect("should register");
        let mut schema = IndexMap::new();
        schema.insert(
            "oneOf".to_string(),
            SchemaNode::Array(vec![
                link(&january, &january_schema),
                link(&february, &february_schema),
            ]),
        );
        schema.insert(
            "not".to_string(),
            link(&empty, &Arc::new(SchemaNode::Object(IndexMap::new()))),
        );
        schema.insert(
            "title".to_string(),
            link(&empty, &Arc::new(SchemaNode::String("Title".to_string()))),
        );
        let unit = registry
            .register(&path, Arc::new(SchemaNode::Object(schema)), false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Keep);

        insta::assert_snapshot!(rendered, @r##"
        // File autogenerated by "refsplit". Do not edit.
        import componentsMonthsJanuary from "../components.months/January";

        export default {
          "oneOf": [
            componentsMonthsJanuary,
            {
              // $ref: "#/components/months/February"
              "description": "February description",
              "type": "object"
            }
          ],
          "not": {
            // $ref: "#/components/schemas/Empty"
          },
          "title": "Title"
        } as const;

        export const $id = "/paths/~1v1~1path-1";
        "##);
    }

    #[test]
    fn should_render_self_links_as_refs() {
        let tree = Reference::new("#/components/schemas/Tree");
        let inner = Arc::new(SchemaNode::from(&json!({ "type": "array" })));
        let mut schema = IndexMap::new();
        schema.insert("type".to_string(), SchemaNode::String("array".to_string()));
        schema.insert(
            "items".to_string(),
            SchemaNode::Link(LinkMarker::inlined(tree.clone(), inner)),
        );
        schema.insert(
            "children".to_string(),
            SchemaNode::Link(LinkMarker::circular(tree.clone())),
        );
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        let unit = registry
            .register(&tree, Arc::new(SchemaNode::Object(schema)), false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Keep);

        insta::assert_snapshot!(rendered, @r#"
        // File autogenerated by "refsplit". Do not edit.

        export default {
          "type": "array",
          "items": {
            "$ref": "/components/schemas/Tree"
          },
          "children": {
            "$ref": "/components/schemas/Tree"
          }
        } as const;

        export const $id = "/components/schemas/Tree";
        "#);
    }

    #[test]
    fn should_export_aliased_units_without_const_assertion() {
        let (january, january_schema, ..) = months();
        let alias = Reference::new("#/components/schemas/FirstMonth");
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        registry
            .register(&january, Arc::clone(&january_schema), true)
            .expect("should register");
        let schema = Arc::new(SchemaNode::Link(LinkMarker::inlined(
            january.clone(),
            january_schema,
        )));
        let unit = registry
            .register(&alias, schema, false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Keep);

        insta::assert_snapshot!(rendered, @r#"
        // File autogenerated by "refsplit". Do not edit.
        import componentsMonthsJanuary from "../components.months/January";

        export default componentsMonthsJanuary;

        export const $id = "/components/schemas/FirstMonth";
        "#);
    }

    #[test]
    fn should_escape_strings_and_keep_scalars() {
        let reference = Reference::new("#/components/schemas/Scalars");
        let schema = Arc::new(SchemaNode::from(&json!({
            "description": "say \"hi\"\nthen leave",
            "enum": [1, 2.5, true, null],
            "properties": {},
            "required": []
        })));
        let mut registry = MetadataRegistry::new(Path::new("/out"));
        let unit = registry
            .register(&reference, schema, false)
            .expect("should register")
            .clone();

        let rendered = render_unit(&unit, &registry, RefHandling::Inline);

        insta::assert_snapshot!(rendered, @r#"
        // File autogenerated by "refsplit". Do not edit.

        export default {
          "description": "say \"hi\"\nthen leave",
          "enum": [
            1,
            2.5,
            true,
            null
          ],
          "properties": {},
          "required": []
        } as const;

        export const $id = "/components/schemas/Scalars";
        "#);
    }
}
