//! Plugins: extra files generated from the finished registry.
//!
//! A [`Plugin`] only reads the [`PluginContext`]; the files it returns are written
//! through the same sink as the units, after every unit.

mod fastify_integration;
mod fastify_type_provider;

use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};

pub use fastify_integration::{FASTIFY_INTEGRATION_FILE, FastifyIntegrationPlugin};
pub use fastify_type_provider::{FASTIFY_TYPE_PROVIDER_FILE, FastifyTypeProviderPlugin};

use crate::RefsplitError;
use crate::emit::quote;
use crate::registry::{MetadataRegistry, UnitDescriptor};

/// What a plugin can see of a finished run.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    /// The output root.
    pub output_path: &'a Path,
    /// Every unit of the run.
    pub metadata: &'a MetadataRegistry,
}

/// A file produced by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOutput {
    /// Path relative to the output root.
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

/// Generates extra files once every unit is known.
pub trait Plugin: Debug + Send + Sync {
    /// A name used in logs.
    fn name(&self) -> &str;

    /// Produces the plugin files.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn generate(&self, context: &PluginContext<'_>) -> Result<Vec<PluginOutput>, RefsplitError>;
}

/// A predicate over units, as used by plugin filters.
pub type UnitFilter = Box<dyn Fn(&UnitDescriptor) -> bool + Send + Sync>;

/// Units re-exported with an injected `$id`, from a module at the output root.
struct SchemasWithId {
    imports: Vec<String>,
    declarations: Vec<String>,
    names: Vec<String>,
}

impl SchemasWithId {
    fn new<'a>(
        units: impl IntoIterator<Item = &'a UnitDescriptor>,
        id_of: impl Fn(&UnitDescriptor) -> String,
    ) -> Self {
        let mut result = Self {
            imports: Vec::new(),
            declarations: Vec::new(),
            names: Vec::new(),
        };
        for unit in units {
            result.push(unit, &id_of(unit));
        }
        result
    }

    fn push(&mut self, unit: &UnitDescriptor, id: &str) {
        let name = unit.unique_name();
        let with_id = format!("{name}WithId");
        self.imports.push(format!(
            "import {name} from {};",
            quote(&format!("./{}", unit.relative_path()))
        ));
        self.declarations.push(format!(
            "const {with_id} = {{\n  ...{name},\n  $id: {},\n}} as const;",
            quote(id)
        ));
        self.names.push(with_id);
    }
}

/// Writes the imports, then the `$id` declarations, of every group.
fn write_prelude(out: &mut String, groups: &[&SchemasWithId]) {
    let imports = groups.iter().flat_map(|group| &group.imports);
    let declarations = groups.iter().flat_map(|group| &group.declarations);
    let mut any = false;
    for import in imports {
        any = true;
        out.push_str(import);
        out.push('\n');
    }
    if any {
        out.push('\n');
    }
    for declaration in declarations {
        out.push_str(declaration);
        out.push('\n');
    }
    if any {
        out.push('\n');
    }
}

/// A multi-line TypeScript list: `[]` or one item per line with trailing commas.
fn list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::from("[");
    let mut empty = true;
    for item in items {
        empty = false;
        out.push_str("\n  ");
        out.push_str(item);
        out.push(',');
    }
    if !empty {
        out.push('\n');
    }
    out.push(']');
    out
}

/// Debug stand-in for an optional [`UnitFilter`].
struct FilterDebug<'a>(&'a Option<UnitFilter>);

impl Debug for FilterDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "Some(<filter>)" } else { "None" })
    }
}
