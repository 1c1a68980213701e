//! # Refsplit Core
//!
//! Split a bundled OpenAPI document into standalone, cross-linked schema modules.
//!
//! Each schema found under a *generation root* (`components.schemas`, `paths`, ...)
//! becomes one TypeScript module exporting the schema `as const`, ready for
//! `json-schema-to-ts` or fastify:
//!
//! ```ts
//! // File autogenerated by "refsplit". Do not edit.
//! import componentsMonthsJanuary from "../components.months/January";
//!
//! export default {
//!   "oneOf": [
//!     componentsMonthsJanuary
//!   ]
//! } as const;
//!
//! export const $id = "/paths/~1v1~1path-1";
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refsplit_core::{Generator, RefHandling};
//! use refsplit_core::plugins::FastifyIntegrationPlugin;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let generation = Generator::builder()
//!     .with_source("definitions/petstore.yaml")
//!     .with_roots(["components.schemas", "paths"])
//!     .with_ref_handling(RefHandling::Keep)
//!     .with_link_units(true)
//!     .with_plugin(FastifyIntegrationPlugin::new())
//!     .build()?
//!     .generate()
//!     .await?;
//!
//! println!("{} units in {}", generation.metadata.len(), generation.output_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Reference handling
//!
//! - [`RefHandling::Inline`] (default): every `$ref` is replaced by its target.
//!   Cyclic schemas are rejected.
//! - [`RefHandling::Keep`]: a `$ref` to another unit becomes an import of that
//!   unit. With [`with_link_units`](GeneratorBuilder::with_link_units), every
//!   referenced schema gets its own unit; cycle targets always do.
//!
//! ## Pipeline
//!
//! Loading ([`loader`]), dereferencing ([`Dereferencer`]), the reference walk
//! ([`walk`]) filling the [`MetadataRegistry`], emission through a
//! [`UnitSink`](emit::UnitSink), then [`plugins`].
//!
//! The document is expected to be bundled: remote references must be inlined
//! beforehand, only local `#/...` references are resolved.
//!
//! ## Error Handling
//!
//! Every failure is a [`RefsplitError`], classified by [`RefsplitError::kind`].

pub mod codec;
pub mod emit;
pub mod loader;
pub mod plugins;

mod deref;
mod error;
mod generator;
mod identity;
mod node;
mod reference;
mod registry;
mod root_path;
mod walker;

pub use self::deref::{DEFAULT_MAX_DEPTH, Dereferencer, RefHandling, ReferenceEvent};
pub use self::error::{ErrorKind, RefsplitError};
pub use self::generator::{
    DEFAULT_OUTPUT_DIR, Generation, Generator, GeneratorBuilder, Notice, Reporter,
    TracingReporter,
};
pub use self::identity::{UNIT_EXTENSION, UnitIdentity};
pub use self::node::{LinkMarker, LinkTarget, SchemaNode};
pub use self::reference::Reference;
pub use self::registry::{MetadataRegistry, UnitDescriptor};
pub use self::root_path::RootPath;
pub use self::walker::{SchemaPatcher, WalkOptions, walk, walk_with_patcher};
