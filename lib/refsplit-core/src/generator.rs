use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::RefsplitError;
use crate::deref::RefHandling;
use crate::emit::{FsSink, UnitSink, emit_units};
use crate::loader::{load_document, resolve_source};
use crate::plugins::{Plugin, PluginContext};
use crate::registry::MetadataRegistry;
use crate::root_path::RootPath;
use crate::node::SchemaNode;
use crate::walker::{SchemaPatcher, WalkOptions, walk_with_patcher};

/// Directory created next to the source document when no output path is given.
pub const DEFAULT_OUTPUT_DIR: &str = "schemas-autogenerated";

/// A user-facing notice of a run.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum Notice {
    /// The run was configured without any generation root.
    #[display("[refsplit] no schemas will be generated since no generation root was requested")]
    NoRootsRequested,
    /// The run completed with at least one generation root.
    #[display("[refsplit] {units} schema units generated at {}", output_path.display())]
    Generated {
        /// The output root.
        output_path: PathBuf,
        /// The number of units written.
        units: usize,
    },
}

/// Receives the notices of a run.
pub trait Reporter: Debug + Send + Sync {
    /// Called once per notice, unless the generator is silent.
    fn report(&self, notice: &Notice);
}

/// Reports notices as `info` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, notice: &Notice) {
        info!("{notice}");
    }
}

/// The outcome of a run.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The output root.
    pub output_path: PathBuf,
    /// Every unit written.
    pub metadata: MetadataRegistry,
}

/// Splits a bundled schema document into one module per schema.
///
/// # Example
///
/// ```rust,no_run
/// use refsplit_core::{Generator, RefHandling};
///
/// # async fn example() -> Result<(), refsplit_core::RefsplitError> {
/// let generation = Generator::builder()
///     .with_source("openapi/petstore.yaml")
///     .with_root("components.schemas")
///     .with_root("paths")
///     .with_ref_handling(RefHandling::Keep)
///     .build()?
///     .generate()
///     .await?;
///
/// for unit in &generation.metadata {
///     println!("{} -> {}", unit.reference(), unit.file_path().display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Generator {
    source: Option<PathBuf>,
    output_path: PathBuf,
    roots: Vec<RootPath>,
    options: WalkOptions,
    schema_patcher: Option<SchemaPatcher>,
    silent: bool,
    plugins: Vec<Box<dyn Plugin>>,
    reporter: Arc<dyn Reporter>,
}

impl Generator {
    /// Starts configuring a generator.
    #[must_use]
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    /// The output root.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The generation roots.
    #[must_use]
    pub fn roots(&self) -> &[RootPath] {
        &self.roots
    }

    /// The walk options.
    #[must_use]
    pub fn options(&self) -> WalkOptions {
        self.options
    }

    /// Runs against the filesystem: reads the source document and writes units
    /// under the output root, which is cleared first.
    ///
    /// # Errors
    ///
    /// [`RefsplitError::MissingSource`] without a source document, then any
    /// input, resolution or I/O error of the run.
    pub async fn generate(&self) -> Result<Generation, RefsplitError> {
        let source = self.source.as_deref().ok_or(RefsplitError::MissingSource)?;
        self.notify_missing_roots();

        let source = resolve_source(source).await?;
        let mut sink = FsSink;
        sink.clear(&self.output_path).await?;
        let document = load_document(&source).await?;
        self.run(&document, &mut sink).await
    }

    /// Runs on an already loaded document, writing through `sink`.
    ///
    /// The output root is cleared in the sink first.
    ///
    /// # Errors
    ///
    /// Any resolution error of the run, or a sink error.
    pub async fn generate_from<S>(
        &self,
        document: &Value,
        sink: &mut S,
    ) -> Result<Generation, RefsplitError>
    where
        S: UnitSink,
    {
        self.notify_missing_roots();
        sink.clear(&self.output_path).await?;
        self.run(document, sink).await
    }

    async fn run<S>(&self, document: &Value, sink: &mut S) -> Result<Generation, RefsplitError>
    where
        S: UnitSink,
    {
        let metadata = walk_with_patcher(
            document,
            &self.roots,
            &self.output_path,
            self.options,
            self.schema_patcher.as_ref(),
        )?;
        emit_units(sink, &metadata, self.options.ref_handling).await?;

        let context = PluginContext {
            output_path: &self.output_path,
            metadata: &metadata,
        };
        for plugin in &self.plugins {
            let outputs = plugin.generate(&context)?;
            debug!(plugin = plugin.name(), files = outputs.len(), "plugin generated");
            for output in outputs {
                sink.write(&self.output_path.join(&output.path), &output.contents)
                    .await?;
            }
        }

        if !self.roots.is_empty() {
            self.notify(&Notice::Generated {
                output_path: self.output_path.clone(),
                units: metadata.len(),
            });
        }
        Ok(Generation {
            output_path: self.output_path.clone(),
            metadata,
        })
    }

    fn notify_missing_roots(&self) {
        if self.roots.is_empty() {
            self.notify(&Notice::NoRootsRequested);
        }
    }

    fn notify(&self, notice: &Notice) {
        if !self.silent {
            self.reporter.report(notice);
        }
    }
}

/// Builder for [`Generator`].
///
/// # Default Configuration
///
/// - **Output path**: `schemas-autogenerated` next to the source document
/// - **Roots**: none (nothing is generated)
/// - **Reference handling**: [`RefHandling::Inline`], without link units
/// - **Reporter**: [`TracingReporter`]
#[derive(Debug, Default)]
pub struct GeneratorBuilder {
    source: Option<PathBuf>,
    output_path: Option<PathBuf>,
    roots: Vec<String>,
    options: WalkOptions,
    schema_patcher: Option<SchemaPatcher>,
    silent: bool,
    plugins: Vec<Box<dyn Plugin>>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl GeneratorBuilder {
    /// Sets the bundled source document.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Adds a generation root, e.g. `components.schemas`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Adds several generation roots.
    #[must_use]
    pub fn with_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Sets how nested references are handled.
    #[must_use]
    pub fn with_ref_handling(mut self, ref_handling: RefHandling) -> Self {
        self.options.ref_handling = ref_handling;
        self
    }

    /// In keep mode, also writes a unit for every referenced schema.
    #[must_use]
    pub fn with_link_units(mut self, link_units: bool) -> Self {
        self.options.link_units = link_units;
        self
    }

    /// Warns instead of failing on roots that are missing or empty.
    #[must_use]
    pub fn with_allow_empty_roots(mut self, allow_empty_roots: bool) -> Self {
        self.options.allow_empty_roots = allow_empty_roots;
        self
    }

    /// Suppresses every notice.
    #[must_use]
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Sets the maximum nesting of reference expansion.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Sets a callback run on every object of each unit body before the unit is
    /// registered, e.g. to drop vendor keywords.
    #[must_use]
    pub fn with_schema_patcher(
        mut self,
        patcher: impl Fn(&mut SchemaNode) + Send + Sync + 'static,
    ) -> Self {
        self.schema_patcher = Some(SchemaPatcher::new(patcher));
        self
    }

    /// Adds a plugin, run after every unit is written.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Replaces the [`TracingReporter`].
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`RefsplitError::AbsoluteRootPath`] or [`RefsplitError::InvalidRootPath`]
    ///   for a bad root,
    /// - [`RefsplitError::MissingOutputPath`] without output path nor source.
    pub fn build(self) -> Result<Generator, RefsplitError> {
        let roots = self
            .roots
            .iter()
            .map(String::as_str)
            .map(RootPath::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let output_path = match (self.output_path, &self.source) {
            (Some(output_path), _) => output_path,
            (None, Some(source)) => {
                let source = std::path::absolute(source).unwrap_or_else(|_| source.clone());
                source
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(DEFAULT_OUTPUT_DIR)
            }
            (None, None) => return Err(RefsplitError::MissingOutputPath),
        };

        Ok(Generator {
            source: self.source,
            output_path,
            roots,
            options: self.options,
            schema_patcher: self.schema_patcher,
            silent: self.silent,
            plugins: self.plugins,
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
        })
    }
}
