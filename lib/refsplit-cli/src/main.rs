#![allow(missing_docs)]
use std::path::PathBuf;

use anyhow::{Context, Result};
use pico_args::Arguments;
use refsplit_core::plugins::{FastifyIntegrationPlugin, FastifyTypeProviderPlugin};
use refsplit_core::{DEFAULT_MAX_DEPTH, Generation, Generator, RefHandling};
use tracing::{info, warn};

const HELP: &str = "\
Split a bundled OpenAPI document into standalone schema units

USAGE:
  refsplit [OPTIONS] <SOURCE>

ARGS:
  <SOURCE>                  bundled JSON or YAML document

OPTIONS:
  -r, --root <ROOT>         generation root, e.g. components.schemas (repeatable)
  -o, --output <DIR>        output directory [default: schemas-autogenerated next to SOURCE]
  -k, --keep-refs           import referenced units instead of inlining them
  -l, --link-units          also generate a unit for every referenced schema
      --allow-empty-roots   warn instead of failing on missing or empty roots
      --max-depth <N>       maximum reference nesting [default: 64]
      --fastify             write the fastify integration module
      --shared <PREFIX>     public id prefix of the fastify shared schemas
      --type-provider       write the fastify type provider module
  -s, --silent              suppress notices
  -h, --help                print this help
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let Some(args) = AppArgs::parse(Arguments::from_env()).context("parsing arguments")? else {
        print_help();
        return Ok(());
    };

    let silent = args.silent;
    let generation = args
        .into_generator()?
        .generate()
        .await
        .context("generating schema units")?;

    report_done(&generation, silent);
    Ok(())
}

fn report_done(generation: &Generation, silent: bool) {
    if silent {
        return;
    }
    info!(
        units = generation.metadata.len(),
        output = %generation.output_path.display(),
        "Done"
    );
}

#[allow(clippy::print_stdout)]
fn print_help() {
    print!("{HELP}");
}

#[derive(Debug, PartialEq, Eq)]
struct AppArgs {
    source: PathBuf,
    roots: Vec<String>,
    output: Option<PathBuf>,
    keep_refs: bool,
    link_units: bool,
    allow_empty_roots: bool,
    max_depth: usize,
    fastify: bool,
    shared_prefix: Option<String>,
    type_provider: bool,
    silent: bool,
}

impl AppArgs {
    /// Returns `None` when help is requested.
    fn parse(mut pargs: Arguments) -> Result<Option<Self>> {
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let roots = pargs
            .values_from_str(["-r", "--root"])
            .context("parsing root argument")?;
        let output = pargs
            .opt_value_from_str(["-o", "--output"])
            .context("parsing output argument")?;
        let max_depth = pargs
            .opt_value_from_str("--max-depth")
            .context("parsing max-depth argument")?;
        let shared_prefix = pargs
            .opt_value_from_str("--shared")
            .context("parsing shared argument")?;

        let keep_refs = pargs.contains(["-k", "--keep-refs"]);
        let link_units = pargs.contains(["-l", "--link-units"]);
        let allow_empty_roots = pargs.contains("--allow-empty-roots");
        let fastify = pargs.contains("--fastify");
        let type_provider = pargs.contains("--type-provider");
        let silent = pargs.contains(["-s", "--silent"]);

        let source = pargs
            .free_from_str()
            .context("missing SOURCE document argument")?;

        let result = Self {
            source,
            roots,
            output,
            keep_refs,
            link_units,
            allow_empty_roots,
            max_depth: max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            fastify,
            shared_prefix,
            type_provider,
            silent,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            warn!(?remaining, "Warning: unused arguments left");
        }
        Ok(Some(result))
    }

    fn into_generator(self) -> Result<Generator> {
        let ref_handling = if self.keep_refs {
            RefHandling::Keep
        } else {
            RefHandling::Inline
        };

        let mut builder = Generator::builder()
            .with_source(self.source)
            .with_roots(self.roots)
            .with_ref_handling(ref_handling)
            .with_link_units(self.link_units)
            .with_allow_empty_roots(self.allow_empty_roots)
            .with_max_depth(self.max_depth)
            .with_silent(self.silent);
        if let Some(output) = self.output {
            builder = builder.with_output_path(output);
        }

        if self.fastify {
            let plugin = match self.shared_prefix {
                Some(prefix) => FastifyIntegrationPlugin::new()
                    .with_shared_schemas_filter(move |unit| unit.public_id().starts_with(&prefix)),
                None => FastifyIntegrationPlugin::new(),
            };
            builder = builder.with_plugin(plugin);
        } else if self.shared_prefix.is_some() {
            warn!("--shared is ignored without --fastify");
        }
        if self.type_provider {
            builder = builder.with_plugin(FastifyTypeProviderPlugin);
        }

        builder.build().context("invalid configuration")
    }
}
