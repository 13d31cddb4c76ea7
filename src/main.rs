use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use kustograph::config::{CyclePolicy, MultiEntityPolicy, UnboundedPathPolicy};
use kustograph::open_cypher_parser::parse_condition;
use kustograph::query_translator::{PathEnumerationOptions, PathOptions, Strategy};
use kustograph::{SchemaMapping, Translator, TranslatorConfig};
use validator::Validate;

/// Kustograph - translate Cypher graph queries into KQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schema mapping document (YAML or JSON)
    #[arg(long, short = 's')]
    schema: PathBuf,

    /// Translator configuration file (YAML); defaults to KUSTOGRAPH_* variables
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Query text; read from stdin when omitted
    query: Option<String>,

    /// Upper bound for variable-length relationships
    #[arg(long)]
    max_path_depth: Option<u32>,

    /// escalate or reject
    #[arg(long)]
    unbounded_path_policy: Option<UnboundedPathPolicy>,

    /// union or join
    #[arg(long)]
    multi_entity_policy: Option<MultiEntityPolicy>,

    /// Accept schema names that differ only in case
    #[arg(long)]
    case_insensitive: bool,

    /// Relationship property minimized by shortestPath
    #[arg(long)]
    weight: Option<String>,

    /// Request the bidirectional-search hint for single-pair shortest paths
    #[arg(long)]
    bidirectional: bool,

    /// Result cap for path enumeration
    #[arg(long)]
    max_results: Option<u64>,

    /// Depth cap for path enumeration
    #[arg(long)]
    max_depth: Option<u32>,

    /// NodeId a path must not visit (repeatable)
    #[arg(long = "exclude-node")]
    excluded_nodes: Vec<String>,

    /// Relationship type a path must not use (repeatable)
    #[arg(long = "exclude-type")]
    excluded_types: Vec<String>,

    /// Extra condition every enumerated path must satisfy
    #[arg(long)]
    predicate: Option<String>,

    /// forbidden or bounded
    #[arg(long)]
    cycle_policy: Option<CyclePolicy>,
}

impl Cli {
    fn translator_config(&self) -> anyhow::Result<TranslatorConfig> {
        let mut config = match &self.config {
            Some(path) => TranslatorConfig::from_yaml_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => TranslatorConfig::from_env().context("reading KUSTOGRAPH_* variables")?,
        };
        if let Some(depth) = self.max_path_depth {
            config.max_path_depth = depth;
        }
        if let Some(policy) = self.unbounded_path_policy {
            config.unbounded_path_policy = policy;
        }
        if let Some(policy) = self.multi_entity_policy {
            config.multi_entity_policy = policy;
        }
        if self.case_insensitive {
            config.case_insensitive_schema_fallback = true;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn path_options(&self) -> anyhow::Result<PathOptions> {
        let predicate = match &self.predicate {
            Some(text) => Some(parse_condition(text).context("parsing --predicate")?),
            None => None,
        };
        Ok(PathOptions {
            weight_property: self.weight.clone(),
            bidirectional: self.bidirectional,
            enumeration: PathEnumerationOptions {
                max_results: self.max_results,
                max_depth: self.max_depth,
                excluded_node_ids: self.excluded_nodes.clone(),
                excluded_relationship_types: self.excluded_types.clone(),
                predicate,
                cycle_policy: self.cycle_policy,
            },
        })
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.translator_config()?;
    let options = cli.path_options()?;

    let schema = SchemaMapping::from_file(&cli.schema)
        .with_context(|| format!("loading schema mapping from {}", cli.schema.display()))?;
    let translator = Translator::new(Arc::new(schema), config);

    let query = match &cli.query {
        Some(text) => text.clone(),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading query from stdin")?;
            text
        }
    };
    if query.trim().is_empty() {
        bail!("no query given");
    }

    let result = translator.translate_to_result_with_options(&query, &options);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.strategy == Strategy::Rejected {
        std::process::exit(2);
    }
    Ok(())
}
