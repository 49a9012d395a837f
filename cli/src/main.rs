//! modelgraph CLI: save and load models against a graph database
//!
//! Meta-models and models are read from JSON documents.

use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use modelgraph::model::{MetaModelDocument, Model, ModelDocument};
use modelgraph::{Connector, ConnectorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelgraph", version, about = "Persist models to a graph database")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "MODELGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Store HTTP URL
    #[arg(long, global = true, env = "MODELGRAPH_URL")]
    url: Option<String>,

    /// Database name
    #[arg(long, global = true, env = "MODELGRAPH_DATABASE")]
    database: Option<String>,

    #[arg(long, global = true, env = "MODELGRAPH_USER")]
    user: Option<String>,

    #[arg(long, global = true, env = "MODELGRAPH_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the identity constraints
    InitStorage,
    /// Save a model (or just the meta-model) with its meta chain
    Save {
        /// Meta-model document
        #[arg(long)]
        metamodel: PathBuf,

        /// Model document; when absent the meta-model itself is saved
        #[arg(long)]
        model: Option<PathBuf>,

        /// Also save the built-in meta-model
        #[arg(long)]
        own_types: bool,
    },
    /// Load every element conforming to a meta-model
    Load {
        /// Meta-model document
        #[arg(long)]
        metamodel: PathBuf,

        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
}

impl Cli {
    fn connector_config(&self) -> anyhow::Result<ConnectorConfig> {
        let mut config = match &self.config {
            Some(path) => ConnectorConfig::from_yaml_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => ConnectorConfig::default(),
        };
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if self.user.is_some() {
            config.user = self.user.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.connector_config()?;
    let connector = Connector::connect(&config)?;

    let result = match cli.command {
        Commands::InitStorage => connector.init_storage().await.map_err(Into::into),
        Commands::Save {
            metamodel,
            model,
            own_types,
        } => run_save(&connector, &metamodel, model.as_deref(), own_types).await,
        Commands::Load { metamodel, format } => run_load(&connector, &metamodel, &format).await,
    };

    connector.close().await?;
    result
}

fn read_meta_model(path: &Path) -> anyhow::Result<Arc<Model>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let meta = MetaModelDocument::from_json(&json)?.build()?;
    Ok(Arc::new(meta))
}

async fn run_save(
    connector: &Connector,
    metamodel: &Path,
    model: Option<&Path>,
    own_types: bool,
) -> anyhow::Result<()> {
    let meta = read_meta_model(metamodel)?;
    let report = match model {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let model = ModelDocument::from_json(&json)?.build(&meta)?;
            connector.save_model(&model, own_types).await?
        }
        None => connector.save_model(&meta, own_types).await?,
    };
    println!(
        "Saved {} element(s), {} relationship(s)",
        report.elements, report.relationships
    );
    Ok(())
}

async fn run_load(connector: &Connector, metamodel: &Path, format: &OutputFormat) -> anyhow::Result<()> {
    let meta = read_meta_model(metamodel)?;
    let loaded = connector.load_model(&meta).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ModelDocument::from_model(&loaded))?);
        }
        OutputFormat::Table => {
            if loaded.elements().is_empty() {
                println!("(no elements)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["class", "id", "attributes", "references"]);

            for element in loaded.elements() {
                let attributes: Vec<String> = element
                    .attributes()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                let references: Vec<String> = element
                    .references()
                    .iter()
                    .map(|(name, links)| format!("{} ({})", name, links.len()))
                    .collect();
                table.add_row(vec![
                    element.class().name().to_string(),
                    element.uuid().to_string(),
                    attributes.join(", "),
                    references.join(", "),
                ]);
            }

            println!("{}", table);
            println!("{} element(s)", loaded.elements().len());
        }
    }

    Ok(())
}
