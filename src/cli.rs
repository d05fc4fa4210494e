use crate::data::SharedLocals;
use crate::emit::{DirectorySink, PlaceholderRenderer};
use crate::fetch::WordpressClient;
use crate::load_config::{load_config, LoadedConfig};
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for wordpress-fetch: pull WordPress content into a static build.
#[derive(Parser)]
#[clap(
    name = "wordpress-fetch",
    version,
    about = "Fetch, normalize and aggregate WordPress posts for static site builds"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every configured content type and print the aggregated result as JSON
    Fetch {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Fetch, then render templated content types and the JSON export into a directory
    Build {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Output directory for rendered pages and the JSON export
        #[clap(long, default_value = "public")]
        out: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fetch { config } => {
            let (pipeline, mut locals) = prepare(config)?;
            let mapping = pipeline
                .run(&mut locals)
                .await
                .context("Fetch run failed")?;
            println!("{}", serde_json::to_string_pretty(&mapping)?);
            Ok(())
        }
        Commands::Build { config, out } => {
            let (pipeline, mut locals) = prepare(config)?;
            println!("Build starting...");
            let mapping = pipeline
                .run(&mut locals)
                .await
                .context("Fetch run failed")?;
            let sink = DirectorySink::new(&out);
            let report = pipeline
                .emit(&locals, &PlaceholderRenderer, &sink)
                .await
                .context("Emitting outputs failed")?;
            println!("Build complete.");
            for (name, items) in mapping.iter() {
                let count = items.as_array().map(Vec::len).unwrap_or(0);
                println!("  {name}: {count} item(s)");
            }
            if let Some(json) = &report.json {
                println!("  json export: {}", out.join(json).display());
            }
            println!("  pages written: {}", report.pages.len());
            Ok(())
        }
    }
}

fn prepare(config: PathBuf) -> Result<(Pipeline<WordpressClient>, SharedLocals)> {
    let LoadedConfig { options, api_token } = load_config(config)?;
    let mut client = WordpressClient::new(&options.site)?;
    if let Some(token) = api_token {
        client = client.with_token(token);
    }
    let pipeline = Pipeline::configure(options, client)?;
    Ok((pipeline, SharedLocals::new()))
}
