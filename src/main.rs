use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod ci;
mod cli;
mod config;
mod dotnet;
mod error;
mod process;
mod publisher;
mod registry;
mod scan;
mod tagger;
mod version;

use crate::ci::{error_annotation, OutputSink};
use crate::cli::RootArgs;
use crate::config::{Config, ProcessEnv};
use crate::error::PublishError;
use crate::process::ProcessRunner;
use crate::publisher::{Outcome, Publisher, Tools};
use crate::registry::NugetRegistry;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let tools = Tools {
        dotnet: args.dotnet,
        git: args.git,
    };
    match run(&tools) {
        Ok(outcome) => {
            report(&outcome);
            Ok(())
        }
        Err(err) => {
            println!("{}", error_annotation(&err.to_string()));
            tracing::error!(
                kind = err.kind().as_str(),
                path = ?err.path(),
                "{err}"
            );
            Err(err.into())
        }
    }
}

fn run(tools: &Tools) -> Result<Outcome, PublishError> {
    let config = Config::from_env(&ProcessEnv)?;
    let registry = NugetRegistry::new(config.source_base(), config.registry_timeout);
    let runner = ProcessRunner::new(config.command_timeout);
    Publisher {
        config: &config,
        registry: &registry,
        runner: &runner,
        tools,
        outputs: OutputSink::new(config.output_file.clone()),
    }
    .run()
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::AlreadyPublished { package, version } => {
            tracing::info!(%package, %version, "already exists");
        }
        Outcome::PackedOnly {
            package,
            version,
            artifacts,
        } => {
            tracing::info!(
                %package,
                %version,
                packages = artifacts.packages.len(),
                "packed without publishing"
            );
        }
        Outcome::Published {
            package,
            version,
            artifacts,
            tag,
        } => {
            tracing::info!(
                %package,
                %version,
                packages = artifacts.packages.len(),
                symbols = artifacts.symbols.len(),
                tag = tag.as_deref().unwrap_or("<none>"),
                "published"
            );
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "nupub=debug" } else { "nupub=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
