//! stagerunner CLI tool.

use clap::{Args, Parser, Subcommand};
use stagerunner_core::StageKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;

use client::Client;
use commands::pipelines::DefinitionSource;

#[derive(Parser)]
#[command(name = "stagerunner")]
#[command(about = "stagerunner pipeline service CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "STAGERUNNER_API_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Authorization token sent with every API request
    #[arg(long, env = "STAGERUNNER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage pipelines
    Pipelines {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Inspect pipeline runs
    Runs {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Validate a pipeline configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "pipeline.kdl")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct DefinitionArgs {
    /// Pipeline definition as JSON
    json: Option<String>,
    /// KDL pipeline file
    #[arg(long, short)]
    file: Option<PathBuf>,
}

impl From<DefinitionArgs> for DefinitionSource {
    fn from(args: DefinitionArgs) -> Self {
        DefinitionSource {
            json: args.json,
            file: args.file,
        }
    }
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// List all pipelines
    List,
    /// Show a pipeline
    Get {
        /// Pipeline ID
        id: String,
    },
    /// Create a pipeline
    Create {
        #[command(flatten)]
        definition: DefinitionArgs,
    },
    /// Replace a pipeline definition
    Update {
        /// Pipeline ID
        id: String,
        #[command(flatten)]
        definition: DefinitionArgs,
    },
    /// Delete a pipeline
    Delete {
        /// Pipeline ID
        id: String,
    },
    /// Trigger a pipeline run
    Trigger {
        /// Pipeline ID
        id: String,
        /// Git reference to build
        #[arg(long = "ref", default_value = "main")]
        git_ref: String,
    },
}

#[derive(Subcommand)]
enum RunCommands {
    /// List runs
    List {
        /// Only show runs of this pipeline
        #[arg(long)]
        pipeline: Option<String>,
    },
    /// Show run details
    Show {
        /// Run ID
        id: String,
    },
    /// Print stage logs of a run
    Logs {
        /// Run ID
        id: String,
        /// Only print this stage (run, build or deploy)
        #[arg(long)]
        stage: Option<StageKind>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Validate { path } = &cli.command {
        return commands::validate(path);
    }

    let client = Client::new(&cli.url, cli.token)?;

    match cli.command {
        Commands::Pipelines { command } => match command {
            PipelineCommands::List => commands::pipelines::list(&client).await?,
            PipelineCommands::Get { id } => commands::pipelines::get(&client, &id).await?,
            PipelineCommands::Create { definition } => {
                commands::pipelines::create(&client, definition.into()).await?;
            }
            PipelineCommands::Update { id, definition } => {
                commands::pipelines::update(&client, &id, definition.into()).await?;
            }
            PipelineCommands::Delete { id } => commands::pipelines::delete(&client, &id).await?,
            PipelineCommands::Trigger { id, git_ref } => {
                commands::pipelines::trigger(&client, &id, &git_ref).await?;
            }
        },
        Commands::Runs { command } => match command {
            RunCommands::List { pipeline } => commands::runs::list(&client, pipeline).await?,
            RunCommands::Show { id } => commands::runs::show(&client, &id).await?,
            RunCommands::Logs { id, stage } => commands::runs::logs(&client, &id, stage).await?,
        },
        Commands::Validate { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_logs_stage() {
        let cli = Cli::try_parse_from(["stagerunner", "runs", "logs", "abc", "--stage", "build"])
            .unwrap();
        match cli.command {
            Commands::Runs {
                command: RunCommands::Logs { id, stage },
            } => {
                assert_eq!(id, "abc");
                assert_eq!(stage, Some(StageKind::Build));
            }
            _ => panic!("expected runs logs"),
        }

        assert!(
            Cli::try_parse_from(["stagerunner", "runs", "logs", "abc", "--stage", "test"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_trigger_ref() {
        let cli =
            Cli::try_parse_from(["stagerunner", "pipelines", "trigger", "abc", "--ref", "v1.2"])
                .unwrap();
        match cli.command {
            Commands::Pipelines {
                command: PipelineCommands::Trigger { id, git_ref },
            } => {
                assert_eq!(id, "abc");
                assert_eq!(git_ref, "v1.2");
            }
            _ => panic!("expected pipelines trigger"),
        }
    }
}
