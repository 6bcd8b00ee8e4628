//! Reelcore operator CLI.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "reelcore")]
#[command(about = "Reelcore workflow orchestration CLI", long_about = None)]
struct Cli {
    /// Orchestration API server URL
    #[arg(long, env = "REELCORE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new workflow (execution_mode=full)
    Create {
        /// Input video path, passed through to the first stage
        video_path: String,
        /// Ordered list of stage names, e.g. ffmpeg.extract_audio asr.transcribe
        #[arg(required = true)]
        stages: Vec<String>,
    },
    /// Fetch a workflow's persisted context
    Status {
        /// Workflow ID
        workflow_id: String,
    },
    /// Retry a workflow from its longest successful prefix (execution_mode=retry)
    Retry {
        /// Workflow ID
        workflow_id: String,
        /// Full ordered list of stage names to retry against
        #[arg(required = true)]
        stages: Vec<String>,
        /// How new node_params combine with the stored ones
        #[arg(long, default_value = "merge")]
        param_merge_strategy: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Create { video_path, stages } => {
            commands::create(&cli.api_url, &video_path, stages).await?;
        }
        Commands::Status { workflow_id } => {
            commands::status(&cli.api_url, &workflow_id).await?;
        }
        Commands::Retry {
            workflow_id,
            stages,
            param_merge_strategy,
        } => {
            commands::retry(&cli.api_url, &workflow_id, stages, &param_merge_strategy).await?;
        }
    }

    Ok(())
}
