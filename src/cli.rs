use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::code_to_pdf::code_file_to_pdf;
use crate::complexity::HeuristicExtractor;
use crate::explain::generate_documents;
use crate::llm::OpenRouterClient;
use crate::load_config::{load_config, require_directory, require_file};
use crate::markdown_pdf::PandocRenderer;
use crate::report::generate_report;

/// CLI for code-explainer: turn a source tree into study PDFs.
#[derive(Parser, Debug)]
#[clap(
    name = "code-explainer",
    version,
    about = "Explain a codebase with an LLM and render code, explanations, a quiz and a report as PDFs"
)]
pub struct Cli {
    /// Optional YAML file with endpoint, pipeline and renderer settings
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory the PDFs are written to (default: ./output)
    #[clap(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explain every source file under a folder; writes code, explanation and quiz PDFs
    Explain {
        /// Root of the project to explain
        folder_path: PathBuf,
        /// Skip the quiz
        #[clap(long)]
        no_quiz: bool,
    },
    /// Render a single source file as a code PDF
    Render {
        /// Source file to render
        codefile: PathBuf,
    },
    /// Build a project report with summary, recommendations and complexity metrics
    Report {
        /// Root of the project to report on
        project_path: PathBuf,
    },
}

/// Async CLI entrypoint shared by main() and the integration tests.
///
/// Input paths are validated before anything else, so a bad path fails
/// without touching the environment or the output directory.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!(command = ?cli.command, "trace_initialised");

    let Cli {
        config: config_path,
        output_dir,
        command,
    } = cli;

    match &command {
        Commands::Explain { folder_path, .. } => require_directory(folder_path)?,
        Commands::Render { codefile } => require_file(codefile)?,
        Commands::Report { project_path } => require_directory(project_path)?,
    }

    let mut config = load_config(config_path.as_deref())?;
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }
    let renderer = PandocRenderer::from_config(&config);

    match command {
        Commands::Explain { folder_path, no_quiz } => {
            let client = OpenRouterClient::new(&config)?;
            config.ensure_output_dir()?;
            let report = generate_documents(&folder_path, &config, &client, &renderer, !no_quiz).await?;
            for output in &report.outputs {
                println!("PDF saved at {}", output.display());
            }
            println!("Explained {} file(s), skipped {}.", report.explained, report.skipped);
            for failure in &report.failures {
                eprintln!("[WARN] {}: {}", failure.path.display(), failure.message);
            }
        }
        Commands::Render { codefile } => {
            config.ensure_output_dir()?;
            let output = code_file_to_pdf(&codefile, &config, &renderer).await?;
            println!("PDF saved at {}", output.display());
        }
        Commands::Report { project_path } => {
            let client = OpenRouterClient::new(&config)?;
            config.ensure_output_dir()?;
            let output = generate_report(&project_path, &config, &client, &HeuristicExtractor).await?;
            println!("Report generated: {}", output.display());
        }
    }

    Ok(())
}
