//! Policy Builder CLI
//!
//! Prints template documents, applies edit scripts and checks policy files.
//! Reads files only and writes results to stdout.

use azure_policy_builder::{telemetry, Config, Edit, EditorSession, PolicyDocument, Result};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Policy Builder
#[derive(Parser, Debug)]
#[command(name = "policy-builder")]
#[command(about = "Build and edit custom Azure Policy definitions")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "POLICY_BUILDER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides configuration)
    #[arg(long, env = "LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the template document a new session starts from
    New,

    /// Apply a JSON array of edits to a document and print the result
    Apply {
        /// Document to edit; the template is used when omitted
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// File containing a JSON array of edits
        #[arg(short, long)]
        edits: PathBuf,
    },

    /// Parse and validate a policy document
    Check {
        /// Policy document file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }
    config.validate()?;

    telemetry::init_tracing(&config.logging)?;
    info!("Starting {} v{}", azure_policy_builder::NAME, azure_policy_builder::VERSION);

    match args.command {
        Command::New => {
            let session = EditorSession::new(&config);
            println!("{}", session.render()?);
        }
        Command::Apply { document, edits } => {
            let mut session = match &document {
                Some(path) => {
                    info!("Loading document: {:?}", path);
                    EditorSession::with_document(PolicyDocument::from_file(path)?, &config)
                }
                None => EditorSession::new(&config),
            };
            let edits = load_edits(&edits)?;
            session.apply_all(&edits)?;
            info!("Applied {} edits", edits.len());
            println!("{}", session.render()?);
        }
        Command::Check { file } => {
            let document = PolicyDocument::from_file(&file)?;
            info!(
                "{:?} is valid: {} conditions, {} parameters, effect {}",
                file,
                document.condition.nodes().len(),
                document.parameters.len(),
                document.effect()
            );
            println!("ok");
        }
    }

    Ok(())
}

/// Load an edit script.
fn load_edits(path: &Path) -> Result<Vec<Edit>> {
    let content = std::fs::read_to_string(path)?;
    let edits: Vec<Edit> = serde_json::from_str(&content)?;
    Ok(edits)
}
