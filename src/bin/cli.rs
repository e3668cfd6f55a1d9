use clap::{Parser, Subcommand};
use octofhir_questionnaire::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "octofhir-questionnaire")]
#[command(about = "Validate, normalize and sync FHIR Questionnaire documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a questionnaire for structural and translation problems
    Validate {
        /// Path to the questionnaire JSON
        #[arg(short, long)]
        input: PathBuf,
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Import and re-export a questionnaire in canonical form
    Normalize {
        #[arg(short, long)]
        input: PathBuf,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the download file name for a questionnaire
    FileName {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Load a questionnaire from the backend
    Fetch {
        /// Launch query string: sessionKey=..&uuid=..&locale=..
        #[arg(short, long)]
        query: String,
        /// Editor configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save a local questionnaire to the backend
    Push {
        #[arg(short, long)]
        query: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the interface messages for the session locale
    Messages {
        #[arg(short, long)]
        query: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input, format } => {
            let valid = validate_file(&input, &format)?;
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Normalize { input, output } => {
            let state = read_state(&input)?;
            let document = export_questionnaire(&state)?;
            write_document(&document, output.as_deref())?;
        }
        Commands::FileName { input } => {
            let state = read_state(&input)?;
            println!(
                "{}",
                export_file_name(&state.metadata, &state.additional_languages)
            );
        }
        Commands::Fetch {
            query,
            config,
            output,
        } => {
            let session = open_session(&query, config.as_deref())?;
            let state = session.load().await?;
            eprintln!(
                "Loaded {} items in {} additional languages",
                state.items.len(),
                state.additional_languages.len()
            );
            write_document(&session.export().await?, output.as_deref())?;
        }
        Commands::Push {
            query,
            config,
            input,
        } => {
            let session = open_session(&query, config.as_deref())?;
            let content = std::fs::read_to_string(&input)?;
            session.open(parse_document(&content)?).await?;
            let receipt = session.save().await?;
            println!(
                "✅ Saved {} ({})",
                session.config().document_id,
                receipt.fingerprint.short_hash()
            );
        }
        Commands::Messages { query, config } => {
            let session = open_session(&query, config.as_deref())?;
            let mut messages: Vec<_> = session.load_messages().await?.into_iter().collect();
            messages.sort();
            for (key, text) in messages {
                println!("{key}\t{text}");
            }
        }
    }

    Ok(())
}

fn read_state(path: &Path) -> Result<TreeState> {
    let content = std::fs::read_to_string(path)?;
    let document = parse_document(&content)?;
    Ok(import_questionnaire(&document)?)
}

fn write_document(
    document: &serde_json::Value,
    output: Option<&Path>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string_pretty(document)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn open_session(query: &str, config: Option<&Path>) -> Result<EditorSession> {
    let config = match config {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    let gateway = HttpSyncGateway::new(config.gateway)?;
    EditorSession::new(SessionConfig::from_query(query)?, Arc::new(gateway))
}

fn validate_file(input: &Path, format: &str) -> std::result::Result<bool, Box<dyn std::error::Error>> {
    let state = read_state(input)?;
    let report = validate_state(&state);
    let valid = report.is_valid();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            let result = report.into_result();
            if result.issues.is_empty() {
                println!("✅ Questionnaire validation passed");
            } else {
                println!(
                    "❌ Questionnaire validation found {} issues ({} errors, {} warnings):\n",
                    result.issues.len(),
                    result.error_count,
                    result.warning_count
                );
                for issue in &result.issues {
                    println!("  {issue}");
                    if !issue.link_ids.is_empty() {
                        println!("    items: {}", issue.link_ids.join(", "));
                    }
                    if let Some(language) = &issue.language {
                        println!("    language: {language}");
                    }
                }
            }
        }
    }

    Ok(valid)
}
