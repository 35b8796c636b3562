use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use medsum::{
    config, logging,
    processing::{Document, ExtractionOutcome, ProcessingService},
    session::Session,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(
    name = "medsum",
    about = "Extract, question, and summarize medical reports from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text extracted from a PDF, TXT, DATA or CSV file.
    Extract { file: PathBuf },
    /// Answer one question about a file.
    Ask {
        file: PathBuf,
        #[arg(short, long)]
        question: String,
    },
    /// Summarize a file chunk by chunk.
    Summarize { file: PathBuf },
    /// Load a file once and answer questions interactively.
    Shell { file: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing("warn");
    let service = ProcessingService::new(config::get_config())
        .context("Failed to initialize inference clients")?;
    let mut session = Session::new();

    match cli.command {
        Command::Extract { file } => {
            let outcome = load(&service, &mut session, &file).await?;
            if let Some(warning) = outcome.warning() {
                eprintln!("warning: {warning}");
            }
            if let Some(text) = session.extracted_text() {
                println!("{text}");
            }
        }
        Command::Ask { file, question } => {
            require_text(&load(&service, &mut session, &file).await?)?;
            let outcome = service.ask(&session, &question).await?;
            println!("{}", outcome.display_text());
        }
        Command::Summarize { file } => {
            require_text(&load(&service, &mut session, &file).await?)?;
            let summary = service.summarize(&mut session).await?;
            println!("{}", summary.text);
        }
        Command::Shell { file } => {
            require_text(&load(&service, &mut session, &file).await?)?;
            shell(&service, &mut session).await?;
        }
    }
    Ok(())
}

/// Read `path` and extract it into the session.
async fn load(
    service: &ProcessingService,
    session: &mut Session,
    path: &Path,
) -> Result<ExtractionOutcome> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let outcome = service
        .ingest(session, Document::new(filename, bytes))
        .await
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;
    if let ExtractionOutcome::Extracted { characters, .. } = outcome {
        tracing::info!(characters, "Loaded {filename}");
    }
    Ok(outcome)
}

/// Fail with the outcome's warning when the upload left no text to work on.
fn require_text(outcome: &ExtractionOutcome) -> Result<()> {
    if outcome.has_text() {
        return Ok(());
    }
    bail!(outcome.warning().unwrap_or_else(|| format!("{outcome:?}")))
}

const SHELL_HELP: &str = "Type a question, or one of: :summary, :text, :help, :quit";

async fn shell(service: &ProcessingService, session: &mut Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    println!("{SHELL_HELP}");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let reply = match line.trim() {
            "" => continue,
            ":quit" | ":q" | ":exit" => break,
            ":help" => SHELL_HELP.to_string(),
            ":text" => session.extracted_text().unwrap_or_default().to_string(),
            ":summary" => match session.summary().map(|cached| cached.text.clone()) {
                Some(cached) => cached,
                None => match service.summarize(session).await {
                    Ok(summary) => summary.text,
                    Err(err) => format!("error: {err}"),
                },
            },
            question => match service.ask(session, question).await {
                Ok(outcome) => outcome.display_text().to_string(),
                Err(err) => format!("error: {err}"),
            },
        };
        println!("{reply}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medsum::config::Config;
    use medsum::processing::DocumentFormat;

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("medsum-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("scratch dir");
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("scratch file");
        path
    }

    #[tokio::test]
    async fn unsupported_file_loads_with_a_warning() {
        let service = ProcessingService::new(&Config::default()).expect("service");
        let mut session = Session::new();
        let path = scratch_file("scan.png", &[0x89, 0x50, 0x4e, 0x47]);

        let outcome = load(&service, &mut session, &path).await.expect("not an error");
        assert!(matches!(outcome, ExtractionOutcome::Unsupported { .. }));
        assert!(outcome.warning().expect("warning").contains("scan.png"));
        assert!(session.extracted_text().is_none());
    }

    #[tokio::test]
    async fn text_file_loads_into_the_session() {
        let service = ProcessingService::new(&Config::default()).expect("service");
        let mut session = Session::new();
        let path = scratch_file("notes.txt", b"Pulse 72");

        let outcome = load(&service, &mut session, &path).await.expect("loaded");
        assert!(require_text(&outcome).is_ok());
        assert_eq!(session.extracted_text(), Some("Pulse 72"));
    }

    #[test]
    fn text_dependent_commands_reject_textless_outcomes() {
        let error = require_text(&ExtractionOutcome::Empty {
            format: DocumentFormat::PlainText,
        })
        .unwrap_err();
        assert_eq!(error.to_string(), "No readable text found.");

        let unsupported = ExtractionOutcome::Unsupported {
            filename: "scan.png".into(),
        };
        assert!(require_text(&unsupported).is_err());
    }
}
