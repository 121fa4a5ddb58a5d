//! Command-line entry point for the SDK assistant.
//!
//! Usage:
//!   sdk-assistant ask "What does signal() do?"
//!   sdk-assistant ask "How do I trace a crew?" --framework crewai --json
//!   sdk-assistant chat
//!   sdk-assistant serve
//!   sdk-assistant check
//!   sdk-assistant frameworks

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sdk_assistant::config::{Config, RuntimeConfig};
use sdk_assistant::http::{HttpState, start_http_server};
use sdk_assistant::orchestrator::{Orchestrator, Query};
use sdk_assistant::prompts::{self, display_framework};
use sdk_assistant::retrieval::{DocumentSearch, LocalCorpus};
use sdk_assistant::session::{Session, new_conversation_id};
use sdk_assistant::synthesis::FinalResponse;
use sdk_assistant::telemetry::Feedback;
use tracing::info;

#[derive(Parser)]
#[command(name = "sdk-assistant")]
#[command(about = "Multi-agent assistant for SDK and framework questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        question: String,
        /// Framework to consult, overriding the classifier's pick
        #[arg(long)]
        framework: Option<String>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive session on stdin
    Chat,
    /// Serve the JSON HTTP API
    Serve,
    /// Check prerequisites and corpus stats
    Check,
    /// List supported frameworks
    Frameworks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    sdk_assistant::load_env();

    // Logs go to stderr so answers on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(RuntimeConfig::load_from_env().env_filter())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    match cli.command {
        Commands::Ask {
            question,
            framework,
            json,
        } => ask(&config, question, framework, json).await,
        Commands::Chat => chat(&config).await,
        Commands::Serve => serve(config).await,
        Commands::Check => check(&config).await,
        Commands::Frameworks => {
            for f in Orchestrator::supported_frameworks() {
                println!("{:<12} {}", f.as_str(), display_framework(f.as_str()));
            }
            Ok(())
        }
    }
}

async fn ask(
    config: &Config,
    question: String,
    framework: Option<String>,
    json: bool,
) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let mut query = Query::new(question, new_conversation_id());
    if let Some(fw) = framework {
        query = query.with_framework_hint(fw);
    }
    let response = orchestrator.handle(query).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

async fn chat(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config)?;
    let mut session = Session::new();
    info!(
        "Chat session {} started (conversation {})",
        session.session_id, session.conversation_id
    );
    println!("{}\n", prompts::WELCOME_MESSAGE);

    let stdin = std::io::stdin();
    let mut answered = false;
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                session.reset_conversation();
                answered = false;
                println!("Started a new conversation.");
            }
            cmd @ ("/helpful" | "/not-helpful") => {
                if !answered {
                    println!("Ask a question first.");
                    continue;
                }
                let feedback = if cmd == "/helpful" {
                    Feedback::Helpful
                } else {
                    Feedback::NotHelpful
                };
                orchestrator.record_feedback(&session.conversation_id, feedback);
                println!("Thanks for the feedback.");
            }
            question => {
                if session.refresh_if_stale(Utc::now()) {
                    info!(
                        "Session {} was idle too long; new conversation {}",
                        session.session_id, session.conversation_id
                    );
                    answered = false;
                }
                let response = orchestrator
                    .handle_query(question, &session.conversation_id)
                    .await;
                print_response(&response);
                session.touch();
                answered = true;
            }
        }
    }
    info!(
        "Chat session {} ended after {} turns",
        session.session_id, session.turns
    );
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    start_http_server(HttpState::new(Arc::new(config), orchestrator)).await
}

async fn check(config: &Config) -> Result<()> {
    let missing = config.missing_prerequisites();
    if missing.is_empty() {
        println!("✅ All prerequisites present");
    } else {
        for m in &missing {
            println!("❌ {}", m);
        }
    }

    println!("Model: {}", config.llm.model);
    if !config.llm.fallback_models.is_empty() {
        println!("Fallbacks: {}", config.llm.fallback_models.join(", "));
    }

    let path = &config.retrieval.corpus_path;
    if path.exists() {
        let corpus = LocalCorpus::load(path)?;
        let count = corpus.document_count().await.unwrap_or(0);
        println!("📚 {} indexed passages in {}", count, path.display());
    }
    Ok(())
}

fn print_response(response: &FinalResponse) {
    println!("\n{}\n", response.answer);
    if !response.sources.is_empty() {
        println!("Sources:");
        for (i, s) in response.sources.iter().enumerate() {
            println!("  {}. {} ({:.0}%) {}", i + 1, s.title, s.score * 100.0, s.url);
        }
        println!();
    }
}
