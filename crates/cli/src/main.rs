use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aegis_agents::{ChatInput, TriageAgent};
use aegis_core::{CrisisCategory, Message, Severity};
use aegis_guidance::GuidanceRetriever;
use aegis_llm::LlmConfig;
use aegis_ml::TriageMlStack;
use aegis_observability::{init_tracing, AppMetrics};
use aegis_store::MemoryStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aegis")]
#[command(about = "Aegis Triage CLI")]
struct Cli {
    #[arg(long, default_value = "kb")]
    kb_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat session against the local pipeline.
    Chat,
    /// Evaluate a single message and print the structured result.
    Triage { text: String },
    Kb {
        #[command(subcommand)]
        command: KbCommand,
    },
}

#[derive(Debug, Subcommand)]
enum KbCommand {
    /// Look up composed guidance for a category and severity.
    Lookup {
        category: String,
        #[arg(long, default_value = "medium")]
        severity: String,
        #[arg(long, default_value = "")]
        summary: String,
    },
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("aegis_cli");
    let cli = Cli::parse();

    let agent = build_agent(&cli.kb_root);

    match cli.command {
        Command::Chat => run_chat(agent).await?,
        Command::Triage { text } => {
            let response = agent
                .run_chat(ChatInput {
                    conversation_id: None,
                    messages: vec![Message::user(&text)],
                })
                .await
                .context("triage evaluation failed")?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Kb { command } => {
            let retriever = build_retriever(&cli.kb_root);
            match command {
                KbCommand::Lookup {
                    category,
                    severity,
                    summary,
                } => {
                    let category = CrisisCategory::from_label(&category)
                        .context("invalid category, expected flood, fire, earthquake, storm, landslide or other")?;
                    let severity = Severity::from_label(&severity)
                        .context("invalid --severity value, expected low, medium or high")?;
                    let guidance = retriever.guidance(&summary, category, severity);
                    println!("{guidance}");
                }
                KbCommand::Stats => {
                    println!("{}", serde_json::to_string_pretty(&retriever.stats())?);
                }
            }
        }
    }

    Ok(())
}

async fn run_chat(agent: TriageAgent) -> Result<()> {
    let mut conversation_id: Option<String> = None;
    let mut messages: Vec<Message> = Vec::new();

    println!("Aegis Triage chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;

        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }
        if text.is_empty() {
            continue;
        }

        messages.push(Message::user(text));

        let response = agent
            .run_chat(ChatInput {
                conversation_id: conversation_id.clone(),
                messages: messages.clone(),
            })
            .await?;

        conversation_id = Some(response.conversation_id.clone());
        messages.push(Message::assistant(&response.result.reply));

        println!("\n{}\n", response.result.reply);
        println!(
            "[{} / {} severity]{}",
            response.result.category,
            response.result.severity,
            if response.result.location.is_empty() {
                String::new()
            } else {
                format!(" at {}", response.result.location)
            }
        );
    }

    Ok(())
}

fn build_retriever(kb_root: &Path) -> Arc<GuidanceRetriever> {
    let ml_stack = TriageMlStack::load_default();
    Arc::new(GuidanceRetriever::from_kb_dir(
        kb_root,
        Some(ml_stack.embedder.clone()),
    ))
}

fn build_agent(kb_root: &Path) -> TriageAgent {
    let ml_stack = TriageMlStack::load_default();
    let retriever = Arc::new(GuidanceRetriever::from_kb_dir(
        kb_root,
        Some(ml_stack.embedder.clone()),
    ));

    TriageAgent::new(
        ml_stack,
        retriever,
        &LlmConfig::from_env(),
        Arc::new(MemoryStore::new()),
        AppMetrics::shared(),
    )
}
