// Command-line surface
//
// Presentation glue only: argument parsing, the chat REPL, and printing.
// All behavior lives in the library modules.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::path::PathBuf;

use crate::backends::{self, BackendKey, Fragment};
use crate::config::Config;
use crate::logging::UsageLog;
use crate::session::{Credentials, Session};
use crate::store::{Assistant, AssistantStatus, AssistantStore};

const USAGE_LOG_FILE: &str = "usage.log";

#[derive(Parser)]
#[command(name = "atelier", version, about = "No-code builder for AI assistants")]
pub struct Cli {
    /// Username scoping the assistant store file
    #[arg(long, global = true, default_value = "")]
    pub user: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Chat with a backend, streaming the reply
    Chat {
        /// Assistant name from the store
        #[arg(long)]
        assistant: Option<String>,

        /// Backend label or short name (ollama, claude, chatgpt, grok)
        #[arg(long, default_value = "ollama")]
        backend: String,

        /// Model override
        #[arg(long)]
        model: Option<String>,
    },

    /// List the backends usable right now
    Backends,

    /// Local model directory
    #[command(subcommand)]
    Models(ModelsCommand),

    /// Manage stored assistants
    #[command(subcommand)]
    Assistants(AssistantsCommand),

    /// Show recent usage log entries
    Usage {
        /// How many entries to show, newest last
        #[arg(long, default_value_t = 20)]
        tail: usize,
    },
}

#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List installed models
    List,
    /// Pull a model from the registry
    Pull { name: String },
    /// Delete an installed model
    Rm { name: String },
}

#[derive(Subcommand)]
pub enum AssistantsCommand {
    /// List stored assistants
    List,
    /// Create an assistant
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        system_prompt: String,
        /// Text file whose contents become the knowledge base
        #[arg(long)]
        knowledge_file: Option<PathBuf>,
    },
    /// Delete an assistant by name
    Rm { name: String },
    /// Import an exported assistant JSON file
    Import { path: PathBuf },
    /// Export an assistant as JSON to stdout
    Export { name: String },
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let store = AssistantStore::for_user(".", &cli.user);
    let usage = UsageLog::new(USAGE_LOG_FILE);

    match cli.command {
        Command::Chat {
            assistant,
            backend,
            model,
        } => chat(&config, &store, &usage, &cli.user, assistant, &backend, model).await,
        Command::Backends => list_backends(&config).await,
        Command::Models(command) => models(&config, &usage, command).await,
        Command::Assistants(command) => assistants(&store, &usage, command),
        Command::Usage { tail } => {
            let entries = usage.entries();
            if entries.is_empty() {
                println!("No usage logs yet.");
                return Ok(());
            }
            for entry in entries.iter().rev().take(tail).rev() {
                println!("{} | {} | {}", entry.timestamp, entry.action, entry.details);
            }
            Ok(())
        }
    }
}

async fn chat(
    config: &Config,
    store: &AssistantStore,
    usage: &UsageLog,
    user: &str,
    assistant_name: Option<String>,
    backend_input: &str,
    model: Option<String>,
) -> Result<()> {
    let assistant = match assistant_name {
        Some(name) => Some(find_assistant(store, &name)?),
        None => None,
    };
    let system_prompt = assistant.as_ref().map(Assistant::effective_system_prompt);
    let backend = parse_backend(backend_input);

    if backend == BackendKey::Ollama && !backends::ollama::check_connection(config).await {
        bail!(
            "Ollama is not running at {}. Start it with: ollama serve",
            config.ollama_host
        );
    }

    match &assistant {
        Some(a) => println!("Chatting with {} via {}.", a.name, backend_short_name(backend)),
        None => println!("Chatting via {}.", backend_short_name(backend)),
    }
    println!("Enter /clear to reset history, /quit to leave.\n");

    let mut session = Session::new(user, Credentials::from_env());
    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        if line == "/clear" {
            session.clear();
            println!("(history cleared)");
            continue;
        }
        let _ = editor.add_history_entry(line);

        session.push_user(line);
        let request = session.request(backend, model.clone(), system_prompt.clone());

        let mut stream = backends::generate(config, &request).await;
        let mut reply = String::new();
        let mut stdout = std::io::stdout();

        while let Some(fragment) = stream.recv().await {
            match fragment {
                Fragment::Delta(text) => {
                    print!("{text}");
                    stdout.flush()?;
                    reply.push_str(&text);
                }
                Fragment::Error { message, .. } => {
                    // Partial output stays visible; the error trails it.
                    println!("\n{message}");
                    reply.push_str(&message);
                    break;
                }
            }
        }
        println!();

        session.push_assistant(reply);
        usage.record(
            "chat_message",
            &format!(
                "backend={}, assistant={}",
                backend_short_name(backend),
                assistant.as_ref().map(|a| a.name.as_str()).unwrap_or("none")
            ),
        );
    }

    Ok(())
}

async fn list_backends(config: &Config) -> Result<()> {
    let credentials = Credentials::from_env();
    for label in backends::available_backends(config, credentials.flags()).await {
        println!("{label}");
    }
    Ok(())
}

async fn models(config: &Config, usage: &UsageLog, command: ModelsCommand) -> Result<()> {
    match command {
        ModelsCommand::List => {
            let models = backends::ollama::list_models(config).await;
            if models.is_empty() {
                println!("No models available. Pull one: atelier models pull llama3");
            }
            for name in models {
                println!("{name}");
            }
        }

        ModelsCommand::Pull { name } => {
            let mut stream = backends::ollama::pull_model(config, &name).await;
            let mut failed = false;
            while let Some(fragment) = stream.recv().await {
                match fragment {
                    Fragment::Delta(status) => println!("{status}"),
                    Fragment::Error { message, .. } => {
                        println!("{message}");
                        failed = true;
                    }
                }
            }
            if !failed {
                usage.record("model_pulled", &format!("name={name}"));
            }
        }

        ModelsCommand::Rm { name } => {
            if backends::ollama::delete_model(config, &name).await {
                println!("Deleted {name}.");
                usage.record("model_deleted", &format!("name={name}"));
            } else {
                println!("Could not delete {name}.");
            }
        }
    }
    Ok(())
}

fn assistants(store: &AssistantStore, usage: &UsageLog, command: AssistantsCommand) -> Result<()> {
    match command {
        AssistantsCommand::List => {
            let assistants = store.load();
            if assistants.is_empty() {
                println!("No assistants yet. Create one: atelier assistants create");
                return Ok(());
            }
            for a in assistants {
                let status = match a.status {
                    AssistantStatus::Active => "Active",
                    AssistantStatus::Draft => "Draft",
                };
                let kb = if a.knowledge_base.is_empty() { "" } else { " [KB]" };
                println!(
                    "{} ({}){} - {}",
                    a.name,
                    status,
                    kb,
                    a.description
                );
            }
        }

        AssistantsCommand::Create {
            name,
            description,
            system_prompt,
            knowledge_file,
        } => {
            let knowledge_base = match knowledge_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => String::new(),
            };
            let has_kb = !knowledge_base.is_empty();
            let assistant = Assistant::new(name, description, system_prompt, knowledge_base);
            let name = assistant.name.clone();
            store.add(assistant)?;
            usage.record(
                "assistant_created",
                &format!("name={name}, has_kb={has_kb}"),
            );
            println!("Created '{name}'.");
        }

        AssistantsCommand::Rm { name } => {
            let assistant = find_assistant(store, &name)?;
            if store.remove(assistant.id)? {
                usage.record("assistant_deleted", &format!("name={name}"));
                println!("Deleted '{name}'.");
            }
        }

        AssistantsCommand::Import { path } => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let assistant = store.import(&json)?;
            usage.record(
                "assistant_imported",
                &format!("name={}", assistant.name),
            );
            println!("Imported '{}'.", assistant.name);
        }

        AssistantsCommand::Export { name } => {
            let assistant = find_assistant(store, &name)?;
            println!("{}", AssistantStore::export(&assistant)?);
        }
    }
    Ok(())
}

fn find_assistant(store: &AssistantStore, name: &str) -> Result<Assistant> {
    store
        .load()
        .into_iter()
        .find(|a| a.name == name)
        .with_context(|| format!("No assistant named '{name}'"))
}

/// Accept both short names and the display labels the chat surface shows.
fn parse_backend(input: &str) -> BackendKey {
    match input.to_lowercase().as_str() {
        "ollama" => BackendKey::Ollama,
        "claude" => BackendKey::Claude,
        "chatgpt" => BackendKey::ChatGpt,
        "grok" => BackendKey::Grok,
        _ => backends::backend_for_label(input),
    }
}

fn backend_short_name(backend: BackendKey) -> &'static str {
    match backend {
        BackendKey::Ollama => "ollama",
        BackendKey::Claude => "claude",
        BackendKey::ChatGpt => "chatgpt",
        BackendKey::Grok => "grok",
    }
}
