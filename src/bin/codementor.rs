//! `codementor`: terminal front end for a running relay.
//!
//! Offers the same modes as the web UI: streaming chat, code analysis,
//! code generation, debugging help and topic tutoring.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use codementor_relay::client::prompts::Task;
use codementor_relay::client::RelayClient;
use codementor_relay::store::{ConversationDraft, ConversationStore, JsonFileStore, SettingsPatch};
use codementor_relay::upstream::ChatMessage;

/// Longest message prefix used as a conversation title.
const TITLE_CHARS: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "codementor", about = "Chat and coding help through a codementor relay")]
struct Args {
    /// Relay base URL.
    #[arg(long, env = "CODEMENTOR_SERVER", default_value = "http://localhost:3001")]
    server: String,

    /// Model name; defaults to the saved setting.
    #[arg(short, long)]
    model: Option<String>,

    /// Directory for saved conversations and settings.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a chat reply.
    Chat {
        /// Message to send.
        message: String,
    },
    /// Review a source file.
    Analyze {
        #[arg(short, long, default_value = "Rust")]
        language: String,
        file: PathBuf,
    },
    /// Generate code from a plain-English description.
    Generate {
        #[arg(short, long, default_value = "Rust")]
        language: String,
        description: String,
    },
    /// Explain an error message, optionally with related code.
    Debug {
        #[arg(short, long)]
        error: String,
        #[arg(short, long)]
        code: Option<PathBuf>,
    },
    /// Learn about a programming topic.
    Learn { topic: String },
    /// List models available upstream.
    Models,
    /// Check relay health.
    Health,
    /// Persist the default model.
    UseModel { model: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = if args.verbose {
        "codementor_relay=debug"
    } else {
        "codementor_relay=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| dirs::data_dir().map(|d| d.join("codementor")))
        .unwrap_or_else(|| PathBuf::from(".codementor"));
    let store = JsonFileStore::new(data_dir);
    let model = args.model.clone().unwrap_or_else(|| store.settings().model);
    let client = RelayClient::new(&args.server);

    match args.command {
        Command::Chat { message } => {
            let messages = vec![ChatMessage::user(message.clone())];
            let mut stdout = std::io::stdout();
            let reply = client
                .chat_stream(&messages, &model, None, |fragment| {
                    let _ = write!(stdout, "{fragment}");
                    let _ = stdout.flush();
                })
                .await?;
            println!();

            let mut conversation = messages;
            conversation.push(ChatMessage::assistant(reply));
            let record = store.save(ConversationDraft {
                title: Some(message.trim().chars().take(TITLE_CHARS).collect()),
                messages: conversation,
                ..Default::default()
            })?;
            tracing::debug!(id = %record.id, "Conversation saved");
        }
        Command::Analyze { language, file } => {
            let code = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            run_task(&client, &store, &model, Task::Analyze { language, code }).await?;
        }
        Command::Generate {
            language,
            description,
        } => {
            run_task(
                &client,
                &store,
                &model,
                Task::Generate {
                    language,
                    description,
                },
            )
            .await?;
        }
        Command::Debug { error, code } => {
            let code = match code {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => None,
            };
            run_task(&client, &store, &model, Task::Debug { error, code }).await?;
        }
        Command::Learn { topic } => {
            run_task(&client, &store, &model, Task::Learn { topic }).await?;
        }
        Command::Models => {
            for entry in client.list_models().await? {
                let name = entry.get("name").and_then(Value::as_str).unwrap_or("?");
                println!("{name}");
            }
        }
        Command::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Command::UseModel { model } => {
            let settings = store.save_settings(SettingsPatch {
                model: Some(model),
                theme: None,
            })?;
            println!("Default model: {}", settings.model);
        }
    }

    Ok(())
}

/// Run a one-shot task, print the reply and save it as a follow-up chat.
async fn run_task(
    client: &RelayClient,
    store: &JsonFileStore,
    model: &str,
    task: Task,
) -> anyhow::Result<()> {
    let reply = client.chat(&task.messages(), model, None).await?;
    println!("{reply}");

    let seed = task.follow_up(Some(&reply));
    let record = store.save(ConversationDraft {
        title: Some(seed.title),
        messages: seed.messages,
        ..Default::default()
    })?;
    tracing::debug!(id = %record.id, "Follow-up saved");
    Ok(())
}
