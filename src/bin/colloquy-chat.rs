//! Interactive chat application for conversing with a chat-completion provider.
//!
//! # Usage
//!
//! ```bash
//! # Stream replies from the chat endpoint
//! COLLOQUY_API_KEY=sk-... colloquy-chat
//!
//! # Set a system prompt
//! colloquy-chat --system "You are a helpful coding assistant"
//!
//! # Talk to an assistant, remembering the thread between sessions
//! colloquy-chat --assistant --assistant-id asst_123 --thread-file ~/.colloquy-thread
//! ```
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/system [prompt]` - Set or show the system prompt
//! - `/history` - Print the conversation so far
//! - `/thread` - Show the assistant thread
//! - `/reset` - Start a new assistant thread
//! - `/quit` - Exit the application

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use colloquy::chat::{ChatCommand, help_text, parse_command};
use colloquy::{
    AssistantClient, ChatArgs, ChatClient, FileThreadStore, MemoryThreadStore, ThreadStore,
};

enum Backend {
    Chat(ChatClient),
    Assistant(AssistantClient),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("colloquy-chat [OPTIONS]");
    let config = args.into_config()?;
    let model = config.model.clone();

    let backend = if args.assistant {
        let store: Arc<dyn ThreadStore> = match &args.thread_file {
            Some(path) => Arc::new(FileThreadStore::new(path)),
            None => Arc::new(MemoryThreadStore::new()),
        };
        Backend::Assistant(AssistantClient::with_store(config, store)?)
    } else {
        let client = ChatClient::new(config)?;
        if let Some(system) = &args.system {
            client.set_system_prompt(system.clone()).await;
        }
        Backend::Chat(client)
    };

    let mut rl = DefaultEditor::new()?;

    // Set while a reply is printing; cleared before each prompt.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    match &backend {
        Backend::Chat(_) => println!("Colloquy chat (model: {model})"),
        Backend::Assistant(_) => println!("Colloquy assistant (model: {model})"),
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        interrupted.store(false, Ordering::Relaxed);

        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    if cmd == ChatCommand::Quit {
                        println!("Goodbye!");
                        break;
                    }
                    run_command(&backend, cmd).await;
                    continue;
                }

                println!("Assistant:");
                let result = match &backend {
                    Backend::Chat(client) => stream_reply(client, line, &interrupted).await,
                    Backend::Assistant(client) => {
                        client
                            .send_message(line, |reply| println!("{reply}\n"))
                            .await
                    }
                };
                if let Err(err) = result {
                    eprintln!("error: {err}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("error: input error: {err}");
                break;
            }
        }
    }

    if let Backend::Assistant(client) = &backend {
        client.shutdown();
    }
    Ok(())
}

async fn stream_reply(
    client: &ChatClient,
    line: &str,
    interrupted: &AtomicBool,
) -> colloquy::Result<()> {
    let mut printed = 0;
    let mut stdout = std::io::stdout();
    client
        .send_message_stream(line, |accumulated| {
            if interrupted.load(Ordering::Relaxed) {
                return;
            }
            if let Some(delta) = accumulated.get(printed..) {
                let _ = stdout.write_all(delta.as_bytes());
                let _ = stdout.flush();
            }
            printed = accumulated.len();
        })
        .await?;
    if interrupted.load(Ordering::Relaxed) {
        println!("\n[interrupted]");
    }
    println!("\n");
    Ok(())
}

async fn run_command(backend: &Backend, cmd: ChatCommand) {
    match (backend, cmd) {
        (_, ChatCommand::Help) => {
            for line in help_text().lines() {
                println!("    {line}");
            }
        }
        (_, ChatCommand::Invalid(message)) => eprintln!("error: {message}"),
        (_, ChatCommand::Quit) => {}
        (Backend::Chat(client), ChatCommand::Clear) => {
            client.clear_history().await;
            println!("    Conversation cleared.");
        }
        (Backend::Chat(client), ChatCommand::System(Some(prompt))) => {
            client.set_system_prompt(prompt.clone()).await;
            println!("    System prompt set to: {prompt}");
        }
        (Backend::Chat(client), ChatCommand::System(None)) => match client.system_prompt().await {
            Some(prompt) => println!("    System prompt: {prompt}"),
            None => println!("    System prompt: (none)"),
        },
        (Backend::Chat(client), ChatCommand::History) => {
            for message in client.history().await {
                println!("    {}: {}", message.role, message.content);
            }
            println!("    ({} messages)", client.message_count().await);
        }
        (Backend::Assistant(client), ChatCommand::Thread) => match client.thread_id().await {
            Some(thread_id) => println!("    Thread: {thread_id}"),
            None => println!("    Thread: (none yet)"),
        },
        (Backend::Assistant(client), ChatCommand::Reset | ChatCommand::Clear) => {
            client.reset_thread().await;
            println!("    Thread forgotten; the next message starts a new one.");
        }
        (Backend::Chat(_), ChatCommand::Thread | ChatCommand::Reset) => {
            eprintln!("error: thread commands need --assistant");
        }
        (Backend::Assistant(_), ChatCommand::System(_) | ChatCommand::History) => {
            eprintln!("error: the assistant keeps its own history and instructions");
        }
    }
}
