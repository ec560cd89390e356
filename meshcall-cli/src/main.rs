use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use meshcall::client::{
    CallConfig, CallHandle, CallObserver, CallOrchestrator, MediaHandle, ReceiveOnly,
    TranslationClient,
};
use meshcall::model::{ChatMessage, IceServerConfig, Participant, ParticipantId};
use meshcall::server::{
    DEFAULT_DETECT_URL, DEFAULT_STUN_ADDR, DEFAULT_TRANSLATE_URL, ServerConfig,
    SignalingServer, shutdown_signal,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshcall", version, about = "Mesh video call signaling server and client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server with its HTTP proxies.
    Serve(ServeArgs),
    /// Join a call as a receive-only participant and chat from the terminal.
    Join(JoinArgs),
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "MESHCALL_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    #[arg(long, env = "MESHCALL_DETECT_URL", default_value = DEFAULT_DETECT_URL)]
    detect_url: String,

    #[arg(long, env = "MESHCALL_TRANSLATE_URL", default_value = DEFAULT_TRANSLATE_URL)]
    translate_url: String,

    #[arg(long, env = "MESHCALL_PROXY_TIMEOUT_MS", default_value_t = 5000)]
    proxy_timeout_ms: u64,

    #[arg(long, env = "MESHCALL_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        let mut ice_servers = vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)];
        if let Some(url) = self.turn_url {
            ice_servers.push(IceServerConfig {
                urls: vec![url],
                username: self.turn_username,
                credential: self.turn_credential,
            });
        }

        ServerConfig {
            bind: self.bind,
            detect_url: self.detect_url,
            translate_url: self.translate_url,
            proxy_timeout: Duration::from_millis(self.proxy_timeout_ms),
            static_dir: self.static_dir,
            ice_servers,
        }
    }
}

#[derive(Args)]
struct JoinArgs {
    /// HTTP base of the server; the WebSocket URL is derived from it.
    #[arg(long, env = "MESHCALL_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Display name; prompted for when omitted.
    #[arg(long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(args) => serve(args).await,
        Commands::Join(args) => join(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.into_config();
    let server = SignalingServer::bind(config).await?;
    println!(
        "{} {}",
        "Signaling server listening on".green().bold(),
        server.local_addr()?
    );
    server.run(shutdown_signal()).await
}

async fn join(args: JoinArgs) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => Input::<String>::new()
            .with_prompt("Your name")
            .interact_text()
            .context("Failed to read display name")?,
    };

    let config = CallConfig::from_server(&args.server, name);
    let translator = TranslationClient::from_config(&config);
    let (orchestrator, handle) =
        CallOrchestrator::join(config, &ReceiveOnly, Arc::new(TerminalObserver)).await?;
    let mut call = tokio::spawn(orchestrator.run());

    println!(
        "{}",
        "Joined. Type to chat, '/translate <lang> <text>' to send speech, '/quit' to leave."
            .cyan()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = &mut call => {
                result.context("Call task panicked")??;
                println!("{}", "Server closed the call".yellow());
                return Ok(());
            }
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_input(&handle, &translator, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    handle.leave()?;
    call.await.context("Call task panicked")??;
    println!("{}", "Left the call".yellow());
    Ok(())
}

/// Returns false when the user asked to leave.
async fn handle_input(handle: &CallHandle, translator: &TranslationClient, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }
    if line == "/quit" {
        return false;
    }

    let sent = if let Some(rest) = line.strip_prefix("/translate ") {
        let Some((language, text)) = rest.split_once(' ') else {
            println!("{}", "usage: /translate <lang> <text>".red());
            return true;
        };
        match translator.translate(text, language).await {
            Ok(t) => handle.send_speech(t.translated_text, t.audio_url),
            Err(e) => {
                println!("{} {}", "Translation failed:".red(), e);
                return true;
            }
        }
    } else {
        handle.send_chat(line)
    };

    match sent {
        Ok(chat) => print_chat(&chat, true),
        Err(e) => println!("{} {}", "Send failed:".red(), e),
    }
    true
}

fn print_chat(chat: &ChatMessage, own: bool) {
    let name = if own {
        format!("{} (you)", chat.name).blue().bold()
    } else {
        chat.name.magenta().bold()
    };
    let marker = if chat.is_speech() { " [speech]" } else { "" };
    println!("{}{}: {}", name, marker.dimmed(), chat.message);
}

struct TerminalObserver;

impl CallObserver for TerminalObserver {
    fn on_remote_stream_established(
        &self,
        id: &ParticipantId,
        display_name: &str,
        media: &MediaHandle,
    ) {
        println!(
            "{} {} ({}) {:?} track {}",
            "+".green().bold(),
            display_name,
            id,
            media.kind,
            media.track_id
        );
    }

    fn on_remote_participant_removed(&self, id: &ParticipantId) {
        println!("{} {} left", "-".red().bold(), id);
    }

    fn on_chat_message(&self, chat: &ChatMessage) {
        print_chat(chat, false);
    }

    fn on_participants_changed(&self, participants: &[Participant]) {
        let names: Vec<&str> = participants.iter().map(|p| p.name.as_str()).collect();
        println!("{} {}", "In call:".cyan(), names.join(", "));
    }
}
