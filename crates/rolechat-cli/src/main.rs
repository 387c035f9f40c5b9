//! rolechat CLI: terminal chat with role presets

use clap::{Parser, Subcommand};
use rolechat_engine::{
    ApiKey, Config, Conversation, ConversationController, OpenAiClient, Outcome, RolePreset,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Chat with an OpenAI-compatible model in your terminal
#[derive(Parser)]
#[command(name = "rolechat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/rolechat/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to request, overriding the config file
    #[arg(long, global = true)]
    model: Option<String>,

    /// Role preset to start with (see `rolechat presets`)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat TUI (default when no command specified)
    Tui,

    /// Send one message and print the reply
    Ask {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// List the available role presets
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    Init,

    /// Print configuration diagnostics
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "warn";

const LOG_FILE: &str = "rolechat.log";

fn main() {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Tui));
    let log_guard = init_logging(interactive);

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };

    // Flush buffered log lines before exiting.
    drop(log_guard);
    std::process::exit(code);
}

fn run(cli: Cli) -> CliResult {
    match &cli.command {
        None | Some(Commands::Tui) => cmd_tui(&cli),
        Some(Commands::Ask { message }) => cmd_ask(&cli, &message.join(" ")),
        Some(Commands::Presets { json }) => cmd_presets(&cli, *json),
        Some(Commands::Init) => cmd_init(&cli),
        Some(Commands::Doctor { json }) => cmd_doctor(&cli, *json),
    }
}

/// Install the tracing subscriber.
///
/// The TUI owns the terminal, so its logs go to a file; every other command
/// logs to stderr.
fn init_logging(interactive: bool) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if !interactive {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        return None;
    }

    let dir = log_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, LOG_FILE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}

fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("rolechat"))
}

fn config_path(cli: &Cli) -> Result<PathBuf, rolechat_engine::ConfigError> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Config::default_path(),
    }
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config, rolechat_engine::ConfigError> {
    let path = config_path(cli)?;
    let mut config = Config::load_or_default(&path)?;
    apply_overrides(cli, &mut config)?;
    info!(path = %path.display(), model = %config.model, "configuration loaded");
    Ok(config)
}

fn apply_overrides(cli: &Cli, config: &mut Config) -> Result<(), rolechat_engine::ConfigError> {
    if let Some(model) = &cli.model {
        config.model.clone_from(model);
    }
    if let Some(preset) = &cli.preset {
        config.set_default_preset(preset)?;
    }
    Ok(())
}

/// Config plus a ready client. Fails before any UI opens if the key is missing.
fn connect(cli: &Cli) -> Result<(Config, OpenAiClient), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    let api_key = ApiKey::from_env()?;
    let client = OpenAiClient::from_config(&config, api_key)?;
    Ok((config, client))
}

fn cmd_tui(cli: &Cli) -> CliResult {
    let (config, client) = connect(cli)?;
    let conversation = Conversation::from_config(&config);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(rolechat_tui::run_tui(conversation, Arc::new(client)))
}

fn cmd_ask(cli: &Cli, message: &str) -> CliResult {
    let (config, client) = connect(cli)?;
    let mut controller = ConversationController::new(Conversation::from_config(&config), client);

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(controller.send_user_message(message))? {
        Outcome::Reply(reply) => {
            println!("{reply}");
            Ok(())
        }
        Outcome::Failed(error) => Err(error.into()),
    }
}

fn cmd_presets(cli: &Cli, json: bool) -> CliResult {
    let active = load_config(cli)?.default_preset;

    if json {
        let presets: Vec<_> = RolePreset::all()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name(),
                    "label": p.label(),
                    "content": p.content(),
                    "default": *p == active,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&presets)?);
        return Ok(());
    }

    println!("Role presets\n");
    for (i, preset) in RolePreset::all().iter().enumerate() {
        let marker = if *preset == active { "*" } else { " " };
        println!("{marker} {}. {:<22} {}", i + 1, preset.name(), preset.label());
        println!("     {}", preset.content());
    }
    println!("\n* = default. Use --preset <name> to start with another.");
    Ok(())
}

fn cmd_init(cli: &Cli) -> CliResult {
    let path = config_path(cli)?;
    Config::init(&path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set OPENAI_API_KEY in your environment or a .env file, then run `rolechat`.");
    Ok(())
}

fn cmd_doctor(cli: &Cli, json: bool) -> CliResult {
    let path = config_path(cli)?;
    let config_exists = path.exists();
    let config = load_config(cli)?;
    // Only presence is reported; the key itself never leaves ApiKey.
    let api_key_present = ApiKey::from_env().is_ok();
    let endpoint = format!("{}/chat/completions", config.api_base_url.trim_end_matches('/'));
    let log_file = log_dir().map(|dir| dir.join(LOG_FILE));

    if json {
        let report = serde_json::json!({
            "config_path": path,
            "config_exists": config_exists,
            "model": config.model,
            "endpoint": endpoint,
            "request_timeout_seconds": config.request_timeout_seconds,
            "default_preset": config.default_preset.name(),
            "api_key_present": api_key_present,
            "log_file": log_file,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("rolechat diagnostics\n");
    let exists = if config_exists { "" } else { " (not found, using defaults)" };
    println!("  Config:   {}{exists}", path.display());
    println!("  Model:    {}", config.model);
    println!("  Endpoint: {endpoint}");
    println!("  Timeout:  {}s", config.request_timeout_seconds);
    println!("  Preset:   {}", config.default_preset.name());
    println!(
        "  API key:  {}",
        if api_key_present { "present" } else { "missing" }
    );
    if let Some(log_file) = log_file {
        println!("  Log file: {}", log_file.display());
    }
    Ok(())
}
