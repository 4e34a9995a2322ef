mod app;
mod chat_cmd;
mod config_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use storytalk_agent::{Route, TranslationLanguage};
use storytalk_config::{config_dir, config_file_path, load_and_prepare, StorytalkConfig};
use storytalk_core::{detect_language, Level};
use storytalk_logging::{init_console_logger, init_logger, set_event_redaction};
use storytalk_providers::pricing_for;

use app::App;
use terminal_output::{note_info, render_table};

#[derive(Parser)]
#[command(name = "storytalk")]
#[command(about = "Storytalk: story-based English conversation practice")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive role-play conversation
    Chat {
        #[arg(short, long, default_value = "travel")]
        topic: String,
        #[arg(short, long, default_value = "beginner")]
        level: Level,
        /// Resume under a fixed conversation id
        #[arg(long)]
        conversation_id: Option<String>,
    },
    /// Generate a single scenario
    Scenario {
        #[arg(short, long, default_value = "travel")]
        topic: String,
        #[arg(short, long, default_value = "beginner")]
        level: Level,
    },
    /// Translate English text
    Translate {
        text: String,
        #[arg(long, default_value = "ukrainian")]
        to: TranslationLanguage,
    },
    /// Show which provider a message would be routed to
    Detect { text: String },
    /// List configured providers, models and prices
    Providers,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: config_cmd::ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Config { command } => {
            init_console_logger("warn");
            config_cmd::run(command, &path).await
        }
        Commands::Detect { text } => {
            let language = detect_language(&text);
            println!(
                "{} -> {:?}",
                language.as_str(),
                Route::for_language(language)
            );
            Ok(())
        }
        command => {
            let config = load_and_prepare(&path).await?;
            init_logging(&config, matches!(command, Commands::Chat { .. }));
            let app = App::from_config(&config)?;
            run_command(command, &app).await
        }
    }
}

fn init_logging(config: &StorytalkConfig, interactive: bool) {
    let logging = config.logging();
    let level = logging.level.unwrap_or_else(|| "info".to_string());
    set_event_redaction(logging.redact_sensitive.unwrap_or(true));
    match logging.dir {
        Some(dir) => init_logger(dir, &level),
        // Keep an interactive session readable unless RUST_LOG asks otherwise.
        None if interactive => init_console_logger("warn"),
        None => init_console_logger(&level),
    }
}

async fn run_command(command: Commands, app: &App) -> Result<()> {
    match command {
        Commands::Chat {
            topic,
            level,
            conversation_id,
        } => chat_cmd::run(app, &topic, level, conversation_id).await,
        Commands::Scenario { topic, level } => {
            let scenario = app.scenarios.generate_scenario(&topic, level).await;
            println!("{}", serde_json::to_string_pretty(&scenario)?);
            Ok(())
        }
        Commands::Translate { text, to } => {
            let result = app.translator.get_translation(&text, to).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Providers => {
            print_providers(app);
            Ok(())
        }
        Commands::Detect { .. } | Commands::Config { .. } => Ok(()),
    }
}

fn print_providers(app: &App) {
    let rows: Vec<Vec<String>> = app
        .registry
        .list()
        .into_iter()
        .filter_map(|name| app.provider(&name).map(|p| (name, p)))
        .map(|(name, provider)| {
            let model = provider.model().to_string();
            let price = match pricing_for(&model) {
                Some(p) => format!("${} / ${}", p.input_per_million, p.output_per_million),
                None => "unknown".to_string(),
            };
            vec![name, model, price]
        })
        .collect();
    note_info("Registered providers (USD per 1M input / output tokens)");
    print!("{}", render_table(&["provider", "model", "price"], &rows));
}
