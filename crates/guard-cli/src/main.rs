//! Command-line front end for the inline guard: load a configuration,
//! validate it, or run a single request through the `before_request` /
//! `after_response` pipeline and print the resulting decision.

use std::path::PathBuf;

use clap::Parser;
use guard_core::{GuardConfig, InboundRequest, RuntimeGuard};

#[derive(Parser)]
#[command(name = "promptguard")]
#[command(about = "Inline security and cost-control gateway for LLM interactions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate a configuration file without starting anything.
    Check {
        #[arg(short, long, default_value = "config/guard.toml")]
        config: PathBuf,
    },
    /// Run a single user message through before_request and print the decision.
    Scan {
        #[arg(short, long, default_value = "config/guard.toml")]
        config: PathBuf,
        #[arg(long, default_value = "cli-session")]
        session_id: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        #[arg(long, default_value = "You are a helpful assistant.")]
        system_prompt: String,
        /// The user message to scan.
        message: String,
    },
    /// Print build and default-configuration information.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check { config }) => check(&config)?,
        Some(Commands::Scan {
            config,
            session_id,
            model,
            system_prompt,
            message,
        }) => scan(&config, session_id, model, system_prompt, message).await?,
        Some(Commands::Status) => status(),
        None => {
            println!("promptguard {} - use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn check(config_path: &PathBuf) -> anyhow::Result<()> {
    let config = if config_path.exists() {
        GuardConfig::load(config_path)?
    } else {
        println!("no config file at {}, using defaults", config_path.display());
        GuardConfig::default()
    };
    println!(
        "config ok: fail_closed={}, daily_budget={}",
        config.global.fail_closed, config.policy.daily_budget
    );
    Ok(())
}

async fn scan(
    config_path: &PathBuf,
    session_id: String,
    model: String,
    system_prompt: String,
    message: String,
) -> anyhow::Result<()> {
    let config = if config_path.exists() {
        GuardConfig::load(config_path)?
    } else {
        GuardConfig::default()
    };
    let guard = RuntimeGuard::new(config)?;
    let request = InboundRequest {
        session_id,
        model,
        temperature: 0.7,
        system_prompt,
        user_message: message,
    };
    let response = guard.before_request(&request).await?;

    println!("decision: {:?}", response.decision);
    println!("risk_score: {:.2}", response.risk_score);
    if let Some(model) = &response.selected_model {
        println!("selected_model: {model}");
    }
    if let Some(compressed) = &response.compressed_prompt {
        println!("compressed_prompt: {compressed}");
    }
    if let Some(cached) = &response.cached_response {
        println!("cached_response: {cached}");
    }
    if response.sanitized_message != request.user_message {
        println!("sanitized_message: {}", response.sanitized_message);
    }

    Ok(())
}

fn status() {
    let config = GuardConfig::default();
    println!("promptguard {}", env!("CARGO_PKG_VERSION"));
    println!("default daily_budget: {}", config.policy.daily_budget);
    println!("default cache capacity: {}", config.cache.capacity);
    println!("fail_closed by default: {}", config.global.fail_closed);
}
