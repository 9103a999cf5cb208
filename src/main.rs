//! # Warhorn CLI
//!
//! Community event bot for game guilds: line-up participation tracking,
//! recurring announcements, and countdown timers.
//!
//! Usage:
//!   warhorn start                      # Connect and run the bot
//!   warhorn next                       # Show the next recurring broadcast
//!   warhorn config show                # Show configuration
//!   warhorn info                       # Show system info

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use warhorn_core::WarhornConfig;

#[derive(Parser)]
#[command(
    name = "warhorn",
    version,
    about = "📯 Warhorn — community event bot for game guilds",
    long_about = "Line-up participation tracking, recurring event announcements,\nand countdown timers over a single Discord gateway connection."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the bot
    Start,

    /// Show the next recurring broadcast time
    Next,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Reset to defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "warhorn=debug,warhorn_bot=debug,warhorn_channels=debug,warhorn_scheduler=debug"
    } else {
        "warhorn=info,warhorn_bot=info,warhorn_channels=info,warhorn_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        WarhornConfig::load_from(std::path::Path::new(path))?
    } else {
        WarhornConfig::load()?
    };

    match cli.command {
        Commands::Start => {
            if config.discord.token.is_empty() {
                println!("❌ Bot token is not set!");
                println!("   Set WARHORN_TOKEN (or DISCORD_TOKEN) in the environment,");
                println!("   or add it to {} under [discord].", WarhornConfig::default_path().display());
                std::process::exit(1);
            }

            println!("📯 Warhorn v{} starting", env!("CARGO_PKG_VERSION"));
            println!("   Timezone: {}", config.announce.timezone);
            println!("   Recurring hours: {:?}", config.announce.hours);
            println!("   Press Ctrl+C to stop\n");

            let bot = warhorn_bot::Bot::new(config);
            tokio::select! {
                result = bot.run() => {
                    result?;
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\n👋 Warhorn stopped.");
                }
            }
        }

        Commands::Next => {
            let tz: chrono_tz::Tz = config.tz()?;
            let next = warhorn_scheduler::timeparse::next_recurring(
                chrono::Utc::now(),
                tz,
                &config.announce.hours,
            );
            println!(
                "Next broadcast: {} ({} local, {tz})",
                next,
                next.with_timezone(&tz).format("%H:%M")
            );
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let mut shown = config.clone();
                if !shown.discord.token.is_empty() {
                    shown.discord.token = "<set>".into();
                }
                println!("{}", toml::to_string_pretty(&shown)?);
            }
            ConfigAction::Reset => {
                let config = WarhornConfig::default();
                config.save()?;
                println!("✅ Configuration reset to defaults.");
                println!("   Path: {}", WarhornConfig::default_path().display());
            }
        },

        Commands::Info => {
            println!("📯 Warhorn v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", WarhornConfig::default_path().display());
            println!("   Token: {}", if config.discord.token.is_empty() { "unset" } else { "set" });
            println!("   Announce channel: {}", config.announce.channel_id);
            println!(
                "   Keepalive: {}",
                if config.keepalive.enabled {
                    format!("port {}", config.keepalive.port)
                } else {
                    "disabled".into()
                }
            );
        }
    }

    Ok(())
}
