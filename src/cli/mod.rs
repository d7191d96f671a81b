pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bootcamp-api")]
#[command(about = "Bootcamp directory API - server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Keep data in memory instead of PostgreSQL")]
        memory: bool,
        #[arg(long, help = "Port override (defaults to PORT or 5000)")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending SQL migrations")]
    Migrate,

    #[command(about = "Load or remove fixture data")]
    Seed {
        #[command(subcommand)]
        cmd: commands::seed::SeedCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { memory: false, port: None }) {
        Commands::Serve { memory, port } => commands::serve::handle(config, memory, port).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Seed { cmd } => commands::seed::handle(cmd, config, output_format).await,
    }
}
