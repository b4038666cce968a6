pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "blocks")]
#[command(about = "Blocks CLI - serve the site and work with signed data, tokens and translations")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides configuration)")]
        port: Option<u16>,
    },

    #[command(about = "Sign data with the security key")]
    Sign {
        #[arg(help = "Data to sign, e.g. a redirect path")]
        data: String,
    },

    #[command(about = "Verify a signed token and print its data")]
    Verify {
        #[arg(help = "Signed token")]
        token: String,
    },

    #[command(about = "Issue a session JWT")]
    Token(commands::token::TokenArgs),

    #[command(about = "Translate a message")]
    Translate(commands::translations::TranslateArgs),

    #[command(about = "Translation table maintenance")]
    Translations {
        #[command(subcommand)]
        cmd: commands::translations::TranslationCommands,
    },

    #[command(about = "Inspect configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::Sign { data } => commands::signing::sign(&config, &data, output_format),
        Commands::Verify { token } => commands::signing::verify(&config, &token, output_format),
        Commands::Token(args) => commands::token::handle(&config, args, output_format),
        Commands::Translate(args) => commands::translations::translate(&config, args, output_format),
        Commands::Translations { cmd } => commands::translations::handle(&config, cmd, output_format),
        Commands::Config { cmd } => commands::config::handle(&config, cmd, output_format),
    }
}
