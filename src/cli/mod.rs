pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "easylease")]
#[command(about = "EasyLease CLI - database and account administration for the EasyLease API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(name = "create-admin", about = "Create a manager account")]
    CreateAdmin {
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Initial password")]
        password: String,
    },

    #[command(about = "Issue a JWT for an existing account")]
    Token {
        #[arg(long, help = "Account email")]
        email: String,
    },

    #[command(about = "Check a running server's /api/health endpoint")]
    Ping {
        #[arg(long, default_value = "http://localhost:4000", help = "Server base URL")]
        url: String,
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

    match cli.command {
        Commands::Migrate => commands::db::migrate(output_format).await,
        Commands::CreateAdmin { email, name, password } => {
            commands::account::create_admin(email, name, password, output_format).await
        }
        Commands::Token { email } => commands::account::token(email, output_format).await,
        Commands::Ping { url } => commands::server::ping(url, output_format).await,
    }
}
