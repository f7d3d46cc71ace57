pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "larek")]
#[command(about = "Larek CLI - command-line client for the WebLarek API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "LAREK_API_URL", help = "API base URL (saved to the session)")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Fetch an anti-forgery token for this session")]
    CsrfToken,

    #[command(about = "Exchange the refresh cookie for a new access token")]
    Refresh,

    #[command(about = "Customer administration")]
    Customers {
        #[command(subcommand)]
        cmd: commands::customers::CustomerCommands,
    },

    #[command(about = "Order administration")]
    Orders {
        #[command(subcommand)]
        cmd: commands::orders::OrderCommands,
    },

    #[command(about = "Product administration")]
    Products {
        #[command(subcommand)]
        cmd: commands::products::ProductCommands,
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
    let api = config::build_api(cli.base_url.as_deref()).await?;

    match cli.command {
        Commands::CsrfToken => commands::session::csrf_token(&api, output_format).await,
        Commands::Refresh => commands::session::refresh(&api, output_format).await,
        Commands::Customers { cmd } => commands::customers::handle(&api, cmd, output_format).await,
        Commands::Orders { cmd } => commands::orders::handle(&api, cmd, output_format).await,
        Commands::Products { cmd } => commands::products::handle(&api, cmd, output_format).await,
    }
}
