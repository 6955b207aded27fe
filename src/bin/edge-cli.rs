use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use storefront_edge::config::load_config;

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Management CLI for the storefront edge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the performance snapshot of a running edge
    Performance {
        /// Path of the performance endpoint
        #[arg(long, default_value = "/__performance")]
        path: String,
    },
    /// Validate a config file and print the effective configuration
    Check {
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Performance { path } => {
            let client = reqwest::Client::new();
            let res = client
                .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Check { config } => {
            let config = load_config(&config)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: edge returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
