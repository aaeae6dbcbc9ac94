//! Verifile CLI: email-verified file uploads from the terminal.
//!
//! Set VERIFILE_API_URL to point at the server (default http://localhost:4000).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use verifile_cli::{init_tracing, interactive::run_wizard, load_file_draft, print_json};
use verifile_client::{ApiClient, HttpBackend, SimulatedBackend, VerificationBackend, Wizard};
use verifile_core::constants::MAX_FILE_SIZE_BYTES;

#[derive(Parser)]
#[command(name = "verifile", about = "Email-verified file uploads")]
struct Cli {
    /// API base URL
    #[arg(long, env = "VERIFILE_API_URL", default_value = verifile_client::DEFAULT_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a one-time passcode for an email address
    SendOtp {
        email: String,
    },
    /// Check a passcode and print the upload token
    Verify {
        email: String,
        otp: String,
    },
    /// Upload a file with an upload token from `verify`
    Upload {
        email: String,
        /// Path to the file to upload
        file: PathBuf,
        /// Upload token returned by `verify`
        #[arg(long)]
        token: String,
    },
    /// Walk through email, passcode, and upload interactively
    Wizard {
        /// Use an offline backend that accepts any 6-digit code
        #[arg(long)]
        simulate: bool,
    },
    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url).context("Failed to create API client")?;
    tracing::debug!(api_url = %client.base_url(), "Using API");

    match cli.command {
        Commands::SendOtp { email } => {
            let response = client.generate_otp(&email).await?;
            print_json(&response)?;
        }
        Commands::Verify { email, otp } => {
            let response = client.verify_otp(&email, &otp).await?;
            print_json(&response)?;
            if !response.verified {
                std::process::exit(1);
            }
        }
        Commands::Upload { email, file, token } => {
            let draft = load_file_draft(&file, MAX_FILE_SIZE_BYTES)?;
            let backend = HttpBackend::new(client);
            let result = backend.upload(&email, &token, &draft).await?;
            print_json(&result)?;
        }
        Commands::Wizard { simulate } => {
            if simulate {
                interactive(Wizard::new(SimulatedBackend::new())).await?;
            } else {
                interactive(Wizard::new(HttpBackend::new(client))).await?;
            }
        }
        Commands::Health => {
            let response = client.health().await?;
            print_json(&response)?;
        }
    }

    Ok(())
}

async fn interactive<B: VerificationBackend>(mut wizard: Wizard<B>) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_wizard(&mut wizard, &mut stdin.lock(), &mut stdout.lock()).await
}
