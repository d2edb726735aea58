//! # join-wizard
//!
//! Runs the membership signup wizard from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Point the wizard at a membership frontend
//! export JOIN_FRONTEND_URL=https://members.example.org
//!
//! # Submit a filled-in form
//! join-wizard --form signup.toml
//! ```

use clap::Parser;
use join_api::{ApiClientConfig, AppState, FormFile};
use join_core::JoinConfig;
use join_stripe::StripeConfig;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Membership signup wizard
#[derive(Parser)]
#[command(name = "join-wizard")]
#[command(about = "Run the membership signup wizard against a live backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Form file (TOML) with the wizard inputs and an optional [payment] table
    #[arg(short, long, env = "JOIN_FORM")]
    form: PathBuf,

    /// Wizard configuration file (TOML); the JOIN_* environment is used otherwise
    #[arg(short, long, env = "JOIN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the fee region
    #[arg(long)]
    fee_region: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "JOIN_LOG_JSON")]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if cli.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    print_banner();

    let mut config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            JoinConfig::from_toml(&content)?
        }
        None => JoinConfig::from_env()?,
    };
    if let Some(region) = cli.fee_region {
        config = config.with_fee_region(region);
        config.validate()?;
    }

    info!("Frontend: {}", config.frontend_url);
    info!("Fee region: {}", config.fee_region);

    let form_file = FormFile::load(&cli.form)?;
    let state = AppState::new(
        config,
        form_file,
        &ApiClientConfig::from_env(),
        StripeConfig::from_env()?,
    )?;

    let destination = state.run().await?;
    println!("{}", destination);

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  join-wizard
  ━━━━━━━━━━━━━━━━━━━━━━━
  Membership signup
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
