//! Bazaar CLI - Database migrations, accounts and offline feed imports.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bazaar-cli migrate
//!
//! # Create a seller account (prints its token once)
//! bazaar-cli user create -e seller@example.com -k shop
//!
//! # Issue another token
//! bazaar-cli user token -e seller@example.com
//!
//! # Import a feed from disk
//! bazaar-cli import -e seller@example.com -f shop1.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage accounts and tokens
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Replace a seller's catalog from a local feed file
    Import {
        /// Seller account email
        #[arg(short, long)]
        email: String,

        /// Path to the YAML feed
        #[arg(short, long)]
        file: String,

        /// Category rename policy (`preserve`, `update`, `reject`)
        #[arg(short, long)]
        policy: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account and print its token
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account kind (`shop`, `buyer`)
        #[arg(short, long, default_value = "buyer")]
        kind: String,
    },
    /// Issue an additional token for an account
    Token {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, kind } => commands::user::create(&email, &kind).await?,
            UserAction::Token { email } => commands::user::token(&email).await?,
        },
        Commands::Import {
            email,
            file,
            policy,
        } => commands::import::run(&email, &file, policy.as_deref()).await?,
    }
    Ok(())
}
