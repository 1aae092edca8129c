//! Basket CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! basket-cli migrate
//!
//! # Merge a guest session into a user account by hand
//! basket-cli transfer --session guest_abc_1700000000000 --user user-42
//!
//! # Inspect what a guest session holds
//! basket-cli guest show --session guest_abc_1700000000000
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `transfer` - Transfer a guest cart and favorites to a user
//! - `guest show` - Dump a guest session, cart and favorites as JSON

#![cfg_attr(not(test), forbid(unsafe_code))]

use basket_core::{SessionId, UserId};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "basket-cli")]
#[command(author, version, about = "Basket CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Transfer a guest session's cart and favorites to a user
    Transfer {
        /// Guest session id
        #[arg(short, long)]
        session: SessionId,

        /// User id to receive the guest data
        #[arg(short, long)]
        user: UserId,
    },
    /// Inspect guest state
    Guest {
        #[command(subcommand)]
        action: GuestAction,
    },
}

#[derive(Subcommand)]
enum GuestAction {
    /// Print a guest session record, cart and favorites
    Show {
        /// Guest session id
        #[arg(short, long)]
        session: SessionId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Transfer { session, user } => {
            let succeeded = commands::transfer::run(&session, &user).await?;
            if !succeeded {
                return Err("transfer incomplete, see report".into());
            }
        }
        Commands::Guest { action } => match action {
            GuestAction::Show { session } => commands::guest::show(&session).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_transfer_args_are_validated() {
        assert!(
            Cli::try_parse_from(["basket-cli", "transfer", "-s", "guest_a_1", "-u", "user-1"])
                .is_ok()
        );
        assert!(
            Cli::try_parse_from(["basket-cli", "transfer", "-s", "bad id", "-u", "user-1"])
                .is_err()
        );
    }
}
