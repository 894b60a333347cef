//! Medicart CLI - inspect and edit the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Guest cart, stored under .medicart/
//! medicart add paracetamol-500 -q 2 --price 35.50 --name "Paracetamol 500mg"
//! medicart set-quantity paracetamol-500 4
//! medicart show
//!
//! # Sign in and move the guest cart to the server
//! medicart login --token "$TOKEN"
//!
//! # Authenticated commands read the token from MEDICART_TOKEN
//! MEDICART_TOKEN=... medicart show
//! ```
//!
//! # Environment Variables
//!
//! - `MEDICART_API_BASE_URL` - backend base URL (required)
//! - `MEDICART_TOKEN` - session token; selects the server cart when set
//! - `MEDICART_STORAGE_DIR` - guest cart directory (default `.medicart`)
//! - `RUST_LOG` - log filter (default `medicart_cart=info,medicart_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

const DEFAULT_LOG_FILTER: &str = "medicart_cart=info,medicart_cli=info";

#[derive(Parser)]
#[command(name = "medicart")]
#[command(author, version, about = "Medicart cart client")]
struct Cli {
    /// Directory holding the guest cart
    #[arg(long, env = "MEDICART_STORAGE_DIR", default_value = ".medicart", global = true)]
    storage_dir: PathBuf,

    /// Session token; when present the server cart is used
    #[arg(long, env = "MEDICART_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart with totals
    Show,
    /// Add an item to the cart
    Add {
        /// Product id
        item_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Unit price, kept with a guest cart line
        #[arg(long)]
        price: Option<Decimal>,

        /// Display name, kept with a guest cart line
        #[arg(long)]
        name: Option<String>,
    },
    /// Set the quantity of an item already in the cart
    SetQuantity {
        /// Product id
        item_id: String,

        /// New quantity
        quantity: u32,
    },
    /// Remove an item from the cart
    Remove {
        /// Product id
        item_id: String,
    },
    /// Empty the cart
    Clear,
    /// Sign in with `--token` and migrate the guest cart to the server
    Login,
    /// Sign out and switch back to the guest cart
    Logout,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let token = cli.token.map(SecretString::from);

    match cli.command {
        Commands::Show => {
            let session = commands::Session::open(&cli.storage_dir, token).await?;
            render::cart(&session.manager);
        }
        Commands::Add {
            item_id,
            quantity,
            price,
            name,
        } => {
            let session = commands::Session::open(&cli.storage_dir, token).await?;
            commands::cart::add(&session, &item_id, quantity, price, name).await?;
            render::cart(&session.manager);
        }
        Commands::SetQuantity { item_id, quantity } => {
            let session = commands::Session::open(&cli.storage_dir, token).await?;
            commands::cart::set_quantity(&session, &item_id, quantity).await?;
            render::cart(&session.manager);
        }
        Commands::Remove { item_id } => {
            let session = commands::Session::open(&cli.storage_dir, token).await?;
            commands::cart::remove(&session, &item_id).await?;
            render::cart(&session.manager);
        }
        Commands::Clear => {
            let session = commands::Session::open(&cli.storage_dir, token).await?;
            session.manager.clear().await;
            render::cart(&session.manager);
        }
        Commands::Login => {
            let token = token.ok_or(commands::CommandError::MissingToken)?;
            let report = commands::session::login(&cli.storage_dir, token).await?;
            render::migration(&report);
        }
        Commands::Logout => {
            let session = commands::session::logout(&cli.storage_dir, token).await?;
            render::cart(&session.manager);
        }
    }
    Ok(())
}
