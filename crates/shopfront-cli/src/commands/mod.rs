//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shopfront_core::config::ShopfrontConfig;

pub mod admin;
pub mod cart;

/// Shopfront - Storefront Client Console
#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Shopping cart operations
    #[command(subcommand)]
    Cart(cart::CartCommands),

    /// Admin console (badges and live chat)
    #[command(subcommand)]
    Admin(admin::AdminCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = ShopfrontConfig::from_env();

        match self.command {
            Commands::Cart(cmd) => cart::execute(cmd, &config).await,
            Commands::Admin(cmd) => admin::execute(cmd, &config).await,
        }
    }
}
