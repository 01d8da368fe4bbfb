//! Cart subcommands.

use anyhow::Result;
use clap::{Args, Subcommand};
use shopfront_api::ApiClient;
use shopfront_cart::{CartFile, CartStore};
use shopfront_core::cart::ProductSnapshot;
use shopfront_core::config::ShopfrontConfig;
use shopfront_core::notice::create_notice_channel;

use crate::output;

#[derive(Subcommand)]
pub enum CartCommands {
    /// Show the current cart
    List,

    /// Add a product to the cart
    Add(AddArgs),

    /// Change a line's quantity (0 removes it)
    Update {
        /// Cart line id
        line_id: String,
        /// New quantity
        quantity: u32,
    },

    /// Remove a line from the cart
    Remove {
        /// Cart line id
        line_id: String,
    },

    /// Empty the cart
    Clear,

    /// Merge the local cart into the signed-in account
    Merge,
}

#[derive(Args)]
pub struct AddArgs {
    /// Product id
    pub product_id: String,

    /// Quantity to add
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u32,

    /// Product name shown on the line
    #[arg(long, default_value = "")]
    pub name: String,

    /// Unit price in minor units (cents)
    #[arg(long, default_value_t = 0)]
    pub price: i64,

    /// Discounted price in minor units, when on sale
    #[arg(long)]
    pub discounted: Option<i64>,

    /// Product image URL
    #[arg(long)]
    pub image: Option<String>,
}

pub async fn execute(cmd: CartCommands, config: &ShopfrontConfig) -> Result<()> {
    let notices = create_notice_channel();
    let mut notice_rx = notices.subscribe();

    let api = ApiClient::new(&config.api_url, config.api_token.clone());
    let store = CartStore::start(api, CartFile::new(config.cart_file.clone()), notices).await;

    let result = match cmd {
        CartCommands::List => Ok(()),
        CartCommands::Add(args) => {
            store
                .add_to_cart(
                    &args.product_id,
                    args.quantity,
                    ProductSnapshot {
                        name: args.name,
                        unit_price: args.price,
                        discounted_price: args.discounted,
                        image: args.image,
                        stock_available: None,
                    },
                )
                .await
        }
        CartCommands::Update { line_id, quantity } => store.update_quantity(&line_id, quantity).await,
        CartCommands::Remove { line_id } => store.remove_from_cart(&line_id).await,
        CartCommands::Clear => store.clear_cart().await,
        CartCommands::Merge => store.merge_into_account().await,
    };

    while let Ok(notice) = notice_rx.try_recv() {
        output::print_notice(&notice);
    }
    output::print_cart(&store.state());

    result?;
    Ok(())
}
