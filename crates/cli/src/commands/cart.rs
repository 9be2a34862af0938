//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! bbq cart list
//! bbq cart add 12 --variant Red --qty 2
//! bbq cart toggle 12 --variant Red
//! bbq cart qty 12 3 --variant Red
//! bbq cart variant 12 --from Red --to Blue
//! bbq cart remove 12 --variant Blue
//! bbq cart sync
//! ```

#![allow(clippy::print_stdout)]

use clap::Subcommand;

use bbqstyle_core::{CartKey, ProductId};
use bbqstyle_storefront::Storefront;
use bbqstyle_storefront::models::{Cart, CartToggle};
use bbqstyle_storefront::services::{CartService, SyncReport};

use super::CliError;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart with current prices
    List,
    /// Add units of a product, on top of any already in the cart
    Add {
        product_id: i64,
        #[arg(short, long)]
        variant: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Add a product if absent, remove it if present
    Toggle {
        product_id: i64,
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Remove a product line
    Remove {
        product_id: i64,
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Set the quantity of a line
    Qty {
        product_id: i64,
        quantity: u32,
        #[arg(short, long)]
        variant: Option<String>,
    },
    /// Move a line to another variant
    Variant {
        product_id: i64,
        /// Current variant, if the line has one
        #[arg(long)]
        from: Option<String>,
        /// New variant
        #[arg(long)]
        to: String,
    },
    /// Empty the cart
    Clear,
    /// Push the guest cart to the signed-in account
    Sync,
}

/// Run a cart command.
pub async fn run(state: &Storefront, action: CartAction) -> Result<(), CliError> {
    let service = CartService::new(state);

    match action {
        CartAction::List => print_cart(&service.hydrate().await?),
        CartAction::Add {
            product_id,
            variant,
            qty,
        } => {
            let item = service
                .item_for(ProductId::new(product_id), variant.as_deref(), qty)
                .await?;
            let title = item.title.clone();
            service.add(item).await?;
            println!("Added {title} to cart.");
        }
        CartAction::Toggle {
            product_id,
            variant,
        } => {
            let item = service
                .item_for(ProductId::new(product_id), variant.as_deref(), 1)
                .await?;
            let title = item.title.clone();
            match service.toggle(item).await? {
                CartToggle::Added => println!("Added {title} to cart."),
                CartToggle::Removed => println!("Removed {title} from cart."),
            }
        }
        CartAction::Remove {
            product_id,
            variant,
        } => {
            let key = CartKey::new(ProductId::new(product_id), variant.as_deref());
            service.remove(&key).await?;
            println!("Removed {key}.");
        }
        CartAction::Qty {
            product_id,
            quantity,
            variant,
        } => {
            let key = CartKey::new(ProductId::new(product_id), variant.as_deref());
            service.set_quantity(&key, quantity).await?;
            println!("Quantity of {key} set to {quantity}.");
        }
        CartAction::Variant {
            product_id,
            from,
            to,
        } => {
            let key = CartKey::new(ProductId::new(product_id), from.as_deref());
            let new_key = service.change_variant(&key, Some(&to)).await?;
            println!("Moved {key} to {new_key}.");
        }
        CartAction::Clear => {
            service.clear().await?;
            println!("Cart cleared.");
        }
        CartAction::Sync => {
            let report = service.sync_on_login().await?;
            print_sync("Cart", &report);
        }
    }
    Ok(())
}

pub fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for (n, item) in cart.iter().enumerate() {
        let variant = item
            .variant_detail
            .as_deref()
            .map(|v| format!(" ({v})"))
            .unwrap_or_default();
        println!(
            "{:>3}. {}{variant} x{}  {}   [{}]",
            n + 1,
            item.title,
            item.quantity,
            item.line_total(),
            item.key
        );
    }
    println!(
        "Subtotal: {} ({} items)",
        cart.subtotal(),
        cart.total_items()
    );
}

pub fn print_sync(what: &str, report: &SyncReport) {
    println!(
        "{what}: {} added, {} merged, {} already there, {} failed.",
        report.pushed, report.merged, report.unchanged, report.failed
    );
}
