//! Wishlist commands.

#![allow(clippy::print_stdout)]

use clap::Subcommand;

use bbqstyle_core::ProductId;
use bbqstyle_storefront::Storefront;
use bbqstyle_storefront::services::WishlistService;

use super::CliError;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show wishlisted products
    List,
    /// Add a product if absent, remove it if present
    Toggle { product_id: i64 },
    /// Remove everything
    Clear,
}

pub async fn run(state: &Storefront, action: WishlistAction) -> Result<(), CliError> {
    let service = WishlistService::new(state);

    match action {
        WishlistAction::List => {
            let items = service.list().await?;
            if items.is_empty() {
                println!("Your wishlist is empty.");
            }
            for item in items {
                let price = item.price.map(|p| format!("  ₹{p}")).unwrap_or_default();
                println!("{:>6}  {}{price}", item.id, item.name);
            }
        }
        WishlistAction::Toggle { product_id } => {
            let id = ProductId::new(product_id);
            if service.toggle(id).await? {
                println!("Product {id} added to wishlist.");
            } else {
                println!("Product {id} removed from wishlist.");
            }
        }
        WishlistAction::Clear => {
            service.clear().await?;
            println!("Wishlist cleared.");
        }
    }
    Ok(())
}
