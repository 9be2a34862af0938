//! Product, order tracking and pincode lookup.

#![allow(clippy::print_stdout)]

use bbqstyle_core::{Price, ProductId};
use bbqstyle_storefront::services::TrackingService;
use bbqstyle_storefront::{AppError, Storefront};

use super::CliError;

pub async fn product(state: &Storefront, id: i64) -> Result<(), CliError> {
    let id = ProductId::new(id);
    let (product, reviews) = tokio::try_join!(state.api().product(id), state.api().reviews(id))
        .map_err(AppError::from)?;

    println!("{}", product.title);
    match product.mrp.filter(|mrp| *mrp > product.price) {
        Some(mrp) => println!("Price:     {}  (MRP {})", Price::inr(product.price), Price::inr(mrp)),
        None => println!("Price:     {}", Price::inr(product.price)),
    }
    if product.has_variants() {
        for option in product.variant_options() {
            match product.stock_for(Some(&option)) {
                Some(0) => println!("  {option}: sold out"),
                Some(stock) => println!("  {option}: {stock} in stock"),
                None => println!("  {option}"),
            }
        }
    }

    if reviews.is_empty() {
        println!("No reviews yet.");
        return Ok(());
    }
    println!("Reviews:");
    for review in &reviews {
        let stars = review.star_rating.map_or_else(String::new, |n| "*".repeat(n.min(5) as usize));
        let name = review.customer_name.as_deref().unwrap_or("Customer");
        println!("  {stars:<5} {name}: {}", review.review_text.as_deref().unwrap_or(""));
    }
    Ok(())
}

pub async fn track(state: &Storefront, input: &str) -> Result<(), CliError> {
    let info = TrackingService::new(state).track(input).await?;

    if let Some(order_id) = &info.order_id {
        println!("Order:     {order_id}");
    }
    let status = info.status.map_or("Unknown Status", |s| s.label());
    println!("Status:    {status}");
    if let Some(carrier) = &info.carrier {
        println!("Carrier:   {carrier}");
    }
    if let Some(tracking_id) = &info.tracking_id {
        println!("Tracking:  {tracking_id}");
    }
    if let Some(location) = &info.location {
        println!("Location:  {location}");
    }
    if let Some(timestamp) = &info.timestamp {
        println!("Updated:   {timestamp}");
    }
    if let Some(url) = info.tracking_url() {
        println!("Follow at: {url}");
    }
    Ok(())
}

pub async fn pincode(state: &Storefront, code: &str) -> Result<(), CliError> {
    let location = state
        .pincode()
        .lookup(code)
        .await
        .map_err(AppError::from)?;
    println!("{code}: {}, {}", location.district, location.state);
    Ok(())
}
