//! Interactive checkout.
//!
//! Walks the cart through address selection, OTP verification for guests,
//! payment choice and confirmation. Mistakes along the way (a wrong OTP, a
//! rejected promo code) are shown and the current step is asked again.
//! With `--product`, the cart is first replaced by that one product.
//!
//! Asking for a resend while the cooldown runs shows the countdown live and
//! sends the new code once it reaches zero.

#![allow(clippy::print_stdout)]

use std::io::Write;

use bbqstyle_core::{PaymentMode, ProductId};
use bbqstyle_storefront::checkout::{
    AccountStatus, CheckoutFlow, CheckoutStep, PlacementOutcome, VerificationOutcome,
};
use bbqstyle_storefront::models::OrderSummary;
use bbqstyle_storefront::services::CartService;
use bbqstyle_storefront::{AppError, Storefront};

use super::CliError;
use super::address::{AddressForm, build_address, print_address};
use super::cart::{print_cart, print_sync};
use super::prompt::Prompt;

/// A single product to check out on its own.
pub struct BuyNow {
    pub product_id: i64,
    pub variant: Option<String>,
    pub qty: u32,
}

pub async fn run(state: Storefront, buy_now: Option<BuyNow>) -> Result<(), CliError> {
    if let Some(buy) = buy_now {
        let carts = CartService::new(&state);
        let item = carts
            .item_for(ProductId::new(buy.product_id), buy.variant.as_deref(), buy.qty)
            .await?;
        carts.buy_now(item).await?;
    }
    let flow = CheckoutFlow::start(state).await?;
    let mut prompt = Prompt::new();

    print_cart(&flow.cart());
    loop {
        match flow.step() {
            CheckoutStep::AddressSelection => address_step(&flow, &mut prompt).await?,
            CheckoutStep::GuestVerification => verification_step(&flow, &mut prompt).await?,
            CheckoutStep::PaymentMethod => payment_step(&flow, &mut prompt).await?,
            CheckoutStep::Confirmation => {
                if confirmation_step(&flow, &mut prompt).await? {
                    return Ok(());
                }
            }
            CheckoutStep::Placed => return Ok(()),
        }
    }
}

/// Show a failed step to the customer and carry on.
fn show<T>(result: Result<T, AppError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            e.report();
            println!("{}", e.user_message());
            None
        }
    }
}

// =============================================================================
// Steps
// =============================================================================

async fn address_step(flow: &CheckoutFlow, prompt: &mut Prompt) -> Result<(), CliError> {
    let addresses = flow.addresses();
    let selected = flow.selected_address();

    println!();
    println!("Delivery address:");
    for (n, address) in addresses.iter().enumerate() {
        let marker = if Some(address.id) == selected { "*" } else { " " };
        print!("{marker}");
        print_address(n + 1, address);
    }
    let answer = prompt
        .ask("Pick an address number, 'n' for a new one, Enter to continue, 'q' to quit:")
        .await?;

    match answer.as_str() {
        "q" => return Err(CliError::Abandoned),
        "n" => {
            flow.clear_selection();
            let form = address_form(prompt).await?;
            let address = match build_address(flow.state(), form).await {
                Ok(address) => address,
                Err(CliError::App(e)) => {
                    show::<()>(Err(e));
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            if show(flow.save_new_address(address).await).is_none() {
                return Ok(());
            }
        }
        "" => {}
        other => {
            let Some(address) = other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| addresses.get(i))
            else {
                println!("No address with that number.");
                return Ok(());
            };
            if show(flow.select_address(address.id)).is_none() {
                return Ok(());
            }
        }
    }

    if !flow.can_proceed() {
        println!("Please select an address first");
        return Ok(());
    }
    if let Some(Some(verify)) = show(flow.proceed().await) {
        println!("{}", verify.message());
    }
    Ok(())
}

async fn address_form(prompt: &mut Prompt) -> Result<AddressForm, CliError> {
    Ok(AddressForm {
        name: prompt.ask_required("Full name:").await?,
        mobile: prompt.ask_required("Mobile number:").await?,
        line1: prompt.ask_required("Address line 1:").await?,
        line2: prompt.ask_optional("Address line 2 (optional):").await?,
        city: prompt.ask_required("City:").await?,
        pincode: prompt.ask_required("Pincode:").await?,
        district: None,
        state: None,
        default: false,
    })
}

async fn verification_step(flow: &CheckoutFlow, prompt: &mut Prompt) -> Result<(), CliError> {
    let answer = prompt
        .ask(&format!(
            "OTP ('r': {}, 'c' to change address):",
            flow.resend_label()
        ))
        .await?;

    match answer.as_str() {
        "c" => {
            show(flow.cancel_verification());
        }
        "r" => {
            let cooldown = flow.resend_cooldown();
            if !cooldown.is_ready() {
                cooldown
                    .tick_until_ready(|_| {
                        print!("\r{}   ", cooldown.label());
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                println!();
            }
            if let Some(verify) = show(flow.resend_otp().await) {
                println!("{}", verify.message());
            }
        }
        code => {
            if let Some(outcome) = show(flow.submit_otp(code).await) {
                print_verified(&outcome);
            }
        }
    }
    Ok(())
}

fn print_verified(outcome: &VerificationOutcome) {
    match outcome.account {
        AccountStatus::LoggedInExisting => println!("Number verified. Signed in to your account."),
        AccountStatus::Created => println!("Number verified. Your account has been created."),
    }
    if !outcome.cart.is_complete() {
        print_sync("Cart", &outcome.cart);
    }
    if !outcome.wishlist.is_complete() {
        print_sync("Wishlist", &outcome.wishlist);
    }
    if outcome.next_step == CheckoutStep::AddressSelection {
        println!("Your address could not be saved to your account. Please select it again.");
    }
}

async fn payment_step(flow: &CheckoutFlow, prompt: &mut Prompt) -> Result<(), CliError> {
    println!();
    print_summary(&flow.summary(), flow.applied_offer_code().as_deref());
    let current = flow.payment_mode();
    println!("Payment: 1) Cash on delivery  2) Pay online   [now: {current}]");
    let answer = prompt
        .ask("Choose 1 or 2, 'p' for a promo code, 'b' to go back, Enter to review:")
        .await?;

    match answer.as_str() {
        "1" => {
            show(flow.choose_payment(PaymentMode::Cod));
        }
        "2" => {
            show(flow.choose_payment(PaymentMode::Online));
        }
        "p" => {
            let code = prompt.ask("Promo code:").await?;
            if let Some(Some(applied)) = show(flow.apply_promo(&code).await) {
                println!(
                    "{}",
                    applied
                        .message
                        .unwrap_or_else(|| "Promo code applied".to_owned())
                );
            }
        }
        "b" => {
            show(flow.back_to_address());
        }
        "" => {
            show(flow.request_confirmation());
        }
        _ => println!("Unknown choice."),
    }
    Ok(())
}

/// Returns `true` once the order is placed or handed to the payment page.
async fn confirmation_step(flow: &CheckoutFlow, prompt: &mut Prompt) -> Result<bool, CliError> {
    print_summary(&flow.summary(), flow.applied_offer_code().as_deref());
    if !prompt
        .confirm(&format!("Place this order ({})?", flow.payment_mode()))
        .await?
    {
        show(flow.cancel_confirmation());
        return Ok(false);
    }

    let Some(outcome) = show(flow.place_order().await) else {
        if flow.step() == CheckoutStep::Confirmation {
            show(flow.cancel_confirmation());
        }
        return Ok(false);
    };
    println!("{}", outcome.message());
    match outcome {
        PlacementOutcome::Placed { order_id } => {
            println!("Order ID: {order_id}");
            Ok(true)
        }
        PlacementOutcome::PaymentRedirect {
            session,
            environment,
        } => {
            println!(
                "Complete payment with session {} ({} mode).",
                session.payment_session_id,
                environment.as_str()
            );
            if let Some(order_id) = session.order_id {
                println!("Order ID: {order_id}");
            }
            Ok(true)
        }
        PlacementOutcome::AddressReselectRequired => Ok(false),
    }
}

fn print_summary(summary: &OrderSummary, offer_code: Option<&str>) {
    println!("Subtotal: ₹{}", summary.subtotal);
    if !summary.discount.is_zero() {
        let code = offer_code.map(|c| format!(" ({c})")).unwrap_or_default();
        println!("Discount{code}: -₹{}", summary.discount);
    }
    println!("Total:    ₹{}", summary.total);
}
