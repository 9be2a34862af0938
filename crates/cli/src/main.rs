//! BBQ Style CLI - storefront client for the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put a product in the cart and check out as a guest
//! bbq cart add 12 --variant Red --qty 2
//! bbq checkout
//!
//! # Or buy a single product straight away
//! bbq checkout --product 12 --variant Red
//!
//! # Sign in and move the guest cart and wishlist to the account
//! bbq login --mobile 9876543210
//!
//! # Where is my order?
//! bbq track 1042
//! ```
//!
//! # Commands
//!
//! - `cart` - List and edit the cart, or push a guest cart to the account
//! - `wishlist` - List, toggle and clear wishlisted products
//! - `address` - List and add delivery addresses
//! - `login` / `logout` / `whoami` - Session management
//! - `product` - Product details, stock per variant and reviews
//! - `track` - Order tracking
//! - `pincode` - District and state for a pincode
//! - `checkout` - Interactive checkout with OTP verification for guests
//!
//! Configuration comes from `BBQ_*` environment variables (see
//! `bbqstyle_storefront::config`). Logs go to stderr; `RUST_LOG` overrides
//! the default filter.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bbqstyle_storefront::config::{LogFormat, StorefrontConfig};
use bbqstyle_storefront::services::{AuthSession, TrackingService};
use bbqstyle_storefront::{AppError, Storefront};

mod commands;

use commands::CliError;

const DEFAULT_LOG_FILTER: &str = "bbqstyle_storefront=info,bbqstyle_cli=info";

#[derive(Parser)]
#[command(name = "bbq")]
#[command(author, version, about = "BBQ Style storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and edit the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// View and edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Manage delivery addresses
    Address {
        #[command(subcommand)]
        action: commands::address::AddressAction,
    },
    /// Sign in with email and password, or with a mobile OTP
    Login(commands::account::LoginArgs),
    /// Sign out and forget the stored token
    Logout,
    /// Show who is signed in
    Whoami,
    /// Show a product with its variants and reviews
    Product {
        /// Product ID
        id: i64,
    },
    /// Track an order by order ID or tracking ID
    Track {
        /// Order ID or carrier tracking ID
        input: String,
    },
    /// Look up district and state for a pincode
    Pincode {
        /// Six-digit pincode
        code: String,
    },
    /// Check out the cart interactively
    Checkout {
        /// Buy this product alone, replacing the cart
        #[arg(long)]
        product: Option<i64>,
        #[arg(short, long, requires = "product")]
        variant: Option<String>,
        #[arg(short, long, default_value_t = 1, requires = "product")]
        qty: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_startup_error(&e);
            std::process::exit(2);
        }
    };
    init_tracing(config.log_format);

    if let Err(e) = run(cli, config).await {
        tracing::debug!(error = %e, "Command failed");
        if let CliError::App(app) = &e {
            app.report();
        }
        report_failure(&e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[allow(clippy::print_stderr)]
fn report_startup_error(err: &dyn std::error::Error) {
    eprintln!("Configuration error: {err}");
}

#[allow(clippy::print_stderr)]
fn report_failure(err: &CliError) {
    eprintln!("{}", err.user_message());
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let state = Storefront::open(config)?;
    AuthSession::new(&state).check().map_err(AppError::from)?;
    if let Err(e) = TrackingService::new(&state).track_visit_once().await {
        tracing::warn!(error = %e, "Visitor beacon skipped");
    }

    match cli.command {
        Commands::Cart { action } => commands::cart::run(&state, action).await?,
        Commands::Wishlist { action } => commands::wishlist::run(&state, action).await?,
        Commands::Address { action } => commands::address::run(&state, action).await?,
        Commands::Login(args) => commands::account::login(&state, args).await?,
        Commands::Logout => commands::account::logout(&state)?,
        Commands::Whoami => commands::account::whoami(&state).await?,
        Commands::Product { id } => commands::lookup::product(&state, id).await?,
        Commands::Track { input } => commands::lookup::track(&state, &input).await?,
        Commands::Pincode { code } => commands::lookup::pincode(&state, &code).await?,
        Commands::Checkout {
            product,
            variant,
            qty,
        } => {
            let buy_now = product.map(|product_id| commands::checkout::BuyNow {
                product_id,
                variant,
                qty,
            });
            commands::checkout::run(state, buy_now).await?;
        }
    }
    Ok(())
}
