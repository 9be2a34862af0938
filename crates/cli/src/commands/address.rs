//! Address book commands.
//!
//! # Usage
//!
//! ```bash
//! bbq address list
//! bbq address add --name "Asha Rao" --mobile 9876543210 \
//!     --line1 "12 MG Road" --city Bengaluru --pincode 560001 --default
//! ```
//!
//! District and state are filled in from the pincode when not given.

#![allow(clippy::print_stdout)]

use clap::{Args, Subcommand};
use tracing::warn;

use bbqstyle_core::MobileNumber;
use bbqstyle_storefront::models::{Address, NewAddress};
use bbqstyle_storefront::services::AddressBook;
use bbqstyle_storefront::{AppError, Storefront};

use super::CliError;

#[derive(Subcommand)]
pub enum AddressAction {
    /// Show saved addresses
    List,
    /// Save a new address
    Add(AddressForm),
}

#[derive(Args)]
pub struct AddressForm {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub mobile: String,
    #[arg(long)]
    pub line1: String,
    #[arg(long)]
    pub line2: Option<String>,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub pincode: String,
    /// Make this the default address
    #[arg(long)]
    pub default: bool,
}

pub async fn run(state: &Storefront, action: AddressAction) -> Result<(), CliError> {
    let book = AddressBook::new(state);
    match action {
        AddressAction::List => {
            let addresses = book.list().await?;
            if addresses.is_empty() {
                println!("No saved addresses.");
            }
            for (n, address) in addresses.iter().enumerate() {
                print_address(n + 1, address);
            }
        }
        AddressAction::Add(form) => {
            let new = build_address(state, form).await?;
            let saved = book.save(new).await?;
            println!("Saved address {}.", saved.id);
        }
    }
    Ok(())
}

pub fn print_address(n: usize, address: &Address) {
    let default = if address.is_default { "  (default)" } else { "" };
    println!("{n:>3}. {}{default}", address.label());
}

/// Turn command-line fields into an address, looking up missing district
/// and state from the pincode.
pub async fn build_address(state: &Storefront, form: AddressForm) -> Result<NewAddress, CliError> {
    let mobile_no = MobileNumber::parse(&form.mobile).map_err(AppError::from)?;

    let (mut district, mut region) = (form.district, form.state);
    if district.is_none() || region.is_none() {
        match state.pincode().lookup(&form.pincode).await {
            Ok(location) => {
                district.get_or_insert(location.district);
                region.get_or_insert(location.state);
            }
            Err(e) => warn!(pincode = %form.pincode, error = %e, "Pincode lookup failed"),
        }
    }

    let address = NewAddress {
        full_name: form.name,
        mobile_no,
        address_line1: form.line1,
        address_line2: form.line2.filter(|l| !l.trim().is_empty()),
        city: form.city,
        district,
        state: region.unwrap_or_default(),
        pincode: form.pincode,
        is_default: form.default,
    };
    address.validate().map_err(AppError::from)?;
    Ok(address)
}
