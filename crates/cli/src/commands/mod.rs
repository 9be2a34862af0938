//! CLI command implementations.

pub mod account;
pub mod address;
pub mod cart;
pub mod checkout;
pub mod lookup;
pub mod prompt;
pub mod wishlist;

use thiserror::Error;

use bbqstyle_storefront::AppError;
use bbqstyle_storefront::state::StateError;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// A storefront operation failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// Client state could not be opened.
    #[error("Could not open storefront state: {0}")]
    State(#[from] StateError),

    /// Reading from the terminal failed.
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Standard input closed before an answer was given.
    #[error("Input closed")]
    InputClosed,

    /// The checkout was left before the order was placed.
    #[error("Checkout abandoned")]
    Abandoned,
}

impl CliError {
    /// Text for the terminal.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::App(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
