//! Order tracking and the visitor beacon.

use tracing::{debug, instrument, warn};

use crate::api::types::TrackingInfo;
use crate::error::{AppError, Result};
use crate::state::Storefront;
use crate::store::keys;

pub struct TrackingService<'a> {
    state: &'a Storefront,
}

impl<'a> TrackingService<'a> {
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    /// Look up an order by order id or carrier tracking id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for blank input, or the backend's
    /// rejection when the order has no tracking yet.
    #[instrument(skip(self))]
    pub async fn track(&self, input: &str) -> Result<TrackingInfo> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::BadRequest(
                "Please enter an order ID or tracking ID".to_string(),
            ));
        }
        Ok(self.state.api().track_order(input).await?)
    }

    /// Send the visitor beacon once per install.
    ///
    /// Returns whether a beacon was sent now. A failed beacon is not
    /// remembered, so the next run tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be used.
    #[instrument(skip(self))]
    pub async fn track_visit_once(&self) -> Result<bool> {
        let storage = self.state.storage();
        if storage.get_raw(keys::VISITOR_TRACKED)?.is_some() {
            return Ok(false);
        }
        match self.state.api().track_visitor().await {
            Ok(()) => {
                storage.set_raw(keys::VISITOR_TRACKED, "true")?;
                debug!("Visitor beacon sent");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Visitor beacon failed");
                Ok(false)
            }
        }
    }
}
