//! Address book.
//!
//! Signed-in customers use the backend's addresses. Guests save addresses
//! locally under fresh [`LocalAddressId`]s; once the guest's account exists
//! [`AddressBook::migrate_local`] posts them to the backend and reports the
//! id each one received.

use std::collections::HashMap;

use tracing::{info, instrument, warn};

use bbqstyle_core::{AddressId, AddressRef, LocalAddressId, MobileNumber};

use crate::api::ApiError;
use crate::error::Result;
use crate::models::{Address, LocalAddress, NewAddress};
use crate::state::Storefront;
use crate::store::keys;

/// Result of moving guest addresses to the account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressMigration {
    /// Server id assigned to each migrated local address.
    pub mapping: HashMap<LocalAddressId, AddressId>,
    /// Addresses that could not be posted and stay local.
    pub failed: usize,
}

impl AddressMigration {
    /// Translate a selection made before migration.
    ///
    /// Server references pass through; local references map to their new
    /// server id, or `None` if that address was not migrated.
    #[must_use]
    pub fn remap(&self, selected: AddressRef) -> Option<AddressRef> {
        match selected {
            AddressRef::Server(_) => Some(selected),
            AddressRef::Local(local) => self.mapping.get(&local).copied().map(AddressRef::Server),
        }
    }
}

pub struct AddressBook<'a> {
    state: &'a Storefront,
}

impl<'a> AddressBook<'a> {
    #[must_use]
    pub const fn new(state: &'a Storefront) -> Self {
        Self { state }
    }

    /// Guest addresses in the local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn local(&self) -> Result<Vec<LocalAddress>> {
        Ok(self.state.storage().load_or_default(keys::ADDRESSES)?)
    }

    fn save_local(&self, addresses: &[LocalAddress]) -> Result<()> {
        if addresses.is_empty() {
            self.state.storage().remove(keys::ADDRESSES)?;
        } else {
            self.state.storage().save_json(keys::ADDRESSES, addresses)?;
        }
        Ok(())
    }

    /// Addresses the customer can pick from.
    ///
    /// Signed-in customers get the backend's list; if that fails the local
    /// addresses are shown instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be read.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>> {
        if self.state.is_authenticated() {
            match self.state.api().addresses().await {
                Ok(addresses) => return Ok(addresses),
                Err(e) => warn!(error = %e, "Could not load saved addresses, showing local ones"),
            }
        }
        Ok(self.local()?.iter().map(Address::from).collect())
    }

    /// Save a new address. Returns it under its new id.
    ///
    /// # Errors
    ///
    /// Returns an address error for incomplete forms, or an error if the
    /// backend or the store rejects the address.
    #[instrument(skip(self, form))]
    pub async fn save(&self, form: NewAddress) -> Result<Address> {
        form.validate()?;

        if self.state.is_authenticated() {
            let id = self.state.api().create_address(&form).await?;
            info!(address_id = %id, "Address saved to account");
            return Ok(form.to_address(AddressRef::Server(id)));
        }

        let mut addresses = self.local()?;
        if form.is_default {
            for existing in &mut addresses {
                existing.details.is_default = false;
            }
        }
        let record = LocalAddress::new(form);
        let address = Address::from(&record);
        addresses.push(record);
        self.save_local(&addresses)?;
        info!(address_id = %address.id, "Address saved locally");
        Ok(address)
    }

    /// Mobile number of an address, if the address exists and its number is
    /// well-formed.
    ///
    /// # Errors
    ///
    /// Returns an error if the addresses cannot be listed.
    pub async fn mobile_for(&self, id: AddressRef) -> Result<Option<MobileNumber>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .and_then(|a| a.mobile()))
    }

    /// Whether the backend still has this address.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend's list cannot be fetched.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn exists_on_server(&self, id: AddressId) -> std::result::Result<bool, ApiError> {
        let addresses = self.state.api().addresses().await?;
        Ok(addresses.iter().any(|a| a.id == AddressRef::Server(id)))
    }

    /// Post every guest address to the signed-in account.
    ///
    /// Migrated addresses are removed from the local store; failures stay.
    ///
    /// # Errors
    ///
    /// Returns an error if no token is loaded or the store cannot be used.
    #[instrument(skip(self))]
    pub async fn migrate_local(&self) -> Result<AddressMigration> {
        if !self.state.is_authenticated() {
            return Err(ApiError::NotAuthenticated.into());
        }
        let mut migration = AddressMigration::default();
        let mut remaining = Vec::new();

        for record in self.local()? {
            match self.state.api().create_address(&record.details).await {
                Ok(id) => {
                    migration.mapping.insert(record.address_id, id);
                }
                Err(e) => {
                    warn!(address_id = %record.address_id, error = %e, "Could not migrate address");
                    migration.failed += 1;
                    remaining.push(record);
                }
            }
        }

        self.save_local(&remaining)?;
        info!(
            migrated = migration.mapping.len(),
            failed = migration.failed,
            "Guest addresses migrated"
        );
        Ok(migration)
    }
}
