//! Delivery addresses.
//!
//! One canonical [`Address`] is used everywhere. The backend's `snake_case`
//! rows ([`ServerAddress`]) and the guest's `camelCase` records
//! ([`LocalAddress`]) are converted into it at the edges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bbqstyle_core::{AddressId, AddressRef, LocalAddressId, MobileError, MobileNumber};

use super::de::{flexible_bool, flexible_string};

/// Errors raised when validating an address form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// Pincodes are six digits.
    #[error("pincode must be 6 digits")]
    InvalidPincode,
    /// The mobile number is malformed.
    #[error("invalid mobile number: {0}")]
    InvalidMobile(#[from] MobileError),
}

/// Address in the one schema the rest of the crate uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub id: AddressRef,
    pub full_name: String,
    pub mobile_no: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub district: Option<String>,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
}

impl Address {
    /// One-line label (`Name, Line 1, City - 110001`).
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}, {}, {} - {}",
            self.full_name, self.address_line1, self.city, self.pincode
        )
    }

    /// The address's mobile number, if it is well-formed.
    #[must_use]
    pub fn mobile(&self) -> Option<MobileNumber> {
        MobileNumber::parse(&self.mobile_no).ok()
    }
}

/// Address row returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAddress {
    #[serde(alias = "addressId")]
    pub address_id: AddressId,
    #[serde(default, alias = "fullName")]
    pub full_name: String,
    #[serde(default, alias = "mobileNo", deserialize_with = "flexible_string")]
    pub mobile_no: Option<String>,
    #[serde(default, alias = "addressLine1")]
    pub address_line1: String,
    #[serde(default, alias = "addressLine2")]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "flexible_string")]
    pub pincode: Option<String>,
    #[serde(default, alias = "isDefault", deserialize_with = "flexible_bool")]
    pub is_default: bool,
}

impl From<ServerAddress> for Address {
    fn from(row: ServerAddress) -> Self {
        Self {
            id: AddressRef::Server(row.address_id),
            full_name: row.full_name,
            mobile_no: row.mobile_no.unwrap_or_default(),
            address_line1: row.address_line1,
            address_line2: row.address_line2.filter(|s| !s.is_empty()),
            city: row.city,
            district: row.district.filter(|s| !s.is_empty()),
            state: row.state,
            pincode: row.pincode.unwrap_or_default(),
            is_default: row.is_default,
        }
    }
}

/// Address form payload; also the body of `POST /api/addresses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub full_name: String,
    pub mobile_no: MobileNumber,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub district: Option<String>,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
}

impl NewAddress {
    /// Check required fields the backend would reject.
    ///
    /// # Errors
    ///
    /// Returns the first missing field, or [`AddressError::InvalidPincode`].
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("Full name", &self.full_name),
            ("Address line 1", &self.address_line1),
            ("City", &self.city),
            ("State", &self.state),
            ("Pincode", &self.pincode),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AddressError::MissingField(field));
        }
        if !is_pincode(&self.pincode) {
            return Err(AddressError::InvalidPincode);
        }
        Ok(())
    }

    /// Canonical form under the given id.
    #[must_use]
    pub fn to_address(&self, id: AddressRef) -> Address {
        Address {
            id,
            full_name: self.full_name.clone(),
            mobile_no: self.mobile_no.to_string(),
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            city: self.city.clone(),
            district: self.district.clone(),
            state: self.state.clone(),
            pincode: self.pincode.clone(),
            is_default: self.is_default,
        }
    }
}

/// Guest address kept in the local store until the account exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAddress {
    pub address_id: LocalAddressId,
    #[serde(flatten)]
    pub details: NewAddress,
    #[serde(default = "default_true")]
    pub is_guest: bool,
}

const fn default_true() -> bool {
    true
}

impl LocalAddress {
    #[must_use]
    pub fn new(details: NewAddress) -> Self {
        Self {
            address_id: LocalAddressId::generate(),
            details,
            is_guest: true,
        }
    }
}

impl From<&LocalAddress> for Address {
    fn from(local: &LocalAddress) -> Self {
        local.details.to_address(AddressRef::Local(local.address_id))
    }
}

/// Whether `value` is a six-digit Indian pincode.
#[must_use]
pub fn is_pincode(value: &str) -> bool {
    let value = value.trim();
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Name split for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountName {
    pub first_name: String,
    pub last_name: String,
}

impl AccountName {
    /// First word is the first name, the rest the last name.
    ///
    /// Blank parts fall back to `User` and `Name`.
    #[must_use]
    pub fn from_full_name(full_name: &str) -> Self {
        let mut words = full_name.split_whitespace();
        let first_name = words.next().unwrap_or("User").to_owned();
        let rest = words.collect::<Vec<_>>().join(" ");
        let last_name = if rest.is_empty() {
            "Name".to_owned()
        } else {
            rest
        };
        Self {
            first_name,
            last_name,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn form(name: &str, mobile: &str) -> NewAddress {
        NewAddress {
            full_name: name.to_owned(),
            mobile_no: MobileNumber::parse(mobile).unwrap(),
            address_line1: "12 MG Road".to_owned(),
            address_line2: None,
            city: "Jaipur".to_owned(),
            district: Some("Jaipur".to_owned()),
            state: "Rajasthan".to_owned(),
            pincode: "302001".to_owned(),
            is_default: false,
        }
    }

    #[test]
    fn test_server_row_adapts() {
        let row: ServerAddress = serde_json::from_value(serde_json::json!({
            "address_id": 9,
            "full_name": "Asha Verma",
            "mobile_no": "9876543210",
            "address_line1": "12 MG Road",
            "address_line2": "",
            "city": "Jaipur",
            "district": "Jaipur",
            "state": "Rajasthan",
            "pincode": 302_001,
            "is_default": 1
        }))
        .unwrap();
        let address = Address::from(row);
        assert_eq!(address.id, AddressRef::Server(AddressId::new(9)));
        assert_eq!(address.pincode, "302001");
        assert!(address.is_default);
        assert_eq!(address.address_line2, None);
        assert_eq!(address.label(), "Asha Verma, 12 MG Road, Jaipur - 302001");
    }

    #[test]
    fn test_local_record_is_camel_case() {
        let local = LocalAddress::new(form("Asha Verma", "9876543210"));
        let value = serde_json::to_value(&local).unwrap();
        assert_eq!(value["fullName"], "Asha Verma");
        assert_eq!(value["mobileNo"], "9876543210");
        assert_eq!(value["isGuest"], true);

        let back: LocalAddress = serde_json::from_value(value).unwrap();
        assert_eq!(back, local);
    }

    #[test]
    fn test_validate() {
        assert!(form("Asha", "9876543210").validate().is_ok());

        let mut missing = form("Asha", "9876543210");
        missing.city = " ".to_owned();
        assert_eq!(missing.validate(), Err(AddressError::MissingField("City")));

        let mut bad_pin = form("Asha", "9876543210");
        bad_pin.pincode = "30200".to_owned();
        assert_eq!(bad_pin.validate(), Err(AddressError::InvalidPincode));
    }

    #[test]
    fn test_account_name_split() {
        let name = AccountName::from_full_name("  Asha  Rani Verma ");
        assert_eq!(name.first_name, "Asha");
        assert_eq!(name.last_name, "Rani Verma");

        let name = AccountName::from_full_name("Asha");
        assert_eq!(name.last_name, "Name");

        let name = AccountName::from_full_name("");
        assert_eq!(name.first_name, "User");
        assert_eq!(name.last_name, "Name");
    }
}
