//! Status enums for checkout and order tracking.

use serde::{Deserialize, Serialize};

/// How an order is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMode {
    /// Cash on delivery.
    #[default]
    #[serde(rename = "COD")]
    Cod,
    /// Hosted payment page.
    #[serde(rename = "Online")]
    Online,
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "COD"),
            Self::Online => write!(f, "Online"),
        }
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cod" => Ok(Self::Cod),
            "online" => Ok(Self::Online),
            _ => Err(format!("invalid payment mode: {s}")),
        }
    }
}

/// Shipment status reported by the tracking endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Processing,
    Shipped,
    InTransit,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
    Delayed,
    /// Anything the carrier reports that we don't model.
    #[serde(other)]
    Unknown,
}

impl ShipmentStatus {
    /// Statuses shown on the delivery timeline, in order.
    pub const TIMELINE: [Self; 5] = [
        Self::Processing,
        Self::Shipped,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Processing => "Order Processing",
            Self::Shipped => "Shipped",
            Self::InTransit => "In Transit",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Returned => "Returned",
            Self::Delayed => "Delayed",
            Self::Unknown => "Unknown Status",
        }
    }

    /// Position on the delivery timeline, or `None` for off-timeline
    /// statuses (cancelled, returned, delayed).
    #[must_use]
    pub fn timeline_position(&self) -> Option<usize> {
        Self::TIMELINE.iter().position(|s| s == self)
    }

    /// Whether the shipment has reached (or passed) `stage` on the timeline.
    #[must_use]
    pub fn has_reached(&self, stage: Self) -> bool {
        match (self.timeline_position(), stage.timeline_position()) {
            (Some(current), Some(target)) => current >= target,
            _ => false,
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
