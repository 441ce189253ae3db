//! Order state machine.

use chrono::{DateTime, Utc};
use common::Address;
use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──► Approved ──► Packed ──► Shipped ──► Delivered ──► QualityChecked ──► PaymentSent
///    │                                               │               │
///    └──► ExpiredUnapproved                          └───────────────┴──► ExpiredUnpaid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order placed, waiting for the seller's approval.
    #[default]
    Created,
    Approved,
    Packed,
    Shipped,
    Delivered,
    QualityChecked,

    /// Payment recorded and ownership transferred (terminal).
    PaymentSent,

    /// Approval deadline passed before approval (terminal).
    ExpiredUnapproved,

    /// Payment deadline passed after delivery without payment (terminal).
    ExpiredUnpaid,
}

/// The delivery stages an order moves through after creation, in order.
pub const DELIVERY_STAGES: [OrderStatus; 6] = [
    OrderStatus::Approved,
    OrderStatus::Packed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::QualityChecked,
    OrderStatus::PaymentSent,
];

impl OrderStatus {
    /// Returns the only status that may follow this one, if any.
    pub fn successor(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Created => Some(OrderStatus::Approved),
            OrderStatus::Approved => Some(OrderStatus::Packed),
            OrderStatus::Packed => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => Some(OrderStatus::QualityChecked),
            OrderStatus::QualityChecked => Some(OrderStatus::PaymentSent),
            OrderStatus::PaymentSent
            | OrderStatus::ExpiredUnapproved
            | OrderStatus::ExpiredUnpaid => None,
        }
    }

    /// Returns true if `next` is the immediate successor of this status.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        self.successor() == Some(next)
    }

    /// Returns the expiry status reachable from this one, if any.
    pub fn expiry(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Created => Some(OrderStatus::ExpiredUnapproved),
            OrderStatus::Delivered | OrderStatus::QualityChecked => Some(OrderStatus::ExpiredUnpaid),
            _ => None,
        }
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentSent | OrderStatus::ExpiredUnapproved | OrderStatus::ExpiredUnpaid
        )
    }

    /// Returns true for the deadline-forced terminal statuses.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            OrderStatus::ExpiredUnapproved | OrderStatus::ExpiredUnpaid
        )
    }

    /// Position among [`DELIVERY_STAGES`]; None for `Created` and expiries.
    pub fn stage_index(&self) -> Option<usize> {
        DELIVERY_STAGES.iter().position(|stage| stage == self)
    }

    /// Share of delivery stages completed, as a whole percentage.
    pub fn progress(&self) -> u8 {
        match self.stage_index() {
            Some(index) => ((index + 1) * 100 / DELIVERY_STAGES.len()) as u8,
            None => 0,
        }
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Approved => "approved",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::QualityChecked => "quality_checked",
            OrderStatus::PaymentSent => "payment_sent",
            OrderStatus::ExpiredUnapproved => "expired_unapproved",
            OrderStatus::ExpiredUnpaid => "expired_unpaid",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "approved" => Ok(OrderStatus::Approved),
            "packed" => Ok(OrderStatus::Packed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "quality_checked" => Ok(OrderStatus::QualityChecked),
            "payment_sent" => Ok(OrderStatus::PaymentSent),
            "expired_unapproved" => Ok(OrderStatus::ExpiredUnapproved),
            "expired_unpaid" => Ok(OrderStatus::ExpiredUnpaid),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Whether an order sells a whole product or a quantity split off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    FullProduct,
    PartialQuantity,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::FullProduct => "full_product",
            OrderType::PartialQuantity => "partial_quantity",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two deadlines an order carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deadline {
    Approval,
    Payment,
}

impl Deadline {
    /// The deadline that must not have passed for `status` to be recorded.
    pub fn governing(status: OrderStatus) -> Option<Deadline> {
        match status {
            OrderStatus::Approved => Some(Deadline::Approval),
            OrderStatus::PaymentSent => Some(Deadline::Payment),
            _ => None,
        }
    }

    /// The terminal status an order is forced into when this deadline passes.
    pub fn expiry_status(&self) -> OrderStatus {
        match self {
            Deadline::Approval => OrderStatus::ExpiredUnapproved,
            Deadline::Payment => OrderStatus::ExpiredUnpaid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Deadline::Approval => "approval",
            Deadline::Payment => "payment",
        }
    }
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded milestone of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    pub timestamp: DateTime<Utc>,
    pub status: OrderStatus,
    pub description: String,

    /// Company that recorded the milestone. None when the ledger recorded a
    /// deadline expiry on its own.
    pub updated_by: Option<Address>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_only_immediate_successor_is_legal() {
        let mut status = OrderStatus::Created;
        for stage in DELIVERY_STAGES {
            assert!(status.can_advance_to(stage));
            for other in DELIVERY_STAGES.iter().filter(|s| **s != stage) {
                assert!(!status.can_advance_to(*other));
            }
            status = stage;
        }
        assert!(status.is_terminal());
        assert_eq!(status.successor(), None);
    }

    #[test]
    fn test_expiry_targets() {
        assert_eq!(
            OrderStatus::Created.expiry(),
            Some(OrderStatus::ExpiredUnapproved)
        );
        assert_eq!(
            OrderStatus::Delivered.expiry(),
            Some(OrderStatus::ExpiredUnpaid)
        );
        assert_eq!(
            OrderStatus::QualityChecked.expiry(),
            Some(OrderStatus::ExpiredUnpaid)
        );
        assert_eq!(OrderStatus::Shipped.expiry(), None);
        assert_eq!(OrderStatus::PaymentSent.expiry(), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::QualityChecked.is_terminal());
        assert!(OrderStatus::PaymentSent.is_terminal());
        assert!(OrderStatus::ExpiredUnapproved.is_terminal());
        assert!(OrderStatus::ExpiredUnpaid.is_terminal());
        assert!(!OrderStatus::PaymentSent.is_expired());
    }

    #[test]
    fn test_progress() {
        assert_eq!(OrderStatus::Created.progress(), 0);
        assert_eq!(OrderStatus::Approved.stage_index(), Some(0));
        assert_eq!(OrderStatus::Shipped.progress(), 50);
        assert_eq!(OrderStatus::PaymentSent.progress(), 100);
        assert_eq!(OrderStatus::ExpiredUnpaid.progress(), 0);
    }

    #[test]
    fn test_governing_deadlines() {
        assert_eq!(
            Deadline::governing(OrderStatus::Approved),
            Some(Deadline::Approval)
        );
        assert_eq!(
            Deadline::governing(OrderStatus::PaymentSent),
            Some(Deadline::Payment)
        );
        assert_eq!(Deadline::governing(OrderStatus::Packed), None);
        assert_eq!(
            Deadline::Payment.expiry_status(),
            OrderStatus::ExpiredUnpaid
        );
    }

    #[test]
    fn test_string_round_trip() {
        for status in [
            OrderStatus::Created,
            OrderStatus::QualityChecked,
            OrderStatus::ExpiredUnapproved,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }
}
