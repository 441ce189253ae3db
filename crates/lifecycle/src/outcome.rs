//! Results of recording order events.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Deadline, Order, OrderStatus};
use serde::Serialize;

/// A deadline that passed before the milestone it governs was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineExceeded {
    pub order_id: OrderId,
    pub deadline: Deadline,
    pub deadline_at: DateTime<Utc>,

    /// The terminal status the order was moved to.
    pub resulting_status: OrderStatus,
}

impl std::fmt::Display for DeadlineExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} deadline of order {} passed at {}; order is now {}",
            self.deadline, self.order_id, self.deadline_at, self.resulting_status
        )
    }
}

/// What happened when an order event was recorded.
///
/// An expiry is a successful outcome: the ledger recorded the terminal
/// status instead of the requested one.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// The requested milestone was recorded.
    Recorded(Order),

    /// A deadline had passed and the order was expired.
    Expired(DeadlineExceeded, Order),
}

impl EventOutcome {
    /// Returns the order after the event.
    pub fn order(&self) -> &Order {
        match self {
            EventOutcome::Recorded(order) | EventOutcome::Expired(_, order) => order,
        }
    }

    /// Returns the exceeded deadline if the order was expired.
    pub fn deadline_exceeded(&self) -> Option<&DeadlineExceeded> {
        match self {
            EventOutcome::Recorded(_) => None,
            EventOutcome::Expired(exceeded, _) => Some(exceeded),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, EventOutcome::Expired(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deadline_exceeded_serializes_camel_case() {
        let exceeded = DeadlineExceeded {
            order_id: OrderId::new(3),
            deadline: Deadline::Approval,
            deadline_at: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            resulting_status: OrderStatus::ExpiredUnapproved,
        };

        let json = serde_json::to_value(&exceeded).unwrap();
        assert_eq!(json["deadline"], "approval");
        assert_eq!(json["resultingStatus"], "expired_unapproved");
        assert!(json.get("deadlineAt").is_some());
        assert!(exceeded.to_string().contains("approval deadline of order"));
    }
}
