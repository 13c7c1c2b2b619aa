//! Order status state machine
//!
//! `pending → allocated → in_transit → {delivered, failed}`
//!
//! Administrative cancellation may fail an order from `pending` or
//! `allocated`. Reverting to `pending` is only legal as part of a run
//! cancellation cascade. Once delivered or failed the status is terminal;
//! only proof-of-delivery fields may still change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Allocated,
    InTransit,
    Delivered,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Allocated => "allocated",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "allocated" => Some(OrderStatus::Allocated),
            "in_transit" => Some(OrderStatus::InTransit),
            "delivered" => Some(OrderStatus::Delivered),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    /// Map a mobile-app stop status to the backend order status.
    ///
    /// The driver app speaks `pending | inProgress | delivered | failed`.
    pub fn from_mobile(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Allocated),
            "inProgress" => Some(OrderStatus::InTransit),
            "delivered" => Some(OrderStatus::Delivered),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }

    /// The stop status shown to the driver app for this order status.
    pub fn as_mobile(&self) -> &'static str {
        match self {
            OrderStatus::Pending | OrderStatus::Allocated => "pending",
            OrderStatus::InTransit => "inProgress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Failed)
    }

    /// Whether a normal (non-cascade) transition from `self` to `to` is legal.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, to) {
            // no-op transitions are tolerated
            (a, b) if *a == b => true,
            (Pending, Allocated) => true,
            (Allocated, InTransit) => true,
            // driver records an outcome
            (Allocated | InTransit, Delivered | Failed) => true,
            // administrative cancellation; allocated → failed is already
            // admitted by the outcome arm above
            (Pending, Failed) => true,
            _ => false,
        }
    }

    /// Whether an administrative cancellation (→ failed) is allowed.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Allocated)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Allocated));
        assert!(OrderStatus::Allocated.can_transition(OrderStatus::InTransit));
        assert!(OrderStatus::InTransit.can_transition(OrderStatus::Delivered));
        assert!(OrderStatus::InTransit.can_transition(OrderStatus::Failed));
        // administrative cancellation paths
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Failed));
        assert!(OrderStatus::Allocated.can_transition(OrderStatus::Failed));
    }

    #[test]
    fn test_terminal_statuses_reject_changes() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition(OrderStatus::Pending));
            assert!(!terminal.can_transition(OrderStatus::InTransit));
            // same-status update is a tolerated no-op
            assert!(terminal.can_transition(terminal));
        }
    }

    #[test]
    fn test_cancellation_window() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Allocated.can_cancel());
        assert!(!OrderStatus::InTransit.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
    }

    #[test]
    fn test_mobile_status_mapping() {
        assert_eq!(OrderStatus::from_mobile("inProgress"), Some(OrderStatus::InTransit));
        assert_eq!(OrderStatus::from_mobile("pending"), Some(OrderStatus::Allocated));
        assert_eq!(OrderStatus::from_mobile("bogus"), None);
        assert_eq!(OrderStatus::Allocated.as_mobile(), "pending");
        assert_eq!(OrderStatus::InTransit.as_mobile(), "inProgress");
    }

    #[test]
    fn test_skipping_in_transit_is_allowed() {
        // drivers can mark a stop delivered without an explicit "start"
        assert!(OrderStatus::Allocated.can_transition(OrderStatus::Delivered));
    }
}
