//! Order lifecycle and payment state machines.
//!
//! Statuses are persisted as their display strings; every write goes through
//! [`OrderStatus::transition`] or [`PaymentStatus::transition`], so an illegal
//! move is rejected in one place regardless of which route asked for it.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        }
    }

    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, AppError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::BadRequest(format!(
                "Cannot change order status from {self} to {next}"
            )))
        }
    }

    /// Shipped and delivered orders are out of the customer's hands.
    pub fn is_cancellable(&self) -> bool {
        !matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::BadRequest("Invalid status value".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Refunded => "Refunded",
        }
    }

    pub fn allowed_next(&self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Paid, Failed],
            Failed => &[Pending, Paid],
            Paid => &[Refunded],
            Refunded => &[],
        }
    }

    pub fn transition(self, next: PaymentStatus) -> Result<PaymentStatus, AppError> {
        if self.allowed_next().contains(&next) {
            Ok(next)
        } else {
            Err(AppError::BadRequest(format!(
                "Cannot change payment status from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::BadRequest("Invalid payment status".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Online => "ONLINE",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(PaymentMethod::Cod),
            "ONLINE" => Ok(PaymentMethod::Online),
            _ => Err(AppError::BadRequest("Invalid payment method".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_round_trips_through_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn delivered_cannot_go_back_to_pending() {
        assert!(OrderStatus::Delivered.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Cancelled.transition(OrderStatus::Processing).is_err());
        assert_eq!(
            OrderStatus::Pending.transition(OrderStatus::Processing).unwrap(),
            OrderStatus::Processing
        );
    }

    #[test]
    fn cancellation_follows_the_table() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn payment_refund_requires_paid() {
        assert!(PaymentStatus::Pending.transition(PaymentStatus::Refunded).is_err());
        assert_eq!(
            PaymentStatus::Paid.transition(PaymentStatus::Refunded).unwrap(),
            PaymentStatus::Refunded
        );
        assert!(PaymentStatus::Refunded.transition(PaymentStatus::Paid).is_err());
        assert!(PaymentStatus::Failed.transition(PaymentStatus::Paid).is_ok());
    }

    #[test]
    fn payment_method_uses_wire_names() {
        assert_eq!("COD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cod);
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Online).unwrap(),
            "\"ONLINE\""
        );
        assert!("cash".parse::<PaymentMethod>().is_err());
    }
}
