use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{OrderId, ProductId};

use crate::request::OrderRequest;

/// Terminal fulfillment decision for an order.
///
/// Business-rule failures are statuses here, never errors: an order that
/// cannot be fulfilled still gets exactly one recorded outcome.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    #[serde(rename = "fulfilled")]
    Fulfilled,
    #[serde(rename = "failed_insufficient_stock")]
    InsufficientStock,
    #[serde(rename = "failed_unknown_product")]
    UnknownProduct,
}

/// Durable record of the fulfillment decision for one order.
///
/// Append-only; at most one outcome exists per distinct `order_id`. That is
/// the central invariant the fulfillment processor guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub status: OutcomeStatus,
    pub decided_at: DateTime<Utc>,
}

impl OrderOutcome {
    pub fn decided(request: &OrderRequest, status: OutcomeStatus, now: DateTime<Utc>) -> Self {
        Self {
            order_id: request.order_id,
            product_id: request.product_id,
            quantity: request.quantity,
            status,
            decided_at: now,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status == OutcomeStatus::Fulfilled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&OutcomeStatus::Fulfilled).unwrap(),
            "\"fulfilled\""
        );
        assert_eq!(
            serde_json::to_string(&OutcomeStatus::InsufficientStock).unwrap(),
            "\"failed_insufficient_stock\""
        );
        assert_eq!(
            serde_json::to_string(&OutcomeStatus::UnknownProduct).unwrap(),
            "\"failed_unknown_product\""
        );
    }

    #[test]
    fn decided_copies_request_identity() {
        let request = OrderRequest::new(OrderId::new(), ProductId::new(), 3).unwrap();
        let outcome = OrderOutcome::decided(&request, OutcomeStatus::Fulfilled, Utc::now());
        assert_eq!(outcome.order_id, request.order_id);
        assert_eq!(outcome.product_id, request.product_id);
        assert_eq!(outcome.quantity, 3);
        assert!(outcome.is_fulfilled());
    }
}
