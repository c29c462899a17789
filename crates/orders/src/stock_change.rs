use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::ProductId;

/// What caused a stock level to change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeCause {
    /// The fulfillment processor decremented stock for an order.
    Fulfillment,
    /// An administrative edit changed the stock level.
    ManualUpdate,
}

/// Ephemeral broadcast notification of a stock change.
///
/// Delivered at-most-once per connected subscriber and never persisted by
/// the pipeline; subscribers re-read the stock store to resynchronize after
/// a gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChangeEvent {
    pub product_id: ProductId,
    pub new_stock: u64,
    pub cause: StockChangeCause,
    pub emitted_at: DateTime<Utc>,
}

impl StockChangeEvent {
    pub fn fulfillment(product_id: ProductId, new_stock: u64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            new_stock,
            cause: StockChangeCause::Fulfillment,
            emitted_at: now,
        }
    }

    pub fn manual_update(product_id: ProductId, new_stock: u64, now: DateTime<Utc>) -> Self {
        Self {
            product_id,
            new_stock,
            cause: StockChangeCause::ManualUpdate,
            emitted_at: now,
        }
    }
}
