//! Order pipeline value types.
//!
//! Requests, outcomes and stock-change notifications exchanged between the
//! order log, the fulfillment processor and the notification bus. Pure data;
//! no IO.

pub mod outcome;
pub mod position;
pub mod request;
pub mod stock_change;

pub use outcome::{OrderOutcome, OutcomeStatus};
pub use position::LogPosition;
pub use request::OrderRequest;
pub use stock_change::{StockChangeCause, StockChangeEvent};
