//! Infrastructure layer: logs, stores, the fulfillment processor, workers
//! and Redis adapters.
//!
//! The pipeline wires together as:
//!
//! ```text
//! producer → OrderLog → FulfillmentProcessor → { StockStore CAS,
//!                                                OutcomeLog append,
//!                                                NotificationBus publish }
//! ```
//!
//! Every boundary is a trait with an in-memory implementation for tests/dev
//! and a Redis implementation behind the `redis` feature.

pub mod admin;
pub mod bus;
pub mod cursor;
pub mod order_log;
pub mod outcome_log;
pub mod processor;
pub mod stock_store;
pub mod workers;
