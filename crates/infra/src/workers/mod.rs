//! Background worker loops.

pub mod fulfillment_worker;

pub use fulfillment_worker::{FulfillmentWorker, WorkerConfig, WorkerHandle};
