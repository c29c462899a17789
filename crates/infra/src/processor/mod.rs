//! The fulfillment processor: sole writer of stock decrements and outcomes.
//!
//! Per-entry protocol:
//!
//! 1. Read the next entries strictly after the stored cursor.
//! 2. If the order already has a recorded outcome, skip it and advance the
//!    cursor (replays are no-ops, keyed by `order_id`).
//! 3. Otherwise decide: unknown product and insufficient stock become
//!    terminal outcomes; a fulfillable order decrements stock through
//!    compare-and-set, retried with bounded backoff on version conflicts.
//! 4. Advance the cursor only after the outcome is durably recorded, and
//!    only then publish the stock-change notification.
//!
//! Storage unavailability aborts the entry without advancing the cursor
//! (the entry is retried on the next pass). An entry still conflicting
//! after the retry budget is parked in the dead-letter store and the
//! cursor stops in front of it.

use std::thread;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use stockflow_core::OrderId;
use stockflow_events::NotificationBus;
use stockflow_orders::{LogPosition, OrderOutcome, OrderRequest, OutcomeStatus, StockChangeEvent};

use crate::cursor::{CursorStore, CursorStoreError};
use crate::order_log::{OrderLog, OrderLogError};
use crate::outcome_log::{OutcomeLog, OutcomeLogError};
use crate::stock_store::{StockStore, StockStoreError};

pub mod dead_letter;
pub mod partition;
pub mod retry;

pub use dead_letter::{DeadLetterError, DeadLetterStore, InMemoryDeadLetterStore, ParkedOrder};
pub use partition::Partition;
pub use retry::RetryPolicy;

/// Infrastructure failure while processing the log.
///
/// Business-rule failures never appear here: insufficient stock and unknown
/// products are recorded outcomes, and a duplicate order is a no-op.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("order log: {0}")]
    OrderLog(#[from] OrderLogError),

    #[error("outcome log: {0}")]
    OutcomeLog(#[from] OutcomeLogError),

    #[error("stock store: {0}")]
    StockStore(StockStoreError),

    #[error("cursor store: {0}")]
    Cursor(#[from] CursorStoreError),

    #[error("dead-letter store: {0}")]
    DeadLetter(#[from] DeadLetterError),

    /// The entry at `position` exhausted its retry budget and was parked.
    /// The cursor was left in front of it.
    #[error("order {order_id} parked at {position} after {attempts} attempts")]
    Parked {
        position: LogPosition,
        order_id: OrderId,
        attempts: u32,
    },
}

/// How one log entry was handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Disposition {
    /// A fresh outcome was recorded.
    Decided(OutcomeStatus),
    /// The order already had an outcome (replayed entry).
    Duplicate,
    /// The entry belongs to another worker's partition.
    NotOwned,
}

#[derive(Debug)]
pub struct FulfillmentProcessor<L, O, S, B, C, D> {
    worker_name: String,
    partition: Partition,
    retry: RetryPolicy,
    order_log: L,
    outcomes: O,
    stock: S,
    bus: B,
    cursors: C,
    dead_letters: D,
}

impl<L, O, S, B, C, D> FulfillmentProcessor<L, O, S, B, C, D> {
    pub fn new(
        worker_name: impl Into<String>,
        order_log: L,
        outcomes: O,
        stock: S,
        bus: B,
        cursors: C,
        dead_letters: D,
    ) -> Self {
        Self {
            worker_name: worker_name.into(),
            partition: Partition::sole(),
            retry: RetryPolicy::default(),
            order_log,
            outcomes,
            stock,
            bus,
            cursors,
            dead_letters,
        }
    }

    /// Bind this processor to a partition of the product-id space.
    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }
}

impl<L, O, S, B, C, D> FulfillmentProcessor<L, O, S, B, C, D>
where
    L: OrderLog,
    O: OutcomeLog,
    S: StockStore,
    B: NotificationBus<StockChangeEvent>,
    C: CursorStore,
    D: DeadLetterStore,
{
    /// Process up to `limit` entries past the stored cursor.
    ///
    /// Returns the number of entries consumed (decided, deduplicated or
    /// skipped as foreign-partition). Zero means the log is drained.
    #[instrument(skip(self), fields(worker = %self.worker_name))]
    pub fn poll(&self, limit: usize) -> Result<usize, ProcessError> {
        let cursor = self.cursors.get(&self.worker_name)?.unwrap_or_default();
        let batch = self.order_log.read_after(cursor, limit)?;

        let mut consumed = 0;
        for (position, request) in batch {
            self.process_entry(position, &request)?;
            consumed += 1;
        }

        Ok(consumed)
    }

    /// Drain the log completely (test and catch-up helper).
    pub fn drain(&self, batch: usize) -> Result<usize, ProcessError> {
        let mut total = 0;
        loop {
            let consumed = self.poll(batch)?;
            if consumed == 0 {
                return Ok(total);
            }
            total += consumed;
        }
    }

    fn process_entry(
        &self,
        position: LogPosition,
        request: &OrderRequest,
    ) -> Result<Disposition, ProcessError> {
        if !self.partition.owns(request.product_id) {
            self.advance(position)?;
            return Ok(Disposition::NotOwned);
        }

        // Idempotency guard: a producer or operator replaying log entries
        // must not produce a second outcome or a second decrement.
        if self.outcomes.contains(request.order_id)? {
            debug!(order_id = %request.order_id, "order already decided, skipping");
            self.advance(position)?;
            return Ok(Disposition::Duplicate);
        }

        let (outcome, change) = self.decide(position, request)?;
        let status = outcome.status;

        // The decrement inside `decide` is already durable here. An
        // outcome-log failure in this window leaves it committed and the
        // retry pass decrements again: the outcome log is assumed to share
        // the stock store's deployment (one Redis instance), not fail
        // independently of it.
        self.outcomes.record(outcome)?;
        self.advance(position)?;

        // Notification is best-effort and strictly after the durable writes;
        // a slow or broken bus must not block stock mutation.
        if let Some(event) = change {
            if let Err(e) = self.bus.publish(event) {
                warn!(order_id = %request.order_id, error = ?e, "stock-change publish failed");
            }
        }

        Ok(Disposition::Decided(status))
    }

    /// Check-and-decrement against current product state.
    ///
    /// Re-reads the product on every CAS conflict: the losing writer must
    /// never decide from pre-decrement stock.
    fn decide(
        &self,
        position: LogPosition,
        request: &OrderRequest,
    ) -> Result<(OrderOutcome, Option<StockChangeEvent>), ProcessError> {
        let mut attempts = 0u32;

        loop {
            let product = self
                .stock
                .get(request.product_id)
                .map_err(ProcessError::StockStore)?;

            let Some(product) = product else {
                return Ok((
                    OrderOutcome::decided(request, OutcomeStatus::UnknownProduct, Utc::now()),
                    None,
                ));
            };

            if !product.can_fulfill(request.quantity) {
                return Ok((
                    OrderOutcome::decided(request, OutcomeStatus::InsufficientStock, Utc::now()),
                    None,
                ));
            }

            let new_stock = product.stock - u64::from(request.quantity);
            match self
                .stock
                .compare_and_set_stock(product.id, product.version, new_stock)
            {
                Ok(updated) => {
                    return Ok((
                        OrderOutcome::decided(request, OutcomeStatus::Fulfilled, Utc::now()),
                        Some(StockChangeEvent::fulfillment(
                            updated.id,
                            updated.stock,
                            Utc::now(),
                        )),
                    ));
                }
                Err(StockStoreError::NotFound) => {
                    // Deleted between read and write; the re-read resolves it.
                    continue;
                }
                Err(conflict @ StockStoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if self.retry.should_retry(attempts) {
                        thread::sleep(self.retry.delay_for_attempt(attempts));
                        continue;
                    }

                    self.dead_letters.park(ParkedOrder {
                        position,
                        request: request.clone(),
                        attempts,
                        reason: conflict.to_string(),
                        parked_at: Utc::now(),
                    })?;
                    error!(
                        worker = %self.worker_name,
                        order_id = %request.order_id,
                        %position,
                        attempts,
                        "order parked after exhausting retry budget"
                    );
                    return Err(ProcessError::Parked {
                        position,
                        order_id: request.order_id,
                        attempts,
                    });
                }
                Err(e) => return Err(ProcessError::StockStore(e)),
            }
        }
    }

    fn advance(&self, position: LogPosition) -> Result<(), ProcessError> {
        self.cursors.set(&self.worker_name, position)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stockflow_catalog::{NewProduct, Product, ProductPatch};
    use stockflow_core::ProductId;
    use stockflow_events::InMemoryNotificationBus;

    use crate::cursor::InMemoryCursorStore;
    use crate::order_log::InMemoryOrderLog;
    use crate::outcome_log::InMemoryOutcomeLog;
    use crate::stock_store::InMemoryStockStore;

    /// Stock store double that fails reads while an outage counter is set.
    struct Intermittent {
        inner: InMemoryStockStore,
        outages_left: std::sync::Mutex<u32>,
    }

    impl Intermittent {
        fn new(outages: u32) -> Self {
            Self {
                inner: InMemoryStockStore::new(),
                outages_left: std::sync::Mutex::new(outages),
            }
        }
    }

    impl StockStore for Intermittent {
        fn get(&self, id: ProductId) -> Result<Option<Product>, StockStoreError> {
            let mut left = self.outages_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(StockStoreError::Unavailable("simulated outage".to_string()));
            }
            self.inner.get(id)
        }

        fn list(&self) -> Result<Vec<Product>, StockStoreError> {
            self.inner.list()
        }

        fn create(&self, product: Product) -> Result<Product, StockStoreError> {
            self.inner.create(product)
        }

        fn compare_and_set_stock(
            &self,
            id: ProductId,
            expected_version: u64,
            new_stock: u64,
        ) -> Result<Product, StockStoreError> {
            self.inner.compare_and_set_stock(id, expected_version, new_stock)
        }

        fn update(
            &self,
            id: ProductId,
            expected: stockflow_core::ExpectedVersion,
            patch: &ProductPatch,
        ) -> Result<Product, StockStoreError> {
            self.inner.update(id, expected, patch)
        }

        fn delete(
            &self,
            id: ProductId,
            expected: stockflow_core::ExpectedVersion,
        ) -> Result<(), StockStoreError> {
            self.inner.delete(id, expected)
        }
    }

    /// Stock store double whose CAS always loses, for retry/park paths.
    struct AlwaysConflicting(InMemoryStockStore);

    impl StockStore for AlwaysConflicting {
        fn get(&self, id: ProductId) -> Result<Option<Product>, StockStoreError> {
            self.0.get(id)
        }

        fn list(&self) -> Result<Vec<Product>, StockStoreError> {
            self.0.list()
        }

        fn create(&self, product: Product) -> Result<Product, StockStoreError> {
            self.0.create(product)
        }

        fn compare_and_set_stock(
            &self,
            _id: ProductId,
            expected_version: u64,
            _new_stock: u64,
        ) -> Result<Product, StockStoreError> {
            Err(StockStoreError::VersionConflict {
                expected: expected_version,
                actual: expected_version + 1,
            })
        }

        fn update(
            &self,
            id: ProductId,
            expected: stockflow_core::ExpectedVersion,
            patch: &ProductPatch,
        ) -> Result<Product, StockStoreError> {
            self.0.update(id, expected, patch)
        }

        fn delete(
            &self,
            id: ProductId,
            expected: stockflow_core::ExpectedVersion,
        ) -> Result<(), StockStoreError> {
            self.0.delete(id, expected)
        }
    }

    fn processor_with_store<S: StockStore>(
        store: S,
    ) -> (
        FulfillmentProcessor<
            Arc<InMemoryOrderLog>,
            Arc<InMemoryOutcomeLog>,
            S,
            Arc<InMemoryNotificationBus<StockChangeEvent>>,
            Arc<InMemoryCursorStore>,
            Arc<InMemoryDeadLetterStore>,
        >,
        Arc<InMemoryOrderLog>,
        Arc<InMemoryOutcomeLog>,
        Arc<InMemoryCursorStore>,
        Arc<InMemoryDeadLetterStore>,
    ) {
        let order_log = Arc::new(InMemoryOrderLog::new());
        let outcomes = Arc::new(InMemoryOutcomeLog::new());
        let bus = Arc::new(InMemoryNotificationBus::new());
        let cursors = Arc::new(InMemoryCursorStore::new());
        let dead_letters = Arc::new(InMemoryDeadLetterStore::new());

        let processor = FulfillmentProcessor::new(
            "fulfillment-0",
            order_log.clone(),
            outcomes.clone(),
            store,
            bus,
            cursors.clone(),
            dead_letters.clone(),
        )
        .with_retry(RetryPolicy::new(
            2,
            std::time::Duration::from_millis(1),
            std::time::Duration::from_millis(2),
        ));

        (processor, order_log, outcomes, cursors, dead_letters)
    }

    fn seed_product(store: &impl StockStore, stock: u64) -> Product {
        let product = NewProduct {
            id: ProductId::new(),
            name: "Smart Watch".to_string(),
            description: "Fitness tracking with notifications".to_string(),
            price_cents: 24999,
            initial_stock: stock,
        }
        .into_product(Utc::now())
        .unwrap();
        store.create(product).unwrap()
    }

    #[test]
    fn exhausted_cas_budget_parks_entry_without_advancing_cursor() {
        let store = AlwaysConflicting(InMemoryStockStore::new());
        let product = seed_product(&store, 50);
        let (processor, order_log, outcomes, cursors, dead_letters) = processor_with_store(store);

        let request = OrderRequest::new(OrderId::new(), product.id, 10).unwrap();
        let position = order_log.append(request.clone()).unwrap();

        let err = processor.poll(16).unwrap_err();
        assert!(matches!(err, ProcessError::Parked { attempts: 2, .. }));

        // No outcome, cursor still in front of the parked entry,
        // entry visible to the operator.
        assert!(!outcomes.contains(request.order_id).unwrap());
        assert!(cursors.get("fulfillment-0").unwrap().is_none());

        let parked = dead_letters.list().unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].position, position);
        assert_eq!(parked[0].request.order_id, request.order_id);
    }

    #[test]
    fn storage_outage_defers_entry_without_advancing_cursor() {
        let store = Intermittent::new(1);
        let product = seed_product(&store, 50);
        let (processor, order_log, outcomes, cursors, dead_letters) = processor_with_store(store);

        let request = OrderRequest::new(OrderId::new(), product.id, 10).unwrap();
        let position = order_log.append(request.clone()).unwrap();

        let err = processor.poll(16).unwrap_err();
        assert!(matches!(
            err,
            ProcessError::StockStore(StockStoreError::Unavailable(_))
        ));

        // Nothing moved: no outcome, no parked entry, cursor untouched.
        assert!(cursors.get("fulfillment-0").unwrap().is_none());
        assert!(!outcomes.contains(request.order_id).unwrap());
        assert!(dead_letters.list().unwrap().is_empty());

        // Store back up: the same entry is retried and decided.
        assert_eq!(processor.poll(16).unwrap(), 1);
        assert_eq!(cursors.get("fulfillment-0").unwrap(), Some(position));
        assert!(outcomes.get(request.order_id).unwrap().unwrap().is_fulfilled());
    }

    #[test]
    fn foreign_partition_entries_are_skipped_but_cursor_advances() {
        let store = InMemoryStockStore::new();
        let product = seed_product(&store, 50);
        let (processor, order_log, outcomes, cursors, _) = processor_with_store(store);

        // Bind to whichever of two partitions does NOT own the product.
        let foreign = (Partition::partition_of(product.id, 2) + 1) % 2;
        let processor = processor.with_partition(Partition::new(foreign, 2));

        let request = OrderRequest::new(OrderId::new(), product.id, 10).unwrap();
        let position = order_log.append(request.clone()).unwrap();

        assert_eq!(processor.poll(16).unwrap(), 1);
        assert!(!outcomes.contains(request.order_id).unwrap());
        assert_eq!(cursors.get("fulfillment-0").unwrap(), Some(position));
    }

    #[test]
    fn drain_consumes_until_empty() {
        let store = InMemoryStockStore::new();
        let product = seed_product(&store, 50);
        let (processor, order_log, outcomes, _, _) = processor_with_store(store);

        for _ in 0..5 {
            let request = OrderRequest::new(OrderId::new(), product.id, 1).unwrap();
            order_log.append(request).unwrap();
        }

        assert_eq!(processor.drain(2).unwrap(), 5);
        assert_eq!(processor.drain(2).unwrap(), 0);
        assert_eq!(outcomes.list().unwrap().len(), 5);
    }
}
