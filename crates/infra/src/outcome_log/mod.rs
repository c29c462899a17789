//! Append-only outcome log boundary.
//!
//! One outcome per distinct `order_id` is the pipeline's central invariant.
//! The fulfillment processor guarantees it by consulting this log before
//! deciding; the in-memory store additionally keeps the **first** write for
//! an order id and warns on any later attempt, so a replayed batch cannot
//! flip a recorded decision.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::warn;

use stockflow_core::OrderId;
use stockflow_orders::OrderOutcome;

#[derive(Debug, Error)]
pub enum OutcomeLogError {
    #[error("outcome log unavailable: {0}")]
    Unavailable(String),
}

pub trait OutcomeLog: Send + Sync {
    /// Record the decision for an order. First write per `order_id` wins;
    /// later writes are ignored.
    fn record(&self, outcome: OrderOutcome) -> Result<(), OutcomeLogError>;

    /// The recorded outcome for an order, if any.
    fn get(&self, order_id: OrderId) -> Result<Option<OrderOutcome>, OutcomeLogError>;

    /// Idempotency lookup used by the processor's duplicate-order check.
    fn contains(&self, order_id: OrderId) -> Result<bool, OutcomeLogError> {
        Ok(self.get(order_id)?.is_some())
    }

    /// All outcomes in decision order (read-only display boundary).
    fn list(&self) -> Result<Vec<OrderOutcome>, OutcomeLogError>;
}

impl<O> OutcomeLog for Arc<O>
where
    O: OutcomeLog + ?Sized,
{
    fn record(&self, outcome: OrderOutcome) -> Result<(), OutcomeLogError> {
        (**self).record(outcome)
    }

    fn get(&self, order_id: OrderId) -> Result<Option<OrderOutcome>, OutcomeLogError> {
        (**self).get(order_id)
    }

    fn contains(&self, order_id: OrderId) -> Result<bool, OutcomeLogError> {
        (**self).contains(order_id)
    }

    fn list(&self) -> Result<Vec<OrderOutcome>, OutcomeLogError> {
        (**self).list()
    }
}

/// In-memory append-only outcome log.
#[derive(Debug, Default)]
pub struct InMemoryOutcomeLog {
    inner: RwLock<OutcomeLogState>,
}

#[derive(Debug, Default)]
struct OutcomeLogState {
    outcomes: Vec<OrderOutcome>,
    by_order: HashMap<OrderId, usize>,
}

impl InMemoryOutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeLog for InMemoryOutcomeLog {
    fn record(&self, outcome: OrderOutcome) -> Result<(), OutcomeLogError> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| OutcomeLogError::Unavailable("lock poisoned".to_string()))?;

        if state.by_order.contains_key(&outcome.order_id) {
            warn!(order_id = %outcome.order_id, "ignoring second outcome for order");
            return Ok(());
        }

        let index = state.outcomes.len();
        state.by_order.insert(outcome.order_id, index);
        state.outcomes.push(outcome);
        Ok(())
    }

    fn get(&self, order_id: OrderId) -> Result<Option<OrderOutcome>, OutcomeLogError> {
        let state = self
            .inner
            .read()
            .map_err(|_| OutcomeLogError::Unavailable("lock poisoned".to_string()))?;

        Ok(state
            .by_order
            .get(&order_id)
            .map(|&i| state.outcomes[i].clone()))
    }

    fn list(&self) -> Result<Vec<OrderOutcome>, OutcomeLogError> {
        let state = self
            .inner
            .read()
            .map_err(|_| OutcomeLogError::Unavailable("lock poisoned".to_string()))?;

        Ok(state.outcomes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockflow_core::ProductId;
    use stockflow_orders::{OrderRequest, OutcomeStatus};

    fn outcome(order_id: OrderId, status: OutcomeStatus) -> OrderOutcome {
        let request = OrderRequest::new(order_id, ProductId::new(), 2).unwrap();
        OrderOutcome::decided(&request, status, Utc::now())
    }

    #[test]
    fn first_write_wins_per_order_id() {
        let log = InMemoryOutcomeLog::new();
        let order_id = OrderId::new();

        log.record(outcome(order_id, OutcomeStatus::Fulfilled)).unwrap();
        log.record(outcome(order_id, OutcomeStatus::InsufficientStock))
            .unwrap();

        let recorded = log.get(order_id).unwrap().unwrap();
        assert_eq!(recorded.status, OutcomeStatus::Fulfilled);
        assert_eq!(log.list().unwrap().len(), 1);
    }

    #[test]
    fn contains_reflects_recorded_orders() {
        let log = InMemoryOutcomeLog::new();
        let order_id = OrderId::new();
        assert!(!log.contains(order_id).unwrap());

        log.record(outcome(order_id, OutcomeStatus::UnknownProduct))
            .unwrap();
        assert!(log.contains(order_id).unwrap());
    }

    #[test]
    fn list_preserves_decision_order() {
        let log = InMemoryOutcomeLog::new();
        let first = OrderId::new();
        let second = OrderId::new();

        log.record(outcome(first, OutcomeStatus::Fulfilled)).unwrap();
        log.record(outcome(second, OutcomeStatus::Fulfilled)).unwrap();

        let all = log.list().unwrap();
        assert_eq!(all[0].order_id, first);
        assert_eq!(all[1].order_id, second);
    }
}
