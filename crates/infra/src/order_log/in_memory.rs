use std::sync::RwLock;

use stockflow_orders::{LogPosition, OrderRequest};

use super::{OrderLog, OrderLogError};

/// In-memory append-only order log.
///
/// Positions are `0-1`, `0-2`, ... in append order. Intended for tests/dev;
/// not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryOrderLog {
    entries: RwLock<Vec<OrderRequest>>,
}

impl InMemoryOrderLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn position_of(index: usize) -> LogPosition {
        LogPosition::new(0, index as u64 + 1)
    }
}

impl OrderLog for InMemoryOrderLog {
    fn append(&self, request: OrderRequest) -> Result<LogPosition, OrderLogError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| OrderLogError::Unavailable("lock poisoned".to_string()))?;

        entries.push(request);
        Ok(Self::position_of(entries.len() - 1))
    }

    fn read_after(
        &self,
        after: LogPosition,
        limit: usize,
    ) -> Result<Vec<(LogPosition, OrderRequest)>, OrderLogError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| OrderLogError::Unavailable("lock poisoned".to_string()))?;

        Ok(entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Self::position_of(i), e.clone()))
            .filter(|(pos, _)| *pos > after)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::{OrderId, ProductId};

    fn request(quantity: u32) -> OrderRequest {
        OrderRequest::new(OrderId::new(), ProductId::new(), quantity).unwrap()
    }

    #[test]
    fn append_assigns_strictly_increasing_positions() {
        let log = InMemoryOrderLog::new();
        let a = log.append(request(1)).unwrap();
        let b = log.append(request(2)).unwrap();
        assert!(b > a);
    }

    #[test]
    fn read_after_is_strictly_after_and_bounded() {
        let log = InMemoryOrderLog::new();
        for q in 1..=5 {
            log.append(request(q)).unwrap();
        }

        let all = log.read_after(LogPosition::start(), 10).unwrap();
        assert_eq!(all.len(), 5);

        let (second_pos, _) = all[1];
        let rest = log.read_after(second_pos, 2).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].1.quantity, 3);
    }

    #[test]
    fn read_is_restartable() {
        let log = InMemoryOrderLog::new();
        for q in 1..=3 {
            log.append(request(q)).unwrap();
        }

        let first = log.read_after(LogPosition::start(), 10).unwrap();
        let again = log.read_after(LogPosition::start(), 10).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn duplicate_payloads_get_distinct_positions() {
        let log = InMemoryOrderLog::new();
        let req = request(4);
        let a = log.append(req.clone()).unwrap();
        let b = log.append(req).unwrap();
        assert_ne!(a, b);
        assert_eq!(log.read_after(LogPosition::start(), 10).unwrap().len(), 2);
    }
}
