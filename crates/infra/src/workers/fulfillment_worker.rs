use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use stockflow_events::NotificationBus;
use stockflow_orders::StockChangeEvent;

use crate::cursor::CursorStore;
use crate::order_log::OrderLog;
use crate::outcome_log::OutcomeLog;
use crate::processor::{DeadLetterStore, FulfillmentProcessor, ProcessError};
use crate::stock_store::StockStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Max log entries consumed per poll.
    pub batch_size: usize,
    /// Sleep when the log is drained.
    pub idle_delay: Duration,
    /// Sleep before re-polling after a storage outage.
    pub outage_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            idle_delay: Duration::from_millis(250),
            outage_delay: Duration::from_secs(1),
        }
    }
}

/// Polling loop around a [`FulfillmentProcessor`].
///
/// - Checks shutdown at the top of each iteration, never mid-entry
/// - Idles when the log is drained
/// - Backs off and re-polls on storage unavailability (the cursor did not
///   move, so nothing is lost)
/// - Halts when an entry is parked: the cursor is stopped in front of the
///   poisoned entry and resuming without operator action would only park
///   it again
#[derive(Debug)]
pub struct FulfillmentWorker;

impl FulfillmentWorker {
    pub fn spawn<L, O, S, B, C, D>(
        processor: FulfillmentProcessor<L, O, S, B, C, D>,
        config: WorkerConfig,
    ) -> WorkerHandle
    where
        L: OrderLog + Send + Sync + 'static,
        O: OutcomeLog + Send + Sync + 'static,
        S: StockStore + Send + Sync + 'static,
        B: NotificationBus<StockChangeEvent> + Send + Sync + 'static,
        C: CursorStore + Send + Sync + 'static,
        D: DeadLetterStore + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let name = processor.worker_name().to_string();

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&name, &processor, &shutdown_rx, &config))
            .expect("failed to spawn fulfillment worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop<L, O, S, B, C, D>(
    name: &str,
    processor: &FulfillmentProcessor<L, O, S, B, C, D>,
    shutdown_rx: &mpsc::Receiver<()>,
    config: &WorkerConfig,
) where
    L: OrderLog,
    O: OutcomeLog,
    S: StockStore,
    B: NotificationBus<StockChangeEvent>,
    C: CursorStore,
    D: DeadLetterStore,
{
    info!(worker = name, "fulfillment worker started");

    loop {
        // Shutdown check (non-blocking); entries in flight always finish.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match processor.poll(config.batch_size) {
            Ok(0) => {
                // recv_timeout doubles as the idle sleep so shutdown stays
                // responsive while drained.
                if shutdown_rx.recv_timeout(config.idle_delay).is_ok() {
                    break;
                }
            }
            Ok(_) => {}
            Err(err @ ProcessError::Parked { .. }) => {
                error!(worker = name, error = %err, "worker halting on parked entry");
                break;
            }
            Err(err) => {
                warn!(worker = name, error = %err, "poll failed, backing off");
                if shutdown_rx.recv_timeout(config.outage_delay).is_ok() {
                    break;
                }
            }
        }
    }

    info!(worker = name, "fulfillment worker stopped");
}
