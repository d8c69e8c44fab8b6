//! Bounded, cancellable fan-out over products
//!
//! At most `worker_limit` products are in flight at once, each with its own
//! short ledger read. A failing or panicking product is recorded and skipped. Cancelling
//! stops new work, aborts in-flight tasks and keeps what already finished.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use shared::ProductId;
use tokio::sync::watch;
use tokio::task::{Id, JoinSet};

use crate::error::{AppError, AppResult, ErrorDetail};

/// Cancels a running batch scan
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Per-item failure inside a batch
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchError {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub error: ErrorDetail,
}

impl BatchError {
    pub fn new(product_id: ProductId, err: &AppError) -> Self {
        Self {
            product_id,
            error: err.detail(),
        }
    }
}

/// Results of a batch, possibly partial
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    pub items: Vec<T>,
    pub errors: Vec<BatchError>,
    pub processed: usize,
    pub cancelled: bool,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
            processed: 0,
            cancelled: false,
        }
    }
}

/// Run `task` for every product id on a bounded worker pool
pub async fn for_each_product<T, F, Fut>(
    product_ids: Vec<ProductId>,
    worker_limit: usize,
    cancel: Option<&CancelHandle>,
    task: F,
) -> BatchOutcome<T>
where
    F: Fn(ProductId) -> Fut,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let worker_limit = worker_limit.max(1);
    let mut cancel_rx = cancel.map(CancelHandle::subscribe);
    let mut detached = false;
    let mut pending = product_ids.into_iter();
    let mut workers = JoinSet::new();
    let mut in_flight: HashMap<Id, ProductId> = HashMap::new();
    let mut outcome = BatchOutcome::default();

    loop {
        if detached {
            cancel_rx = None;
            detached = false;
        }
        if cancel_rx.as_ref().map_or(false, |rx| *rx.borrow()) {
            outcome.cancelled = true;
            break;
        }

        while workers.len() < worker_limit {
            let Some(product_id) = pending.next() else {
                break;
            };
            let fut = task(product_id);
            let handle = workers.spawn(fut);
            in_flight.insert(handle.id(), product_id);
        }

        let joined = match cancel_rx.as_mut() {
            Some(rx) => tokio::select! {
                joined = workers.join_next_with_id() => joined,
                changed = rx.changed() => {
                    if changed.is_err() {
                        detached = true;
                    }
                    continue;
                }
            },
            None => workers.join_next_with_id().await,
        };

        let Some(joined) = joined else {
            break;
        };

        let (id, result) = match joined {
            Ok((id, result)) => (id, result),
            Err(join_err) => {
                tracing::error!(task_id = %join_err.id(), "batch worker failed: {}", join_err);
                let err = AppError::Internal(format!("worker failed: {}", join_err));
                (join_err.id(), Err(err))
            }
        };
        let Some(product_id) = in_flight.remove(&id) else {
            tracing::error!(task_id = %id, "joined a worker with no product");
            continue;
        };
        outcome.processed += 1;

        match result {
            Ok(item) => outcome.items.push(item),
            Err(err) => {
                tracing::warn!(product_id, code = err.code(), "skipping product: {}", err);
                outcome.errors.push(BatchError::new(product_id, &err));
            }
        }
    }

    if outcome.cancelled {
        workers.abort_all();
        tracing::info!(
            processed = outcome.processed,
            in_flight = workers.len(),
            "batch cancelled, returning partial results"
        );
    }

    outcome
}
