//! Cancel-on-supersede sequencing of admin API requests.
//!
//! Every request is started under a [`SequenceKey`]. Starting a new request under a key
//! cancels the one already running under it, and the new request does not go out until the
//! old one has settled. Tickets carry a generation number that grows with every request, so
//! results can be ordered even after they cross on the way back.
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SequenceKey {
    /// The fetch-and-merge of the whole dashboard.
    Refresh,
    /// Writes against one flag's override.
    Flag(String),
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
    settled: CancellationToken,
}

#[derive(Default)]
pub struct RequestSequencer {
    last_generation: AtomicU64,
    in_flight: Mutex<HashMap<SequenceKey, InFlight>>,
}

/// Permission to run one request. Dropping it marks the request as settled.
pub struct Ticket {
    key: SequenceKey,
    generation: u64,
    cancel: CancellationToken,
    predecessor: Option<CancellationToken>,
    _settled: DropGuard,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request under `key`, superseding whatever runs under it.
    pub fn begin(&self, key: SequenceKey) -> Ticket {
        let generation = self.last_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let settled = CancellationToken::new();

        let previous = self.in_flight.lock().unwrap().insert(
            key.clone(),
            InFlight {
                generation,
                cancel: cancel.clone(),
                settled: settled.clone(),
            },
        );
        let predecessor = previous.map(|prev| {
            prev.cancel.cancel();
            prev.settled
        });

        Ticket {
            key,
            generation,
            cancel,
            predecessor,
            _settled: settled.drop_guard(),
        }
    }

    /// Whether `ticket` is still the latest request under its key.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.in_flight
            .lock()
            .unwrap()
            .get(&ticket.key)
            .is_some_and(|f| f.generation == ticket.generation)
    }

    pub fn finish(&self, ticket: Ticket) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight
            .get(&ticket.key)
            .is_some_and(|f| f.generation == ticket.generation)
        {
            in_flight.remove(&ticket.key);
        }
    }

    pub fn cancel_all(&self) {
        for (_, running) in self.in_flight.lock().unwrap().drain() {
            running.cancel.cancel();
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut` once the superseded request has settled.
    ///
    /// Returns `None`, dropping `fut`, if this ticket is superseded first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if let Some(predecessor) = &self.predecessor {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = predecessor.cancelled() => {}
            }
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}
