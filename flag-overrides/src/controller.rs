use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::api::AdminApi;
use crate::mutation::Mutation;
use crate::sequencer::{RequestSequencer, SequenceKey, Ticket};
use crate::store::{Action, Effect};
use crate::sync::fetch_and_merge;

/// Runs store effects against the admin API and reports back through `Action`s.
///
/// Failures are logged and otherwise swallowed: the dashboard keeps showing its last good
/// snapshot.
#[derive(Clone)]
pub struct DashboardController {
    inner: Arc<Inner>,
    runtime: Handle,
}

struct Inner {
    api: Arc<dyn AdminApi>,
    sequencer: RequestSequencer,
    actions: UnboundedSender<Action>,
}

impl DashboardController {
    pub fn new(api: Arc<dyn AdminApi>, actions: UnboundedSender<Action>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                sequencer: RequestSequencer::new(),
                actions,
            }),
            runtime,
        }
    }

    pub fn run(&self, effect: Effect) -> JoinHandle<()> {
        match effect {
            Effect::Refresh => self.refresh(),
            Effect::Submit(mutation) => self.submit(mutation),
        }
    }

    /// Starts a fetch-and-merge, superseding any refresh already running.
    pub fn refresh(&self) -> JoinHandle<()> {
        let ticket = self.inner.begin_refresh();
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move { inner.refresh_with(ticket).await })
    }

    /// Sends `mutation` and refreshes once it lands.
    ///
    /// A newer mutation for the same flag supersedes this one.
    pub fn submit(&self, mutation: Mutation) -> JoinHandle<()> {
        let ticket = self
            .inner
            .sequencer
            .begin(SequenceKey::Flag(mutation.flag_name().to_string()));
        self.inner.notify(Action::MutationStarted {
            name: mutation.flag_name().to_string(),
        });

        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move { inner.submit_with(ticket, mutation).await })
    }

    /// Cancels everything in flight, e.g. when the dashboard closes.
    pub fn shutdown(&self) {
        self.inner.sequencer.cancel_all();
    }
}

impl Inner {
    fn notify(&self, action: Action) {
        if self.actions.send(action).is_err() {
            debug!("dashboard is gone, dropping action");
        }
    }

    fn begin_refresh(&self) -> Ticket {
        let ticket = self.sequencer.begin(SequenceKey::Refresh);
        self.notify(Action::RefreshStarted {
            generation: ticket.generation(),
        });
        ticket
    }

    async fn refresh_with(&self, ticket: Ticket) {
        let generation = ticket.generation();
        match ticket.run(fetch_and_merge(self.api.as_ref())).await {
            None => debug!(generation, "refresh superseded"),
            Some(Ok(snapshot)) => {
                debug!(generation, flags = snapshot.flags.len(), "refresh done");
                self.notify(Action::SnapshotLoaded {
                    generation,
                    snapshot,
                });
            }
            Some(Err(e)) => {
                error!(generation, error = %e, "failed to fetch feature flags");
                self.notify(Action::RefreshFailed { generation });
            }
        }
        self.sequencer.finish(ticket);
    }

    async fn submit_with(&self, ticket: Ticket, mutation: Mutation) {
        let name = mutation.flag_name().to_string();
        let outcome = ticket.run(mutation.apply(self.api.as_ref())).await;

        // A superseding write reports for the flag from now on
        if self.sequencer.is_current(&ticket) {
            self.notify(Action::MutationFinished { name: name.clone() });
        }
        self.sequencer.finish(ticket);

        match outcome {
            None => debug!(flag = %name, "{mutation} superseded"),
            Some(Err(e)) => error!(flag = %name, error = %e, "failed to {mutation}"),
            Some(Ok(())) => {
                info!(flag = %name, "{mutation} done");
                let refresh = self.begin_refresh();
                self.refresh_with(refresh).await;
            }
        }
    }
}
