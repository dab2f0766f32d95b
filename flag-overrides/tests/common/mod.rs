use std::sync::Arc;

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use flag_overrides::api::AdminClient;
use flag_overrides::config::Config;
use flag_overrides::controller::DashboardController;
use flag_overrides::store::{Action, Store};

pub fn stats_body(flags: Value) -> Value {
    json!({
        "featureFlags": flags,
        "backendTotalRequests": 10,
        "requestsOk": 9,
        "requestsErrored": 1,
        "uptime": 3725,
    })
}

pub fn flag_json(name: &str, treatments: &[&str], default_treatment: &str) -> Value {
    json!({
        "name": name,
        "active": true,
        "killed": false,
        "defaultTreatment": default_treatment,
        "treatments": treatments,
        "flagSets": ["checkout"],
        "cn": "Tue Mar 05 14:07:09 UTC 2024",
        "changeNumber": 1709647629000i64,
    })
}

/// A mocked synchronizer admin API serving fixed reads.
pub struct Synchronizer {
    pub server: MockServer,
}

impl Synchronizer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    pub fn client(&self) -> AdminClient {
        let config = Config::default().with_admin_url(Some(self.server.base_url()));
        AdminClient::from_config(&config).expect("mock server url is valid")
    }

    pub async fn serve_stats(&self, body: Value) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/dashboard/stats");
                then.status(200).json_body(body);
            })
            .await
    }

    pub async fn serve_overrides(&self, body: Value) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(GET).path("/admin/overrides/ff");
                then.status(200).json_body(body);
            })
            .await
    }
}

/// A controller wired to a real client, plus the receiving end of its actions.
pub struct Harness {
    pub controller: DashboardController,
    pub actions: mpsc::UnboundedReceiver<Action>,
    pub store: Store,
}

impl Harness {
    pub fn new(client: AdminClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            controller: DashboardController::new(Arc::new(client), tx, Handle::current()),
            actions: rx,
            store: Store::new(),
        }
    }

    /// Feeds every action reported so far into the store.
    pub fn settle(&mut self) {
        while let Ok(action) = self.actions.try_recv() {
            if let Some(effect) = self.store.dispatch(action) {
                panic!("network actions never produce effects, got {effect:?}");
            }
        }
    }
}
