#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bullion_core::{ApiClient, Config, MemoryTokenStore, SessionPresenter, TokenStore};
use wiremock::MockServer;

pub const API_PREFIX: &str = "/api/v1";

/// Short enough to keep tests fast, long enough to overlap requests.
pub const WARNING_MS: u64 = 100;

#[derive(Default)]
pub struct RecordingPresenter {
    pub warnings: Mutex<Vec<String>>,
    pub restarts: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn warning_count(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    pub fn restart_routes(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }
}

impl SessionPresenter for RecordingPresenter {
    fn show_warning(&self, message: &str, _duration: Duration) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn restart(&self, entry_route: &str) {
        self.restarts.lock().unwrap().push(entry_route.to_string());
    }
}

pub struct Harness {
    pub server: MockServer,
    pub client: ApiClient,
    pub store: Arc<MemoryTokenStore>,
    pub presenter: Arc<RecordingPresenter>,
}

pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}{}", server.uri(), API_PREFIX),
        warning_duration_ms: WARNING_MS,
        ..Config::default()
    }
}

pub async fn harness(token: Option<&str>) -> Harness {
    harness_with(token, |_| {}).await
}

pub async fn harness_with<F>(token: Option<&str>, tweak: F) -> Harness
where
    F: FnOnce(&mut Config),
{
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    tweak(&mut config);

    let store = Arc::new(match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let presenter = Arc::new(RecordingPresenter::default());

    let client = ApiClient::builder(config)
        .token_store(store.clone())
        .presenter(presenter.clone())
        .build()
        .expect("client should build");

    Harness {
        server,
        client,
        store,
        presenter,
    }
}

impl Harness {
    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    /// Wait for the notifier's delayed restart to run.
    pub async fn wait_for_restart(&self) {
        let mut restarts = self.client.notifier().subscribe();
        if *restarts.borrow() > 0 {
            return;
        }
        tokio::time::timeout(Duration::from_secs(5), restarts.changed())
            .await
            .expect("restart should happen")
            .expect("notifier dropped");
    }

    pub async fn received_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}
