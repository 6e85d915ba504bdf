//! Common test utilities and mock implementations.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use fa_search_bot::api::SearchSource;
use fa_search_bot::api::UserFolder;
use fa_search_bot::api::error::ApiError;
use fa_search_bot::notify::Notification;
use fa_search_bot::notify::Notifier;
use fa_search_bot::notify::error::DeliveryError;
use fa_search_bot::repository::Repository;
use fa_search_bot::submission::Author;
use fa_search_bot::submission::FullSubmission;
use fa_search_bot::submission::Rating;
use fa_search_bot::submission::ResultKind;
use fa_search_bot::submission::SearchResult;
use fa_search_bot::submission::SubmissionId;
use uuid::Uuid;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("fa-search-bot-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Cleans up the test database file.
pub async fn teardown_db(db_path: PathBuf) {
    if db_path.exists() {
        let _ = std::fs::remove_file(db_path);
    }
}

#[allow(dead_code)]
pub fn result(id: u64) -> SearchResult {
    SearchResult {
        id: SubmissionId(id),
        title: format!("Submission {id}"),
        thumbnail_url: format!("https://t.furaffinity.net/{id}@1600-1.jpg"),
        author: Author {
            name: "Artist".to_string(),
            profile_name: "artist".to_string(),
        },
        kind: ResultKind::Short,
    }
}

/// A newest-first page with the given ids.
#[allow(dead_code)]
pub fn page(ids: &[u64]) -> Vec<SearchResult> {
    ids.iter().copied().map(result).collect()
}

// MOCK SEARCH SOURCE

/// Search source answering from canned pages.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockSearchSource {
    pub state: Arc<RwLock<MockSearchState>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct MockSearchState {
    pub pages: HashMap<String, Vec<SearchResult>>,
    pub failing: HashSet<String>,
    pub calls: HashMap<String, usize>,
}

#[allow(dead_code)]
impl MockSearchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, query: &str, ids: &[u64]) {
        let mut state = self.state.write().unwrap();
        state.failing.remove(query);
        state.pages.insert(query.to_string(), page(ids));
    }

    pub fn set_failing(&self, query: &str) {
        self.state.write().unwrap().failing.insert(query.to_string());
    }

    pub fn calls(&self, query: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .calls
            .get(query)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl SearchSource for MockSearchSource {
    async fn search(&self, query: &str, _page: u32) -> Result<Vec<SearchResult>, ApiError> {
        let mut state = self.state.write().unwrap();
        *state.calls.entry(query.to_string()).or_insert(0) += 1;
        if state.failing.contains(query) {
            return Err(ApiError::UpstreamUnavailable {
                message: "mock failure".to_string(),
            });
        }
        Ok(state.pages.get(query).cloned().unwrap_or_default())
    }

    async fn user_folder(
        &self,
        user: &str,
        folder: UserFolder,
        page: u32,
    ) -> Result<Vec<SearchResult>, ApiError> {
        self.search(&format!("{user}/{folder}"), page).await
    }

    async fn fetch_submission(&self, id: SubmissionId) -> Result<FullSubmission, ApiError> {
        Ok(FullSubmission {
            base: result(id.get()),
            download_url: format!("https://d.furaffinity.net/art/artist/1/{id}.png"),
            full_image_url: format!("https://d.furaffinity.net/art/artist/1/{id}.png"),
            description: String::new(),
            keywords: Vec::new(),
            rating: Rating::General,
        })
    }
}

// RECORDING NOTIFIER

/// Notifier remembering everything it was asked to send.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingNotifier {
    pub state: Arc<RwLock<RecordingState>>,
}

#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingState {
    /// (destination, query, submission id) of every delivered result.
    pub sent: Vec<(u64, String, u64)>,
    pub notices: Vec<(u64, String)>,
    pub failing_ids: HashSet<u64>,
    pub invalid_destinations: HashSet<u64>,
    pub attempts: usize,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_id(&self, id: u64) {
        self.state.write().unwrap().failing_ids.insert(id);
    }

    pub fn heal_id(&self, id: u64) {
        self.state.write().unwrap().failing_ids.remove(&id);
    }

    pub fn invalidate(&self, destination: u64) {
        self.state
            .write()
            .unwrap()
            .invalid_destinations
            .insert(destination);
    }

    pub fn sent(&self) -> Vec<(u64, String, u64)> {
        self.state.read().unwrap().sent.clone()
    }

    /// Ids delivered to one destination, in send order.
    pub fn sent_to(&self, destination: u64) -> Vec<u64> {
        self.state
            .read()
            .unwrap()
            .sent
            .iter()
            .filter(|(dest, _, _)| *dest == destination)
            .map(|(_, _, id)| *id)
            .collect()
    }

    pub fn notices(&self) -> Vec<(u64, String)> {
        self.state.read().unwrap().notices.clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.read().unwrap().attempts
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_result(
        &self,
        destination: u64,
        notification: &Notification,
    ) -> Result<(), DeliveryError> {
        let mut state = self.state.write().unwrap();
        state.attempts += 1;
        if state.invalid_destinations.contains(&destination) {
            return Err(DeliveryError::DestinationInvalid {
                destination,
                message: "Unknown Channel".to_string(),
            });
        }
        let id = notification.result.id.get();
        if state.failing_ids.contains(&id) {
            return Err(DeliveryError::DeliveryFailed {
                destination,
                message: "mock failure".to_string(),
            });
        }
        state
            .sent
            .push((destination, notification.query.clone(), id));
        Ok(())
    }

    async fn send_notice(&self, destination: u64, text: &str) -> Result<(), DeliveryError> {
        self.state
            .write()
            .unwrap()
            .notices
            .push((destination, text.to_string()));
        Ok(())
    }
}
