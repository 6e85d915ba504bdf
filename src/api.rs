//! Client side of the submission export API.

use async_trait::async_trait;

use crate::api::error::ApiError;
use crate::submission::FullSubmission;
use crate::submission::SearchResult;
use crate::submission::SubmissionId;

pub mod error;
pub mod fa_export_api;

/// Results per search page requested from the API.
pub const SEARCH_PAGE_SIZE: usize = 48;

/// Submission folders listed on a user page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFolder {
    Gallery,
    Scraps,
    Favorites,
}

impl UserFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserFolder::Gallery => "gallery",
            UserFolder::Scraps => "scraps",
            UserFolder::Favorites => "favorites",
        }
    }
}

impl std::fmt::Display for UserFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of search results and submission details.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Returns one page of results for `query`, newest first. Pages start at 1.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, ApiError>;

    /// Returns one page of a user's folder, newest first. Favorites carry
    /// their favorite id.
    async fn user_folder(
        &self,
        user: &str,
        folder: UserFolder,
        page: u32,
    ) -> Result<Vec<SearchResult>, ApiError>;

    /// Fetches the full details of a single submission.
    async fn fetch_submission(&self, id: SubmissionId) -> Result<FullSubmission, ApiError>;
}
