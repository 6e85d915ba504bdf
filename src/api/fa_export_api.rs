use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::api::SEARCH_PAGE_SIZE;
use crate::api::SearchSource;
use crate::api::UserFolder;
use crate::api::error::ApiError;
use crate::submission::Author;
use crate::submission::FullSubmission;
use crate::submission::Rating;
use crate::submission::ResultKind;
use crate::submission::SearchResult;
use crate::submission::SubmissionId;
use crate::submission::make_thumbnail_bigger;

/// HTTP client for an FA export API instance.
pub struct FaExportApi {
    pub base_url: String,
    client: Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
}

impl FaExportApi {
    pub fn new(base_url: &str, requests_per_minute: u32) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("fa-search-bot/0.1"));

        let client = Client::builder().default_headers(headers).build()?;

        let rate = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_minute(rate));

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            limiter,
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        if self.limiter.check().is_err() {
            info!("Export API is ratelimited. Waiting...");
        }
        self.limiter.until_ready().await;

        let req = request.build()?;
        debug!("Making request to: {}", req.url());
        Ok(self.client.execute(req).await?)
    }

    async fn send_get_text(
        &self,
        request: reqwest::RequestBuilder,
        resource: impl FnOnce() -> String,
    ) -> Result<String, ApiError> {
        let response = self.send(request).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: resource(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::UpstreamUnavailable {
                message: format!("{} returned status {status}", resource()),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SearchSource for FaExportApi {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, ApiError> {
        debug!("Searching export API for \"{query}\" (page {page})");

        let request = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("full", "1".to_string()),
                ("perpage", SEARCH_PAGE_SIZE.to_string()),
                ("q", query.to_string()),
                ("page", page.to_string()),
            ]);

        let body = self
            .send_get_text(request, || format!("search results for \"{query}\""))
            .await?;
        parse_search_page(&body)
    }

    async fn user_folder(
        &self,
        user: &str,
        folder: UserFolder,
        page: u32,
    ) -> Result<Vec<SearchResult>, ApiError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(ApiError::NotFound {
                resource: "user \"\"".to_string(),
            });
        }
        debug!("Fetching {folder} of {user} from export API (page {page})");

        let request = self
            .client
            .get(format!("{}/user/{user}/{folder}.json", self.base_url))
            .query(&[
                ("full", "1".to_string()),
                ("perpage", SEARCH_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]);

        let body = self
            .send_get_text(request, || format!("{folder} of user \"{user}\""))
            .await?;
        parse_search_page(&body)
    }

    async fn fetch_submission(&self, id: SubmissionId) -> Result<FullSubmission, ApiError> {
        debug!("Fetching submission {id} from export API");

        let request = self
            .client
            .get(format!("{}/submission/{id}.json", self.base_url));

        let body = self
            .send_get_text(request, || format!("submission {id}"))
            .await?;
        parse_full_submission(&body)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }

    fn into_submission_id(self) -> Result<SubmissionId, ApiError> {
        match self {
            RawId::Number(n) => Ok(SubmissionId(n)),
            RawId::Text(s) => s.parse().map_err(|_| ApiError::MalformedResponse {
                message: format!("submission id `{s}` is not numeric"),
            }),
        }
    }
}

#[derive(Deserialize)]
struct ShortPayload {
    id: RawId,
    title: String,
    thumbnail: String,
    name: String,
    profile_name: String,
    #[serde(default)]
    fav_id: Option<RawId>,
}

impl TryFrom<ShortPayload> for SearchResult {
    type Error = ApiError;

    fn try_from(payload: ShortPayload) -> Result<Self, Self::Error> {
        let kind = match payload.fav_id {
            Some(fav_id) => ResultKind::Favorite {
                fav_id: fav_id.into_string(),
            },
            None => ResultKind::Short,
        };
        Ok(SearchResult {
            id: payload.id.into_submission_id()?,
            title: payload.title,
            thumbnail_url: make_thumbnail_bigger(&payload.thumbnail),
            author: Author {
                name: payload.name,
                profile_name: payload.profile_name,
            },
            kind,
        })
    }
}

#[derive(Deserialize)]
struct FullPayload {
    link: String,
    title: String,
    thumbnail: String,
    download: String,
    full: String,
    #[serde(default)]
    description_body: String,
    name: String,
    profile_name: String,
    #[serde(default)]
    keywords: Vec<String>,
    rating: String,
}

/// Parses a `search.json?full=1` or `user/{name}/{folder}.json?full=1` body.
pub fn parse_search_page(body: &str) -> Result<Vec<SearchResult>, ApiError> {
    let payloads: Vec<ShortPayload> = serde_json::from_str(body)?;
    payloads.into_iter().map(SearchResult::try_from).collect()
}

/// Parses a `submission/{id}.json` body.
pub fn parse_full_submission(body: &str) -> Result<FullSubmission, ApiError> {
    let payload: FullPayload = serde_json::from_str(body)?;
    let id = SubmissionId::from_link(&payload.link).ok_or_else(|| ApiError::MalformedResponse {
        message: format!("no submission id in link `{}`", payload.link),
    })?;
    let rating = payload
        .rating
        .parse::<Rating>()
        .map_err(|message| ApiError::MalformedResponse { message })?;

    Ok(FullSubmission {
        base: SearchResult {
            id,
            title: payload.title,
            thumbnail_url: make_thumbnail_bigger(&payload.thumbnail),
            author: Author {
                name: payload.name,
                profile_name: payload.profile_name,
            },
            kind: ResultKind::Short,
        },
        download_url: payload.download,
        full_image_url: payload.full,
        description: payload.description_body,
        keywords: payload.keywords,
        rating,
    })
}
