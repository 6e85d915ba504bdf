//! Submission value types returned by the export API.
//!
//! A search returns [`SearchResult`]s, newest first. The numeric
//! [`SubmissionId`] is the ordering key used to decide what is new for a
//! subscription. A [`FullSubmission`] is a search result plus the fields only
//! the single-submission endpoint provides.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

static THUMBNAIL_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[0-9]+-").expect("valid thumbnail size pattern"));
static VIEW_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)furaffinity\.net/view/([0-9]+)").expect("valid view link pattern"));

/// Numeric submission identifier. Higher is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub u64);

impl SubmissionId {
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Extracts the id from a `furaffinity.net/view/{id}` link.
    pub fn from_link(link: &str) -> Option<Self> {
        VIEW_LINK
            .captures(link)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .map(SubmissionId)
    }

    /// Every distinct submission linked in `text`, in order of appearance.
    pub fn find_all_in(text: &str) -> Vec<Self> {
        let mut ids: Vec<Self> = Vec::new();
        for caps in VIEW_LINK.captures_iter(text) {
            let Some(id) = caps.get(1).and_then(|m| m.as_str().parse().ok()) else {
                continue;
            };
            if !ids.contains(&SubmissionId(id)) {
                ids.push(SubmissionId(id));
            }
        }
        ids
    }

    /// Accepts either a bare id or a view link.
    pub fn parse_user_input(input: &str) -> Option<Self> {
        let input = input.trim();
        input.parse().ok().or_else(|| Self::from_link(input))
    }

    pub fn link(&self) -> String {
        format!("https://furaffinity.net/view/{}/", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(SubmissionId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub profile_name: String,
}

impl Author {
    pub fn link(&self) -> String {
        format!("https://furaffinity.net/user/{}/", self.profile_name)
    }
}

/// Which listing a short result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Short,
    /// Favourites listings carry the id of the favourite itself.
    Favorite { fav_id: String },
}

/// A short search result, as listed by search and folder endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: SubmissionId,
    pub title: String,
    pub thumbnail_url: String,
    pub author: Author,
    pub kind: ResultKind,
}

impl SearchResult {
    pub fn link(&self) -> String {
        self.id.link()
    }

    pub fn small_thumbnail_url(&self) -> String {
        make_thumbnail_smaller(&self.thumbnail_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    General,
    Mature,
    Adult,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::General => "General",
            Rating::Mature => "Mature",
            Rating::Adult => "Adult",
        }
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "General" => Ok(Rating::General),
            "Mature" => Ok(Rating::Mature),
            "Adult" => Ok(Rating::Adult),
            other => Err(format!("unknown rating `{other}`")),
        }
    }
}

/// A search result extended with the single-submission fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSubmission {
    pub base: SearchResult,
    pub download_url: String,
    pub full_image_url: String,
    /// HTML body of the description.
    pub description: String,
    pub keywords: Vec<String>,
    pub rating: Rating,
}

impl FullSubmission {
    /// Lowercased extension of the download, e.g. `png`.
    pub fn download_extension(&self) -> String {
        self.download_url
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self.download_extension().as_str(),
            "jpg" | "jpeg" | "png" | "gif"
        )
    }
}

pub fn make_thumbnail_bigger(thumbnail_url: &str) -> String {
    THUMBNAIL_SIZE
        .replace_all(thumbnail_url, "@1600-")
        .into_owned()
}

pub fn make_thumbnail_smaller(thumbnail_url: &str) -> String {
    THUMBNAIL_SIZE
        .replace_all(thumbnail_url, "@300-")
        .into_owned()
}
