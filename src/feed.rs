//! Community feed: fetching, parsing and the displayed post list.
//!
//! The feed endpoint answers with a JSON array of posts:
//!
//! ```json
//! [{"id": 1, "image": "https://…/a.jpg", "description": "hi"}, …]
//! ```
//!
//! Parsing is forgiving per element and strict at the top level. A body that
//! is not a JSON array is a [`NetworkError::MalformedFeed`]; an element
//! missing `id`, `image` or `description`, or carrying the wrong type for
//! one of them, is skipped and logged. Extra fields are ignored and duplicate
//! ids are kept as separate rows.
//!
//! ## Overlapping fetches
//!
//! [`FeedState`] hands out a [`FetchTicket`] per fetch. Only the most
//! recently started fetch may replace the displayed list; a slower, older
//! fetch that lands afterwards is discarded as [`FeedUpdate::Stale`].

use crate::imaging::{decode_image, placeholder};
use crate::net::{Header, HttpClient, NetworkError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Headers sent with every feed request.
pub const FEED_HEADERS: [Header<'static>; 2] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
];

/// One published photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// URL of the photo.
    #[serde(rename = "image")]
    pub image_url: String,
    pub description: String,
}

/// Why a single feed element was skipped.
#[derive(Error, Debug)]
#[error("feed entry {index} skipped: {reason}")]
pub struct EntryError {
    pub index: usize,
    pub reason: String,
}

impl Post {
    /// Validate one element of the feed array.
    pub fn from_value(index: usize, value: serde_json::Value) -> Result<Post, EntryError> {
        serde_json::from_value(value).map_err(|e| EntryError {
            index,
            reason: e.to_string(),
        })
    }

    /// File name for this post's image when it sits at `row` (0-based) of
    /// the displayed list. Ids may repeat, so the row keeps names apart.
    pub fn image_filename(&self, row: usize) -> String {
        format!("{:03}-{}.png", row + 1, self.id)
    }
}

/// Parse a feed response body, skipping malformed elements.
pub fn parse_feed(body: &[u8]) -> Result<Vec<Post>, NetworkError> {
    let elements: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| NetworkError::MalformedFeed(e.to_string()))?;

    let posts: Vec<Post> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match Post::from_value(index, value) {
            Ok(post) => Some(post),
            Err(e) => {
                log::debug!("{e}");
                None
            }
        })
        .collect();
    Ok(posts)
}

/// GET the feed endpoint and parse the response.
pub fn fetch_feed(client: &impl HttpClient, url: &str) -> Result<Vec<Post>, NetworkError> {
    let body = client.get(url, &FEED_HEADERS)?;
    let posts = parse_feed(&body)?;
    log::info!("fetched {} posts from {url}", posts.len());
    Ok(posts)
}

/// Download and decode a post image.
///
/// Never fails: an empty URL, a transport error, or undecodable bytes all
/// yield the fixed [`placeholder`] image.
pub fn fetch_image(client: &impl HttpClient, url: &str) -> DynamicImage {
    if url.is_empty() {
        return placeholder();
    }
    let decoded = client
        .get(url, &[])
        .map_err(|e| e.to_string())
        .and_then(|bytes| decode_image(&bytes).map_err(|e| e.to_string()));
    match decoded {
        Ok(image) => image,
        Err(reason) => {
            log::warn!("using placeholder for {url}: {reason}");
            placeholder()
        }
    }
}

/// Identifies one fetch started through [`FeedState::begin_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// What a finished fetch did to the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUpdate {
    /// The list was replaced; holds the new length.
    Replaced(usize),
    /// The fetched list equals what is already shown.
    Unchanged,
    /// A newer fetch was started after this one; the result was dropped.
    Stale,
}

#[derive(Debug, Default)]
struct FeedInner {
    posts: Vec<Post>,
    latest: u64,
}

/// The post list a feed view displays.
#[derive(Debug, Default)]
pub struct FeedState {
    inner: Mutex<FeedInner>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the currently displayed posts.
    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a new fetch. Any fetch started earlier becomes stale.
    pub fn begin_fetch(&self) -> FetchTicket {
        let mut inner = self.lock();
        inner.latest += 1;
        FetchTicket(inner.latest)
    }

    /// Replace the displayed list with `posts` in full, unless a newer fetch
    /// has started since `ticket` was issued.
    pub fn finish_fetch(&self, ticket: FetchTicket, posts: Vec<Post>) -> FeedUpdate {
        let mut inner = self.lock();
        if ticket.0 != inner.latest {
            return FeedUpdate::Stale;
        }
        if inner.posts == posts {
            return FeedUpdate::Unchanged;
        }
        inner.posts = posts;
        FeedUpdate::Replaced(inner.posts.len())
    }

    /// Record a failed fetch: the feed is left empty unless a newer fetch
    /// owns it.
    pub fn fail_fetch(&self, ticket: FetchTicket) -> FeedUpdate {
        self.finish_fetch(ticket, Vec::new())
    }

    /// Fetch the feed and apply the result.
    ///
    /// Transport and parse failures are logged, empty the feed, and are
    /// returned to the caller. There is no retry.
    pub fn refresh(&self, client: &impl HttpClient, url: &str) -> Result<FeedUpdate, NetworkError> {
        let ticket = self.begin_fetch();
        match fetch_feed(client, url) {
            Ok(posts) => Ok(self.finish_fetch(ticket, posts)),
            Err(e) => {
                log::warn!("feed fetch failed: {e}");
                self.fail_fetch(ticket);
                Err(e)
            }
        }
    }
}
