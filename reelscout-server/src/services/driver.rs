//! Automation driver client
//!
//! The driver is a sidecar process that operates the social app on a real or
//! emulated device. It is consumed through a narrow contract: fetch a batch
//! of reels for a query, fetch a reel's comments, post a comment. Its
//! internal mechanics (selectors, gestures, pacing) are its own business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use reelscout_common::{Error, Result};

/// Per-call timeout for driver requests. Device automation is slow but a
/// hung call must fail into the per-item error path instead of stalling the
/// session forever.
const DRIVER_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("reelscout/", env!("CARGO_PKG_VERSION"));

/// One reel as reported by the driver, engagement counts still in on-screen
/// form ("1.2K").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReel {
    /// Driver-side identifier for the reel
    #[serde(rename = "externalId")]
    pub external_id: String,
    pub title: String,
    #[serde(rename = "thumbnailRef")]
    pub thumbnail_ref: Option<String>,
    #[serde(rename = "likesRaw", default)]
    pub likes_raw: String,
    #[serde(rename = "commentsRaw", default)]
    pub comments_raw: String,
    #[serde(rename = "sharesRaw", default)]
    pub shares_raw: String,
}

/// Narrow contract over the device automation sidecar
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Establish the device session. One attempt; retry policy lives in the
    /// connection manager.
    async fn connect(&self) -> Result<()>;

    /// Tear down the device session. Idempotent.
    async fn disconnect(&self) -> Result<()>;

    /// Search for `query` and scrape up to `count` reels, in on-screen order
    async fn fetch_batch(&self, query: &str, count: u32) -> Result<Vec<RawReel>>;

    /// Extract up to `max` comments for a reel. No comments is an empty list,
    /// not an error.
    async fn fetch_comments(&self, external_id: &str, max: u32) -> Result<Vec<String>>;

    /// Post `text` as a comment. Returns false when the app refused the
    /// comment (comments disabled); errors only on transport failure.
    async fn post_comment(&self, external_id: &str, text: &str) -> Result<bool>;
}

/// HTTP client for the UI-automation sidecar
pub struct UiDriverClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PostCommentResponse {
    posted: bool,
}

impl UiDriverClient {
    /// Create a client for the sidecar at `host:port`
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DRIVER_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build driver client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("http://{}:{}", host, port),
        })
    }

    async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Error::Connection(format!(
                "{} failed: driver returned {}",
                context,
                response.status()
            )))
        }
    }
}

#[async_trait]
impl AutomationDriver for UiDriverClient {
    async fn connect(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Driver unreachable: {}", e)))?;

        Self::check_status(response, "Session start").await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/session", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Driver unreachable: {}", e)))?;

        // 404 means no session existed; disconnect is idempotent
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_status(response, "Session teardown").await?;
        Ok(())
    }

    async fn fetch_batch(&self, query: &str, count: u32) -> Result<Vec<RawReel>> {
        let response = self
            .client
            .post(format!("{}/reels/search", self.base_url))
            .json(&json!({ "query": query, "count": count }))
            .send()
            .await
            .map_err(|e| Error::BatchFetch(format!("Driver unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::BatchFetch(format!(
                "Driver returned {} for query '{}'",
                response.status(),
                query
            )));
        }

        response
            .json::<Vec<RawReel>>()
            .await
            .map_err(|e| Error::BatchFetch(format!("Malformed batch response: {}", e)))
    }

    async fn fetch_comments(&self, external_id: &str, max: u32) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/reels/{}/comments", self.base_url, external_id))
            .query(&[("max", max)])
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Driver unreachable: {}", e)))?;

        let response = Self::check_status(response, "Comment extraction").await?;
        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| Error::Internal(format!("Malformed comments response: {}", e)))
    }

    async fn post_comment(&self, external_id: &str, text: &str) -> Result<bool> {
        let response = self
            .client
            .post(format!("{}/reels/{}/comment", self.base_url, external_id))
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Driver unreachable: {}", e)))?;

        let response = Self::check_status(response, "Comment post").await?;
        let body: PostCommentResponse = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Malformed post response: {}", e)))?;

        Ok(body.posted)
    }
}
