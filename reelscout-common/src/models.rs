//! Persisted record types shared between the server and its observers.
//!
//! Four logical record types back the service: videos, scrape sessions,
//! prompts, and the singleton driver-connection row. Event payloads carry
//! full snapshots of these records, so they live in the common crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scrape session workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created but not yet driven
    Idle,
    /// Background task is (or should be) advancing this session
    Running,
    /// Batch exhausted, or stopped by the operator
    Completed,
    /// Batch fetch failed, or the session was abandoned by a restart
    Error,
}

impl SessionStatus {
    /// Terminal statuses are never re-entered
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SessionStatus::Idle),
            "running" => Some(SessionStatus::Running),
            "completed" => Some(SessionStatus::Completed),
            "error" => Some(SessionStatus::Error),
            _ => None,
        }
    }
}

/// One bounded scraping run: search, scrape N reels, analyze, await approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSession {
    pub id: Uuid,
    /// Search query driving the reel discovery (non-empty)
    pub search_query: String,
    /// Requested number of reels (positive)
    pub reel_count: u32,
    pub status: SessionStatus,
    /// Reels handled so far — monotonically non-decreasing
    pub processed_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
    pub error_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeSession {
    /// Create a new running session for a validated start request
    pub fn new(search_query: String, reel_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            search_query,
            reel_count,
            status: SessionStatus::Running,
            processed_count: 0,
            approved_count: 0,
            rejected_count: 0,
            error_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Video lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    /// Discovered, not yet picked up by the pipeline
    Queued,
    /// Pipeline is fetching comments / running analysis
    Analyzing,
    /// Analysis complete, awaiting operator approval
    Pending,
    /// Reply posted successfully
    Posted,
    /// Rejected by the operator
    Rejected,
    /// Pipeline or posting failed; `error_message` is always set
    Error,
}

impl VideoStatus {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Queued => "queued",
            VideoStatus::Analyzing => "analyzing",
            VideoStatus::Pending => "pending",
            VideoStatus::Posted => "posted",
            VideoStatus::Rejected => "rejected",
            VideoStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(VideoStatus::Queued),
            "analyzing" => Some(VideoStatus::Analyzing),
            "pending" => Some(VideoStatus::Pending),
            "posted" => Some(VideoStatus::Posted),
            "rejected" => Some(VideoStatus::Rejected),
            "error" => Some(VideoStatus::Error),
            _ => None,
        }
    }
}

/// One scraped reel under analysis/approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    /// Owning scrape session
    pub session_id: Uuid,
    /// Source identifier/url as reported by the driver
    pub url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub status: VideoStatus,
    /// Relevance score in [1, 10], set once analysis completes
    pub relevance_score: Option<u8>,
    /// Candidate reply produced by the reply engine
    pub generated_comment: Option<String>,
    /// Reply actually posted; set only after a successful post
    pub posted_comment: Option<String>,
    pub error_message: Option<String>,
    /// Raw comments extracted from the reel, in on-screen order
    pub extracted_comments: Vec<String>,
    /// Opaque structured analysis payload for the dashboard
    pub analysis_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Prompt template type — exactly one active prompt per type is expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Analysis,
    Comment,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::Analysis => "analysis",
            PromptKind::Comment => "comment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analysis" => Some(PromptKind::Analysis),
            "comment" => Some(PromptKind::Comment),
            _ => None,
        }
    }
}

/// Named, versioned instruction template for the LLM collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: Uuid,
    pub kind: PromptKind,
    pub prompt: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Automation driver reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// Lowercase string form used in the database
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "disconnected" => Some(ConnectionStatus::Disconnected),
            "connecting" => Some(ConnectionStatus::Connecting),
            "connected" => Some(ConnectionStatus::Connected),
            "error" => Some(ConnectionStatus::Error),
            _ => None,
        }
    }
}

/// Singleton record of the automation driver connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConnection {
    pub status: ConnectionStatus,
    pub host: String,
    pub port: u16,
    pub last_connected: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DriverConnection {
    /// Initial state before any connection attempt
    pub fn disconnected(host: String, port: u16) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            host,
            port,
            last_connected: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}
