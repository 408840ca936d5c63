//! Scrape session orchestration
//!
//! Owns the single active session's lifecycle: start, iterate reels via the
//! automation driver, run the analysis pipeline per reel, update counters,
//! stop, complete or fail. At most one session is being actively driven at
//! any time, guarded by a single-slot tracked id. The persisted record is
//! the source of truth; the slot is only the fast-path guard the background
//! loop checks between reels.
//!
//! Cancellation is cooperative: stopping a session (or starting a new one)
//! changes the slot, and the background task observes that at its next loop
//! checkpoint. A superseded task still persists the outcome of the reel it
//! had in flight, but stops advancing counters and never touches the
//! session's status again.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use reelscout_common::engagement::parse_count;
use reelscout_common::models::{
    PromptKind, ScrapeSession, SessionStatus, Video, VideoStatus,
};
use reelscout_common::{Error, EventBus, ReelEvent, Result};

use crate::db;
use crate::services::connection::ConnectionManager;
use crate::services::driver::{AutomationDriver, RawReel};
use crate::services::pipeline::ReelAnalysisPipeline;

/// Per-session counter deltas applied against the freshly-loaded record
#[derive(Debug, Default, Clone, Copy)]
struct CounterDeltas {
    processed: u32,
    approved: u32,
    rejected: u32,
    errors: u32,
}

/// Drives scraping sessions. Cheap to clone; all fields are shared handles.
#[derive(Clone)]
pub struct SessionOrchestrator {
    db: sqlx::SqlitePool,
    event_bus: EventBus,
    driver: Arc<dyn AutomationDriver>,
    pipeline: Arc<ReelAnalysisPipeline>,
    connection: Arc<ConnectionManager>,
    /// Id of the one session allowed to advance, if any
    active: Arc<RwLock<Option<Uuid>>>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl SessionOrchestrator {
    pub fn new(
        db: sqlx::SqlitePool,
        event_bus: EventBus,
        driver: Arc<dyn AutomationDriver>,
        pipeline: Arc<ReelAnalysisPipeline>,
        connection: Arc<ConnectionManager>,
        last_error: Arc<RwLock<Option<String>>>,
    ) -> Self {
        Self {
            db,
            event_bus,
            driver,
            pipeline,
            connection,
            active: Arc::new(RwLock::new(None)),
            last_error,
        }
    }

    /// Id of the currently tracked session, if any
    pub async fn active_session_id(&self) -> Option<Uuid> {
        *self.active.read().await
    }

    /// Start a new scraping session.
    ///
    /// Validates the request, requires a live driver connection,
    /// force-completes any session still marked running, creates the new
    /// record, and launches the background processing task. Returns the
    /// created session immediately; reel processing happens behind it.
    pub async fn start_session(&self, query: &str, reel_count: u32) -> Result<ScrapeSession> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("Search query must not be empty".to_string()));
        }
        if reel_count == 0 {
            return Err(Error::Validation("Reel count must be positive".to_string()));
        }
        if !self.connection.is_ready() {
            return Err(Error::NotReady(
                "Connect the automation driver before starting a session".to_string(),
            ));
        }

        // Take the slot before touching records so a concurrent start
        // serializes behind this one
        let mut slot = self.active.write().await;

        // Supersede any session still marked running. No signal is sent to
        // its in-flight work; the old task notices the slot change at its
        // next checkpoint.
        if let Some(previous) = db::sessions::get_active_session(&self.db).await? {
            info!(session_id = %previous.id, "Force-completing superseded session");
            let mut previous = previous;
            previous.status = SessionStatus::Completed;
            previous.updated_at = Utc::now();
            db::sessions::save_session(&self.db, &previous).await?;
            self.event_bus
                .emit_lossy(ReelEvent::SessionUpdated { session: previous });
        }

        let session = ScrapeSession::new(query.to_string(), reel_count);
        db::sessions::save_session(&self.db, &session).await?;
        *slot = Some(session.id);
        drop(slot);

        self.event_bus.emit_lossy(ReelEvent::SessionUpdated {
            session: session.clone(),
        });

        info!(
            session_id = %session.id,
            query = %session.search_query,
            reel_count = session.reel_count,
            "Scrape session started"
        );

        let orchestrator = self.clone();
        let background = session.clone();
        tokio::spawn(async move {
            orchestrator.run_session(background).await;
        });

        Ok(session)
    }

    /// Stop a session. Idempotent: stopping a terminal session returns the
    /// record unchanged.
    pub async fn stop_session(&self, session_id: Uuid) -> Result<ScrapeSession> {
        let mut session = db::sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session not found: {}", session_id)))?;

        // Clear the slot so the background task stops at its next checkpoint
        {
            let mut slot = self.active.write().await;
            if *slot == Some(session_id) {
                *slot = None;
            }
        }

        if !session.status.is_terminal() {
            session.status = SessionStatus::Completed;
            session.updated_at = Utc::now();
            db::sessions::save_session(&self.db, &session).await?;
            self.event_bus.emit_lossy(ReelEvent::SessionUpdated {
                session: session.clone(),
            });
            info!(session_id = %session_id, "Scrape session stopped");
        }

        Ok(session)
    }

    /// Post the generated reply for a pending video.
    ///
    /// The video must be awaiting approval and must carry a generated
    /// comment. A driver refusal (comments disabled) or transport failure
    /// moves the video to error instead of posted.
    pub async fn approve_video(&self, video_id: Uuid) -> Result<Video> {
        let mut video = db::videos::get_video(&self.db, video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video not found: {}", video_id)))?;

        if video.status != VideoStatus::Pending {
            return Err(Error::Validation(format!(
                "Video is not awaiting approval (status: {})",
                video.status.as_str()
            )));
        }

        let comment = video
            .generated_comment
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                Error::NotFound(format!("Video has no generated comment: {}", video_id))
            })?;

        let posted = self.driver.post_comment(&video.url, &comment).await;
        video.updated_at = Utc::now();

        let deltas = match posted {
            Ok(true) => {
                video.status = VideoStatus::Posted;
                video.posted_comment = Some(comment);
                video.error_message = None;
                info!(video_id = %video_id, "Comment posted");
                CounterDeltas { approved: 1, ..Default::default() }
            }
            Ok(false) => {
                video.status = VideoStatus::Error;
                video.error_message =
                    Some("Failed to post comment or comments disabled".to_string());
                warn!(video_id = %video_id, "Driver refused comment post");
                CounterDeltas { errors: 1, ..Default::default() }
            }
            Err(e) => {
                video.status = VideoStatus::Error;
                video.error_message = Some(format!("Failed to post comment: {}", e));
                warn!(video_id = %video_id, error = %e, "Comment post failed");
                CounterDeltas { errors: 1, ..Default::default() }
            }
        };

        db::videos::save_video(&self.db, &video).await?;
        self.event_bus.emit_lossy(ReelEvent::VideoUpdated {
            video: video.clone(),
        });

        // Counters always land on the owning session, not the tracked one
        self.bump_counters(video.session_id, deltas).await?;

        Ok(video)
    }

    /// Reject a pending video, recording the operator's reason
    pub async fn reject_video(&self, video_id: Uuid, reason: Option<String>) -> Result<Video> {
        let mut video = db::videos::get_video(&self.db, video_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Video not found: {}", video_id)))?;

        if video.status != VideoStatus::Pending {
            return Err(Error::Validation(format!(
                "Video is not awaiting approval (status: {})",
                video.status.as_str()
            )));
        }

        video.status = VideoStatus::Rejected;
        video.error_message = Some(
            reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Rejected by user".to_string()),
        );
        video.updated_at = Utc::now();

        db::videos::save_video(&self.db, &video).await?;
        self.event_bus.emit_lossy(ReelEvent::VideoUpdated {
            video: video.clone(),
        });

        self.bump_counters(
            video.session_id,
            CounterDeltas { rejected: 1, ..Default::default() },
        )
        .await?;

        info!(video_id = %video_id, "Video rejected");
        Ok(video)
    }

    /// Background processing loop for one session
    async fn run_session(&self, session: ScrapeSession) {
        let session_id = session.id;
        info!(session_id = %session_id, "Background scrape task started");

        let batch = match self
            .driver
            .fetch_batch(&session.search_query, session.reel_count)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                self.fail_session(session_id, e).await;
                return;
            }
        };

        let total = batch.len() as u32;
        info!(session_id = %session_id, total, "Reel batch fetched");

        for raw in batch {
            // Cooperative cancellation checkpoint: a stop or a new start
            // changed the slot, and whatever the stopper set stands
            if self.active_session_id().await != Some(session_id) {
                info!(session_id = %session_id, "Session superseded, stopping loop");
                return;
            }

            let video = match self.process_reel(session_id, &raw).await {
                Ok(video) => video,
                Err(e) => {
                    // Persistence failure for this reel; nothing to record
                    error!(session_id = %session_id, error = %e, "Failed to persist reel");
                    continue;
                }
            };

            // Lame duck: the reel in flight still got persisted above, but a
            // superseded task no longer advances counters
            if self.active_session_id().await != Some(session_id) {
                info!(session_id = %session_id, "Session superseded mid-reel");
                return;
            }

            let errors = u32::from(video.status == VideoStatus::Error);
            let updated = match self
                .bump_counters(
                    session_id,
                    CounterDeltas { processed: 1, errors, ..Default::default() },
                )
                .await
            {
                Ok(updated) => updated,
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Failed to update counters");
                    continue;
                }
            };

            self.event_bus.emit_lossy(ReelEvent::ScrapeProgress {
                session_id,
                processed: updated.processed_count,
                total,
                current: Some(video),
            });
        }

        // Only the task that still owns the slot may complete the session
        {
            let mut slot = self.active.write().await;
            if *slot != Some(session_id) {
                return;
            }
            *slot = None;
        }

        match self.finish_session(session_id).await {
            Ok(()) => info!(session_id = %session_id, "Scrape session completed"),
            Err(e) => error!(session_id = %session_id, error = %e, "Failed to complete session"),
        }
    }

    /// Create the video record for one reel and run it through the pipeline.
    /// Pipeline failures are recorded on the video, not propagated; the
    /// returned error covers persistence only.
    async fn process_reel(&self, session_id: Uuid, raw: &RawReel) -> Result<Video> {
        let now = Utc::now();
        let mut video = Video {
            id: Uuid::new_v4(),
            session_id,
            url: raw.external_id.clone(),
            title: raw.title.clone(),
            thumbnail: raw.thumbnail_ref.clone(),
            likes: parse_count(&raw.likes_raw),
            comments: parse_count(&raw.comments_raw),
            shares: parse_count(&raw.shares_raw),
            status: VideoStatus::Analyzing,
            relevance_score: None,
            generated_comment: None,
            posted_comment: None,
            error_message: None,
            extracted_comments: Vec::new(),
            analysis_data: None,
            created_at: now,
            updated_at: now,
        };
        db::videos::save_video(&self.db, &video).await?;
        self.event_bus.emit_lossy(ReelEvent::VideoUpdated {
            video: video.clone(),
        });

        // Prompts are re-read per reel so mid-session edits take effect
        let analysis_prompt =
            db::prompts::get_active_prompt(&self.db, PromptKind::Analysis).await?;
        let comment_prompt = db::prompts::get_active_prompt(&self.db, PromptKind::Comment).await?;

        match self
            .pipeline
            .process(raw, analysis_prompt.as_ref(), comment_prompt.as_ref())
            .await
        {
            Ok(outcome) => {
                video.status = VideoStatus::Pending;
                video.relevance_score = Some(outcome.score);
                video.generated_comment = Some(outcome.reply.text);
                video.extracted_comments = outcome.comments;
                video.analysis_data = Some(outcome.analysis);
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    video_id = %video.id,
                    error = %e,
                    "Reel processing failed"
                );
                video.status = VideoStatus::Error;
                video.error_message = Some(e.to_string());
            }
        }
        video.updated_at = Utc::now();

        db::videos::save_video(&self.db, &video).await?;
        self.event_bus.emit_lossy(ReelEvent::VideoUpdated {
            video: video.clone(),
        });

        Ok(video)
    }

    /// Apply counter deltas against the freshly-loaded session record.
    /// Working from the persisted record keeps concurrent approve/reject
    /// bumps from being clobbered by a stale in-memory copy.
    async fn bump_counters(
        &self,
        session_id: Uuid,
        deltas: CounterDeltas,
    ) -> Result<ScrapeSession> {
        let mut session = db::sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session not found: {}", session_id)))?;

        session.processed_count += deltas.processed;
        session.approved_count += deltas.approved;
        session.rejected_count += deltas.rejected;
        session.error_count += deltas.errors;
        session.updated_at = Utc::now();

        db::sessions::save_session(&self.db, &session).await?;
        self.event_bus.emit_lossy(ReelEvent::SessionUpdated {
            session: session.clone(),
        });

        Ok(session)
    }

    /// Normal completion: batch exhausted with the slot still owned
    async fn finish_session(&self, session_id: Uuid) -> Result<()> {
        let mut session = db::sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Session not found: {}", session_id)))?;

        // A stop that raced the last reel already completed it
        if session.status.is_terminal() {
            return Ok(());
        }

        session.status = SessionStatus::Completed;
        session.updated_at = Utc::now();
        db::sessions::save_session(&self.db, &session).await?;
        self.event_bus
            .emit_lossy(ReelEvent::SessionUpdated { session });
        Ok(())
    }

    /// Batch fetch failed: fatal to this session
    async fn fail_session(&self, session_id: Uuid, cause: Error) {
        error!(session_id = %session_id, error = %cause, "Batch fetch failed, session is fatal");

        {
            let mut slot = self.active.write().await;
            if *slot == Some(session_id) {
                *slot = None;
            }
        }

        let result: Result<()> = async {
            let mut session = db::sessions::get_session(&self.db, session_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Session not found: {}", session_id)))?;

            // A stop or supersession that landed while the fetch was in
            // flight stands; a lame-duck task never resurrects a terminal
            // session
            if session.status.is_terminal() {
                info!(
                    session_id = %session_id,
                    status = session.status.as_str(),
                    "Batch fetch failed after session ended, leaving record as is"
                );
                return Ok(());
            }

            *self.last_error.write().await = Some(cause.to_string());

            session.status = SessionStatus::Error;
            session.error_count += 1;
            session.updated_at = Utc::now();
            db::sessions::save_session(&self.db, &session).await?;

            self.event_bus.emit_lossy(ReelEvent::SessionUpdated {
                session: session.clone(),
            });
            self.event_bus.emit_lossy(ReelEvent::FatalError {
                message: "Scrape session failed".to_string(),
                detail: Some(cause.to_string()),
            });
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!(session_id = %session_id, error = %e, "Failed to record session failure");
        }
    }
}
