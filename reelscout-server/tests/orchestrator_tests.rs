//! Session orchestrator integration tests
//!
//! Mock driver and engines over an in-memory SQLite database, exercising
//! the session state machine end to end: normal completion, per-reel error
//! isolation, cooperative stop, supersession, batch-fetch failure, and the
//! approve/reject paths.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use reelscout_common::models::{SessionStatus, Video, VideoStatus};
use reelscout_common::{Error, EventBus, Result};
use reelscout_server::db;
use reelscout_server::services::analysis::{
    AnalysisEngine, AnalysisResult, ReelSummary, ReplyEngine, ReplyResult,
};
use reelscout_server::services::driver::{AutomationDriver, RawReel};
use reelscout_server::services::{ConnectionManager, ReelAnalysisPipeline, SessionOrchestrator};

struct MockDriver {
    reels: Vec<RawReel>,
    fail_batch: bool,
    batch_delay: Duration,
    post_ok: bool,
}

impl MockDriver {
    fn with_reels(count: usize) -> Self {
        Self {
            reels: (0..count).map(raw_reel).collect(),
            fail_batch: false,
            batch_delay: Duration::ZERO,
            post_ok: true,
        }
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_batch(&self, _query: &str, count: u32) -> Result<Vec<RawReel>> {
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
        if self.fail_batch {
            return Err(Error::BatchFetch("device screen went dark".to_string()));
        }
        Ok(self.reels.iter().take(count as usize).cloned().collect())
    }

    async fn fetch_comments(&self, _external_id: &str, _max: u32) -> Result<Vec<String>> {
        Ok(vec!["nice one".to_string(), "love this".to_string()])
    }

    async fn post_comment(&self, _external_id: &str, _text: &str) -> Result<bool> {
        Ok(self.post_ok)
    }
}

struct MockAnalysis {
    score: u8,
    fail_on: HashSet<usize>,
    calls: AtomicUsize,
}

impl MockAnalysis {
    fn scoring(score: u8) -> Self {
        Self {
            score,
            fail_on: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(indices: &[usize]) -> Self {
        Self {
            score: 7,
            fail_on: indices.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AnalysisEngine for MockAnalysis {
    async fn analyze(
        &self,
        _summary: &ReelSummary,
        _sampled_comments: &[String],
        _prompt: &str,
    ) -> Result<AnalysisResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            return Err(Error::Analysis("model returned garbage".to_string()));
        }
        Ok(AnalysisResult {
            relevance_score: self.score,
            reasoning: "on topic".to_string(),
            topics: vec!["jobs".to_string()],
            engagement_potential: 6,
        })
    }
}

struct MockReply;

#[async_trait]
impl ReplyEngine for MockReply {
    async fn generate(
        &self,
        _summary: &ReelSummary,
        _topics: &[String],
        _sampled_comments: &[String],
        _prompt: &str,
    ) -> Result<ReplyResult> {
        Ok(ReplyResult {
            text: "Great insight, thanks for sharing!".to_string(),
            confidence: 0.9,
        })
    }
}

/// One shared connection so every query sees the same in-memory database
async fn memory_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

fn raw_reel(n: usize) -> RawReel {
    RawReel {
        external_id: format!("reel-{}", n),
        title: format!("Reel {}", n),
        thumbnail_ref: None,
        likes_raw: "1.2K".to_string(),
        comments_raw: "34".to_string(),
        shares_raw: "5".to_string(),
    }
}

async fn setup(
    driver: Arc<dyn AutomationDriver>,
    analysis: Arc<dyn AnalysisEngine>,
) -> (SessionOrchestrator, SqlitePool) {
    let pool = memory_pool().await;
    db::init_schema(&pool).await.unwrap();

    let event_bus = EventBus::new(256);
    let connection = Arc::new(ConnectionManager::new(
        pool.clone(),
        event_bus.clone(),
        driver.clone(),
        "localhost".to_string(),
        4723,
    ));
    connection.connect().await.unwrap();

    let pipeline = Arc::new(ReelAnalysisPipeline::new(
        driver.clone(),
        analysis,
        Arc::new(MockReply),
    ));
    let orchestrator = SessionOrchestrator::new(
        pool.clone(),
        event_bus,
        driver,
        pipeline,
        connection,
        Arc::new(RwLock::new(None)),
    );

    (orchestrator, pool)
}

/// Poll until the session reaches a terminal status
async fn wait_for_terminal(pool: &SqlitePool, session_id: Uuid) {
    for _ in 0..250 {
        let session = db::sessions::get_session(pool, session_id)
            .await
            .unwrap()
            .unwrap();
        if session.status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session {} never reached a terminal status", session_id);
}

/// Insert a pending video with an optional generated comment
async fn insert_pending_video(
    pool: &SqlitePool,
    session_id: Uuid,
    generated_comment: Option<&str>,
) -> Video {
    let now = chrono::Utc::now();
    let video = Video {
        id: Uuid::new_v4(),
        session_id,
        url: "reel-manual".to_string(),
        title: "Manual".to_string(),
        thumbnail: None,
        likes: 100,
        comments: 10,
        shares: 1,
        status: VideoStatus::Pending,
        relevance_score: Some(8),
        generated_comment: generated_comment.map(String::from),
        posted_comment: None,
        error_message: None,
        extracted_comments: vec![],
        analysis_data: None,
        created_at: now,
        updated_at: now,
    };
    db::videos::save_video(pool, &video).await.unwrap();
    video
}

#[tokio::test]
async fn full_batch_produces_pending_videos_and_completes() {
    let driver = Arc::new(MockDriver::with_reels(3));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 3).await.unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    wait_for_terminal(&pool, session.id).await;

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.processed_count, 3);
    assert_eq!(session.error_count, 0);

    let videos = db::videos::list_session_videos(&pool, session.id)
        .await
        .unwrap();
    assert_eq!(videos.len(), 3);
    for video in &videos {
        assert_eq!(video.status, VideoStatus::Pending);
        assert_eq!(video.relevance_score, Some(7));
        assert!(video.generated_comment.is_some());
        // Engagement counts normalized from on-screen form
        assert_eq!(video.likes, 1200);
        assert_eq!(video.comments, 34);
    }
}

#[tokio::test]
async fn analysis_failure_on_one_reel_does_not_abort_the_session() {
    let driver = Arc::new(MockDriver::with_reels(2));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::failing_on(&[0]))).await;

    let session = orchestrator.start_session("jobs", 2).await.unwrap();
    wait_for_terminal(&pool, session.id).await;

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.processed_count, 2);
    assert_eq!(session.error_count, 1);

    let videos = db::videos::list_session_videos(&pool, session.id)
        .await
        .unwrap();
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].status, VideoStatus::Error);
    assert!(videos[0]
        .error_message
        .as_deref()
        .is_some_and(|m| !m.is_empty()));
    assert_eq!(videos[1].status, VideoStatus::Pending);
}

#[tokio::test]
async fn immediate_stop_freezes_processed_count() {
    let driver = Arc::new(MockDriver {
        batch_delay: Duration::from_millis(300),
        ..MockDriver::with_reels(5)
    });
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 5).await.unwrap();
    let stopped = orchestrator.stop_session(session.id).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Completed);

    // Give the background task time to observe the cleared slot
    tokio::time::sleep(Duration::from_millis(600)).await;

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.processed_count, 0);
}

#[tokio::test]
async fn stop_during_failing_batch_fetch_leaves_session_completed() {
    let driver = Arc::new(MockDriver {
        fail_batch: true,
        batch_delay: Duration::from_millis(300),
        ..MockDriver::with_reels(0)
    });
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 3).await.unwrap();
    let stopped = orchestrator.stop_session(session.id).await.unwrap();
    assert_eq!(stopped.status, SessionStatus::Completed);

    // Let the in-flight fetch fail after the stop landed
    tokio::time::sleep(Duration::from_millis(600)).await;

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.error_count, 0);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let driver = Arc::new(MockDriver::with_reels(1));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 1).await.unwrap();
    wait_for_terminal(&pool, session.id).await;

    let first = orchestrator.stop_session(session.id).await.unwrap();
    let second = orchestrator.stop_session(session.id).await.unwrap();
    assert_eq!(first.status, SessionStatus::Completed);
    assert_eq!(second.status, SessionStatus::Completed);
}

#[tokio::test]
async fn stopping_an_unknown_session_is_not_found() {
    let driver = Arc::new(MockDriver::with_reels(0));
    let (orchestrator, _pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let result = orchestrator.stop_session(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn starting_a_second_session_completes_the_first() {
    let driver = Arc::new(MockDriver {
        batch_delay: Duration::from_millis(200),
        ..MockDriver::with_reels(2)
    });
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let first = orchestrator.start_session("jobs", 2).await.unwrap();
    let second = orchestrator.start_session("hiring", 2).await.unwrap();

    wait_for_terminal(&pool, second.id).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let first = db::sessions::get_session(&pool, first.id)
        .await
        .unwrap()
        .unwrap();
    let second = db::sessions::get_session(&pool, second.id)
        .await
        .unwrap()
        .unwrap();

    // The superseded session stays completed with frozen counters
    assert_eq!(first.status, SessionStatus::Completed);
    assert_eq!(first.processed_count, 0);
    assert_eq!(second.status, SessionStatus::Completed);
    assert_eq!(second.processed_count, 2);

    // At most one session was ever running; none remain
    assert!(db::sessions::get_active_session(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn empty_query_and_zero_count_are_rejected() {
    let driver = Arc::new(MockDriver::with_reels(1));
    let (orchestrator, _pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    assert!(matches!(
        orchestrator.start_session("   ", 3).await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        orchestrator.start_session("jobs", 0).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn batch_fetch_failure_is_session_fatal() {
    let driver = Arc::new(MockDriver {
        fail_batch: true,
        ..MockDriver::with_reels(0)
    });
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 3).await.unwrap();
    wait_for_terminal(&pool, session.id).await;

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Error);
    assert_eq!(session.error_count, 1);
    assert_eq!(session.processed_count, 0);
    assert_eq!(orchestrator.active_session_id().await, None);
}

#[tokio::test]
async fn approve_without_generated_comment_changes_nothing() {
    let driver = Arc::new(MockDriver::with_reels(1));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 1).await.unwrap();
    wait_for_terminal(&pool, session.id).await;
    let video = insert_pending_video(&pool, session.id, None).await;

    let result = orchestrator.approve_video(video.id).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let unchanged = db::videos::get_video(&pool, video.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, VideoStatus::Pending);
    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.approved_count, 0);
}

#[tokio::test]
async fn approve_posts_comment_and_bumps_owning_session() {
    let driver = Arc::new(MockDriver::with_reels(1));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 1).await.unwrap();
    wait_for_terminal(&pool, session.id).await;
    let video = insert_pending_video(&pool, session.id, Some("Great reel!")).await;

    let approved = orchestrator.approve_video(video.id).await.unwrap();
    assert_eq!(approved.status, VideoStatus::Posted);
    assert_eq!(approved.posted_comment.as_deref(), Some("Great reel!"));

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.approved_count, 1);
}

#[tokio::test]
async fn refused_post_marks_video_error() {
    let driver = Arc::new(MockDriver {
        post_ok: false,
        ..MockDriver::with_reels(1)
    });
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 1).await.unwrap();
    wait_for_terminal(&pool, session.id).await;
    let video = insert_pending_video(&pool, session.id, Some("Great reel!")).await;

    let result = orchestrator.approve_video(video.id).await.unwrap();
    assert_eq!(result.status, VideoStatus::Error);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Failed to post comment or comments disabled")
    );
    assert!(result.posted_comment.is_none());
}

#[tokio::test]
async fn reject_records_default_reason_and_bumps_counter() {
    let driver = Arc::new(MockDriver::with_reels(1));
    let (orchestrator, pool) = setup(driver, Arc::new(MockAnalysis::scoring(7))).await;

    let session = orchestrator.start_session("jobs", 1).await.unwrap();
    wait_for_terminal(&pool, session.id).await;
    let video = insert_pending_video(&pool, session.id, Some("Great reel!")).await;

    let rejected = orchestrator.reject_video(video.id, None).await.unwrap();
    assert_eq!(rejected.status, VideoStatus::Rejected);
    assert_eq!(rejected.error_message.as_deref(), Some("Rejected by user"));

    let session = db::sessions::get_session(&pool, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.rejected_count, 1);
}

#[tokio::test]
async fn stale_running_sessions_are_marked_error_at_boot() {
    let pool = memory_pool().await;
    db::init_schema(&pool).await.unwrap();

    let stale = reelscout_common::models::ScrapeSession::new("jobs".to_string(), 3);
    db::sessions::save_session(&pool, &stale).await.unwrap();

    // Simulates a restart: schema init reconciles leftover running sessions
    db::init_schema(&pool).await.unwrap();

    let session = db::sessions::get_session(&pool, stale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Error);
}
