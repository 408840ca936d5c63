//! Per-reel analysis pipeline
//!
//! For one scraped reel: fetch its comments through the driver, run the
//! analysis engine, then the reply engine. Any failure surfaces as an error
//! to the orchestrator, which records it against that reel and moves on.

use serde_json::json;
use std::sync::Arc;

use reelscout_common::engagement::parse_count;
use reelscout_common::models::{Prompt, PromptKind};
use reelscout_common::{Error, Result};

use crate::services::analysis::{AnalysisEngine, ReelSummary, ReplyEngine, ReplyResult};
use crate::services::driver::{AutomationDriver, RawReel};

/// Comments extracted per reel
const MAX_COMMENTS: u32 = 50;
/// Comments shown to the analysis engine
const ANALYSIS_SAMPLE: usize = 10;
/// Comments shown to the reply engine
const REPLY_SAMPLE: usize = 5;

/// Everything the pipeline produced for one reel
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Relevance score in [1, 10]
    pub score: u8,
    pub topics: Vec<String>,
    pub reply: ReplyResult,
    /// All extracted comments, in on-screen order
    pub comments: Vec<String>,
    /// Structured analysis payload for the dashboard
    pub analysis: serde_json::Value,
}

/// Runs the comment-fetch → analyze → generate sequence for one reel
pub struct ReelAnalysisPipeline {
    driver: Arc<dyn AutomationDriver>,
    analysis_engine: Arc<dyn AnalysisEngine>,
    reply_engine: Arc<dyn ReplyEngine>,
}

impl ReelAnalysisPipeline {
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        analysis_engine: Arc<dyn AnalysisEngine>,
        reply_engine: Arc<dyn ReplyEngine>,
    ) -> Self {
        Self {
            driver,
            analysis_engine,
            reply_engine,
        }
    }

    /// Process one reel. Both prompt kinds must be configured and active.
    pub async fn process(
        &self,
        raw: &RawReel,
        analysis_prompt: Option<&Prompt>,
        comment_prompt: Option<&Prompt>,
    ) -> Result<PipelineOutcome> {
        let analysis_prompt = require_active(analysis_prompt, PromptKind::Analysis)?;
        let comment_prompt = require_active(comment_prompt, PromptKind::Comment)?;

        let comments = self
            .driver
            .fetch_comments(&raw.external_id, MAX_COMMENTS)
            .await?;

        let summary = ReelSummary {
            title: raw.title.clone(),
            likes: parse_count(&raw.likes_raw),
            comments: parse_count(&raw.comments_raw),
            shares: parse_count(&raw.shares_raw),
        };

        let sample = &comments[..comments.len().min(ANALYSIS_SAMPLE)];
        let analysis = self
            .analysis_engine
            .analyze(&summary, sample, &analysis_prompt.prompt)
            .await?;

        let sample = &comments[..comments.len().min(REPLY_SAMPLE)];
        let reply = self
            .reply_engine
            .generate(&summary, &analysis.topics, sample, &comment_prompt.prompt)
            .await?;

        let analysis_payload = json!({
            "relevanceScore": analysis.relevance_score,
            "reasoning": analysis.reasoning,
            "topics": analysis.topics,
            "engagementPotential": analysis.engagement_potential,
            "replyConfidence": reply.confidence,
        });

        Ok(PipelineOutcome {
            score: analysis.relevance_score,
            topics: analysis.topics,
            reply,
            comments,
            analysis: analysis_payload,
        })
    }
}

fn require_active(prompt: Option<&Prompt>, kind: PromptKind) -> Result<&Prompt> {
    match prompt {
        Some(p) if p.is_active => Ok(p),
        _ => Err(Error::Analysis(format!(
            "No active {} prompt configured",
            kind.as_str()
        ))),
    }
}
