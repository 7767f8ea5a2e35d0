//! Practice-session lifecycle: `recording -> processing -> ready | error`.
//!
//! The `recording -> processing` step is a conditional update, so exactly one
//! finalize call per session gets to run the analysis. No transaction is held
//! while the recording is fetched and analyzed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::repositories::practice_repository::PracticeRepository;
use crate::db::repositories::session_repository::SessionRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::rewards::RewardOutcome;
use crate::models::session::{PracticeSession, SessionRecord, SessionState};
use crate::services::analysis_pipeline::AnalysisPipeline;
use crate::services::composite_scorer::ScoreBreakdown;
use crate::services::feedback_composer::summary_line;
use crate::services::reward_service::RewardService;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedSession {
    pub session: PracticeSession,
    /// One-line digest of the metrics.
    pub summary: String,
    pub breakdown: ScoreBreakdown,
    pub rewards: RewardOutcome,
}

#[derive(Clone)]
pub struct SessionService {
    db: DbPool,
    pipeline: AnalysisPipeline,
    rewards: RewardService,
}

impl SessionService {
    pub fn new(db: DbPool, pipeline: AnalysisPipeline) -> Self {
        let rewards = RewardService::new(db.clone());
        Self {
            db,
            pipeline,
            rewards,
        }
    }

    pub fn start(&self, user_id: i64) -> AppResult<SessionRecord> {
        let now = Utc::now().to_rfc3339();
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            state: SessionState::Recording,
            source_ref: None,
            error_message: None,
            started_at: now.clone(),
            updated_at: now,
        };

        self.db
            .with_connection(|conn| SessionRepository::insert(conn, &record))?;
        info!(target: "app::session", session_id = %record.id, user_id, "practice session started");
        Ok(record)
    }

    pub fn get(&self, session_id: &str) -> AppResult<SessionRecord> {
        self.db
            .with_connection(|conn| SessionRepository::find_by_id(conn, session_id))
    }

    pub async fn finalize(&self, session_id: &str, source_ref: &str) -> AppResult<FinalizedSession> {
        self.finalize_at(session_id, source_ref, Utc::now()).await
    }

    /// Claims the session, analyzes the recording and stores the result.
    /// A second call for the same session fails with [`AppError::Conflict`].
    pub async fn finalize_at(
        &self,
        session_id: &str,
        source_ref: &str,
        now: DateTime<Utc>,
    ) -> AppResult<FinalizedSession> {
        let record = self.get(session_id)?;
        let stamp = now.to_rfc3339();

        let claimed = self.db.with_connection(|conn| {
            SessionRepository::transition(
                conn,
                session_id,
                SessionState::Recording,
                SessionState::Processing,
                Some(source_ref),
                None,
                &stamp,
            )
        })?;
        if !claimed {
            warn!(target: "app::session", session_id, "finalize rejected, session already claimed");
            return Err(AppError::conflict(format!(
                "session {session_id} is already being processed or finalized"
            )));
        }

        let outcome = match self.pipeline.run(source_ref).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(target: "app::session", session_id, error = %err, "analysis failed");
                self.mark_failed(session_id, &err)?;
                return Err(err);
            }
        };

        let session = PracticeSession {
            id: record.id.clone(),
            user_id: record.user_id,
            timestamp: now,
            metrics: outcome.metrics,
            overall_score: outcome.overall_score,
            generated_comment: outcome.generated_comment,
        };

        let stored = self.db.with_transaction(|conn| {
            PracticeRepository::insert(conn, &session)?;
            let ready = SessionRepository::transition(
                conn,
                session_id,
                SessionState::Processing,
                SessionState::Ready,
                None,
                None,
                &stamp,
            )?;
            if !ready {
                return Err(AppError::conflict(format!(
                    "session {session_id} left processing before its result was stored"
                )));
            }
            Ok(())
        });
        if let Err(err) = stored {
            error!(target: "app::session", session_id, error = %err, "storing the result failed");
            self.mark_failed(session_id, &err)?;
            return Err(err);
        }

        info!(
            target: "app::session",
            session_id,
            user_id = record.user_id,
            overall = %session.overall_score,
            "practice session ready"
        );

        let rewards = self.rewards.process_finalized(&session, now)?;

        Ok(FinalizedSession {
            summary: summary_line(&session.metrics),
            session,
            breakdown: outcome.breakdown,
            rewards,
        })
    }

    /// Moves a claimed session to `error`. A session that already left
    /// `processing` is left as it is.
    fn mark_failed(&self, session_id: &str, err: &AppError) -> AppResult<()> {
        let message = err.to_string();
        let failed_at = Utc::now().to_rfc3339();
        let moved = self.db.with_connection(|conn| {
            SessionRepository::transition(
                conn,
                session_id,
                SessionState::Processing,
                SessionState::Error,
                None,
                Some(&message),
                &failed_at,
            )
        })?;
        if !moved {
            warn!(target: "app::session", session_id, "session was no longer processing");
        }
        Ok(())
    }
}
