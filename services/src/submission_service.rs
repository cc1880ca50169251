//! Submission lifecycle: open an attempt, close it (by hand or by the time
//! limit), release scores.
//!
//! Every transition moves forward only; the partial unique index on open
//! submissions is the backstop for two concurrent starts. Expiry is lazy:
//! any read that needs an open submission settles its time limit first.

use crate::attempt_policy::AttemptPolicy;
use crate::context::EngineContext;
use crate::error::{is_unique_violation, EngineError};
use crate::grading::GradingPipeline;
use crate::override_resolver::OverrideResolver;
use crate::randomizer;
use crate::window::{self, FinishClass};
use db::events::DomainEvent;
use db::models::assessment::{self, ReviewMode};
use db::models::submission::{self, SubmissionState};
use db::repositories::assessment_repository::AssessmentRepository;
use db::repositories::question_repository::QuestionRepository;
use db::repositories::submission_repository::SubmissionRepository;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};

/// Whether the learner may currently see their score for this submission.
/// Staff views bypass this at the call site.
pub fn score_visible(assessment: &assessment::Model, submission: &submission::Model) -> bool {
    match assessment.review_mode {
        ReviewMode::Immediate => submission.state.rank() >= 2 && submission.score.is_some(),
        ReviewMode::Deferred | ReviewMode::Hidden => {
            submission.state == SubmissionState::Released
        }
    }
}

pub struct SubmissionService;

impl SubmissionService {
    /// Opens a new attempt after the full admission check. Attempt numbers
    /// count closed attempts, so an expired attempt and its successor never
    /// share a number and the sequence has no gaps.
    pub async fn start_attempt(
        ctx: &EngineContext,
        assessment_id: i64,
        student_id: i64,
    ) -> Result<submission::Model, EngineError> {
        let now = ctx.clock.now();
        let assessment = AssessmentRepository::find_by_id(&ctx.db, assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        // An abandoned timed attempt must not block a new start: settle its
        // time limit first, so the policy only sees genuinely open attempts.
        if let Some(open) =
            SubmissionRepository::find_open(&ctx.db, assessment_id, student_id).await?
        {
            Self::check_expiry(ctx, &assessment, open).await?;
        }

        AttemptPolicy::can_start_attempt(
            &ctx.db,
            ctx.enrollment.as_ref(),
            &assessment,
            student_id,
            now,
        )
        .await?;

        let txn = ctx.db.begin().await?;
        let closed = SubmissionRepository::count_closed(&txn, assessment_id, student_id).await?;

        // The question set depends on the row id, so insert first and fill
        // the set in a second step inside the same transaction.
        let inserted = submission::ActiveModel {
            assessment_id: Set(assessment_id),
            student_id: Set(student_id),
            attempt_number: Set(closed as i32 + 1),
            state: Set(SubmissionState::InProgress),
            question_set: Set(serde_json::json!([])),
            started_at: Set(now),
            is_late: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let inserted = match inserted {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                // Lost a race against another start: report the attempt
                // that won.
                let open =
                    SubmissionRepository::find_open(&ctx.db, assessment_id, student_id).await?;
                return Err(match open {
                    Some(winner) => EngineError::AlreadyOpenAttempt {
                        submission_id: winner.id,
                    },
                    None => EngineError::Db(err),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let questions = QuestionRepository::list_for_assessment(&txn, assessment_id).await?;
        let set = randomizer::select_question_set(
            &assessment,
            &questions,
            randomizer::derive_seed(inserted.id),
        );

        let attempt_number = inserted.attempt_number;
        let mut active: submission::ActiveModel = inserted.into();
        active.question_set = Set(serde_json::json!(set));
        let submission = active.update(&txn).await?;
        txn.commit().await?;

        log::info!(
            "student {} opened attempt {} on assessment {} (submission {})",
            student_id,
            attempt_number,
            assessment_id,
            submission.id
        );
        ctx.events.emit(DomainEvent::AttemptStarted {
            submission_id: submission.id,
            assessment_id,
            student_id,
            attempt_number,
            started_at: now,
        });

        Ok(submission)
    }

    /// Settles the time limit for one submission. An overdue open attempt is
    /// closed as `expired` with `finished_at` pinned to start + limit (not to
    /// when we happened to notice), then graded. Anything already closed
    /// passes through untouched.
    pub async fn check_expiry(
        ctx: &EngineContext,
        assessment: &assessment::Model,
        submission: submission::Model,
    ) -> Result<submission::Model, EngineError> {
        if !submission.state.is_open() {
            return Ok(submission);
        }
        let Some(limit) = assessment.time_limit() else {
            return Ok(submission);
        };
        let now = ctx.clock.now();
        let cutoff = submission.started_at + limit;
        if now <= cutoff {
            return Ok(submission);
        }

        let txn = ctx.db.begin().await?;
        // Re-read under the transaction so a concurrent close wins cleanly.
        let fresh = SubmissionRepository::find_by_id(&txn, submission.id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission.id))?;
        if !fresh.state.is_open() {
            txn.rollback().await?;
            return Ok(fresh);
        }

        let extension =
            OverrideResolver::deadline_extension(&txn, assessment.id, fresh.student_id, cutoff)
                .await?;
        let is_late = window::is_late(assessment, extension.as_ref(), cutoff);

        let submission_id = fresh.id;
        let student_id = fresh.student_id;
        let mut active: submission::ActiveModel = fresh.into();
        active.state = Set(SubmissionState::Expired);
        active.finished_at = Set(Some(cutoff));
        active.is_late = Set(is_late);
        active.updated_at = Set(now);
        let expired = active.update(&txn).await?;

        let (graded, outcome) = GradingPipeline::finalize(&txn, assessment, expired, now).await?;
        txn.commit().await?;

        log::info!(
            "submission {} expired at {} (limit {} min)",
            submission_id,
            cutoff,
            limit.num_minutes()
        );
        ctx.events.emit(DomainEvent::SubmissionExpired {
            submission_id,
            assessment_id: assessment.id,
            student_id,
            finished_at: cutoff,
        });
        ctx.events.emit(DomainEvent::SubmissionGraded {
            submission_id,
            assessment_id: assessment.id,
            student_id,
            score: outcome.score,
            max_score: outcome.max_score,
            fully_graded: outcome.fully_graded(),
            graded_at: now,
        });

        Ok(graded)
    }

    /// Loads a submission that must still accept writes, settling expiry on
    /// the way. The returned pair is (assessment, open submission).
    pub async fn ensure_open(
        ctx: &EngineContext,
        submission_id: i64,
    ) -> Result<(assessment::Model, submission::Model), EngineError> {
        let submission = SubmissionRepository::find_by_id(&ctx.db, submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission_id))?;
        let assessment = AssessmentRepository::find_by_id(&ctx.db, submission.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(submission.assessment_id))?;

        let submission = Self::check_expiry(ctx, &assessment, submission).await?;
        if submission.state.is_open() {
            Ok((assessment, submission))
        } else {
            Err(EngineError::SubmissionNotOpen {
                submission_id,
                state: submission.state,
            })
        }
    }

    /// Learner hand-in. Completing an already-closed submission is a no-op
    /// returning the current record; finishing past deadline + tolerance is
    /// refused and the attempt stays open (expiry is the only path that
    /// closes it from there).
    pub async fn complete(
        ctx: &EngineContext,
        submission_id: i64,
    ) -> Result<submission::Model, EngineError> {
        let submission = SubmissionRepository::find_by_id(&ctx.db, submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission_id))?;
        let assessment = AssessmentRepository::find_by_id(&ctx.db, submission.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(submission.assessment_id))?;

        let submission = Self::check_expiry(ctx, &assessment, submission).await?;
        if submission.state.is_closed() {
            return Ok(submission);
        }

        let now = ctx.clock.now();
        let extension = OverrideResolver::deadline_extension(
            &ctx.db,
            assessment.id,
            submission.student_id,
            now,
        )
        .await?;
        let class = window::classify_finish(&assessment, extension.as_ref(), now);
        if class == FinishClass::BeyondTolerance {
            return Err(EngineError::OutsideWindow {
                assessment_id: assessment.id,
            });
        }
        let is_late = class == FinishClass::Late;

        let txn = ctx.db.begin().await?;
        let fresh = SubmissionRepository::find_by_id(&txn, submission.id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission.id))?;
        if fresh.state.is_closed() {
            txn.rollback().await?;
            return Ok(fresh);
        }

        let student_id = fresh.student_id;
        let attempt_number = fresh.attempt_number;
        let mut active: submission::ActiveModel = fresh.into();
        active.state = Set(SubmissionState::Submitted);
        active.submitted_at = Set(Some(now));
        active.finished_at = Set(Some(now));
        active.is_late = Set(is_late);
        active.updated_at = Set(now);
        let submitted = active.update(&txn).await?;

        let (graded, outcome) =
            GradingPipeline::finalize(&txn, &assessment, submitted, now).await?;

        // Immediate review shows scores as soon as the pipeline can settle
        // them in full.
        let released = assessment.review_mode == ReviewMode::Immediate && outcome.fully_graded();
        let graded = if released {
            let mut active: submission::ActiveModel = graded.into();
            active.state = Set(SubmissionState::Released);
            active.update(&txn).await?
        } else {
            graded
        };
        txn.commit().await?;

        log::info!(
            "submission {} completed by student {} ({}, score {:.2}/{:.2})",
            submission_id,
            student_id,
            if is_late { "late" } else { "on time" },
            outcome.score,
            outcome.max_score
        );
        ctx.events.emit(DomainEvent::SubmissionCompleted {
            submission_id,
            assessment_id: assessment.id,
            student_id,
            attempt_number,
            submitted_at: now,
            is_late,
        });
        ctx.events.emit(DomainEvent::SubmissionGraded {
            submission_id,
            assessment_id: assessment.id,
            student_id,
            score: outcome.score,
            max_score: outcome.max_score,
            fully_graded: outcome.fully_graded(),
            graded_at: now,
        });
        if released {
            ctx.events.emit(DomainEvent::ScoresReleased {
                submission_id,
                assessment_id: assessment.id,
                student_id,
                released_at: now,
            });
        }

        Ok(graded)
    }

    /// Staff release of a fully graded submission. Idempotent; refuses while
    /// manual grading is still outstanding.
    pub async fn release(
        ctx: &EngineContext,
        submission_id: i64,
    ) -> Result<submission::Model, EngineError> {
        let now = ctx.clock.now();
        let submission = SubmissionRepository::find_by_id(&ctx.db, submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission_id))?;

        if submission.state == SubmissionState::Released {
            return Ok(submission);
        }
        if !submission.state.can_transition_to(SubmissionState::Released)
            || submission.state == SubmissionState::PendingManualGrading
        {
            return Err(EngineError::SubmissionNotGradable {
                submission_id,
                state: submission.state,
            });
        }

        let student_id = submission.student_id;
        let assessment_id = submission.assessment_id;
        let mut active: submission::ActiveModel = submission.into();
        active.state = Set(SubmissionState::Released);
        active.updated_at = Set(now);
        let released = active.update(&ctx.db).await?;

        ctx.events.emit(DomainEvent::ScoresReleased {
            submission_id,
            assessment_id,
            student_id,
            released_at: now,
        });
        Ok(released)
    }

    /// Background pass over all open submissions; returns how many it
    /// expired. Complements the lazy per-read check so abandoned attempts
    /// still close without anyone touching them.
    pub async fn sweep_expired(ctx: &EngineContext) -> Result<usize, EngineError> {
        let open = SubmissionRepository::list_in_progress(&ctx.db).await?;
        let mut expired = 0;
        for submission in open {
            let Some(assessment) =
                AssessmentRepository::find_by_id(&ctx.db, submission.assessment_id).await?
            else {
                continue;
            };
            let settled = Self::check_expiry(ctx, &assessment, submission).await?;
            if settled.state.is_closed() {
                expired += 1;
            }
        }
        if expired > 0 {
            log::info!("expiry sweep closed {} submission(s)", expired);
        }
        Ok(expired)
    }
}
