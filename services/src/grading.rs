//! Auto/manual grading and score aggregation.
//!
//! Choice questions score their full weight on an exact selection-set match
//! against the answer key, otherwise zero; essay and file-upload answers wait
//! for a human. The aggregate is always recomputed from the stored answer
//! scores, never adjusted incrementally, which makes re-grading and manual
//! corrections idempotent.

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::submission_service;
use chrono::{DateTime, Utc};
use db::events::DomainEvent;
use db::models::answer;
use db::models::assessment::{self, ReviewMode};
use db::models::question;
use db::models::submission::{self, SubmissionState};
use db::repositories::answer_repository::AnswerRepository;
use db::repositories::assessment_repository::AssessmentRepository;
use db::repositories::question_repository::QuestionRepository;
use db::repositories::submission_repository::SubmissionRepository;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, TransactionTrait};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeOutcome {
    /// Aggregate score with any late penalty already applied.
    pub score: f64,
    /// Sum of weights across this submission's question set.
    pub max_score: f64,
    /// Auto-gradable answers that earned full weight.
    pub correct_count: usize,
    /// Answers still waiting for a manual grade.
    pub pending_manual: usize,
}

impl GradeOutcome {
    pub fn fully_graded(&self) -> bool {
        self.pending_manual == 0
    }
}

/// Full weight iff the selection set equals the key set exactly. Subsets,
/// supersets and disjoint picks all score zero.
pub(crate) fn exact_match(answer: &answer::Model, question: &question::Model) -> bool {
    let key = question.answer_key_set();
    !key.is_empty() && answer.selection_set() == key
}

pub struct GradingPipeline;

impl GradingPipeline {
    /// Scores every auto-gradable answer in place. Answers carrying a manual
    /// correction (`is_auto_graded` cleared, score present) are left alone.
    async fn auto_grade<C: ConnectionTrait>(
        db: &C,
        questions: &HashMap<i64, question::Model>,
        submission_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let answers = AnswerRepository::list_for_submission(db, submission_id).await?;

        for ans in answers {
            let Some(q) = questions.get(&ans.question_id) else {
                continue;
            };
            if !q.question_type.is_auto_gradable() {
                continue;
            }
            if !ans.is_auto_graded && ans.score.is_some() {
                continue;
            }

            let earned = if exact_match(&ans, q) { q.weight } else { 0.0 };
            if ans.score == Some(earned) && ans.is_auto_graded {
                continue;
            }

            let mut active: answer::ActiveModel = ans.into();
            active.score = Set(Some(earned));
            active.is_auto_graded = Set(true);
            active.updated_at = Set(now);
            active.update(db).await?;
        }

        Ok(())
    }

    /// Recomputes the aggregate from all stored answer scores. Pure read plus
    /// arithmetic; the caller persists the result.
    async fn aggregate<C: ConnectionTrait>(
        db: &C,
        assessment: &assessment::Model,
        submission: &submission::Model,
    ) -> Result<GradeOutcome, EngineError> {
        let questions = Self::question_map(db, assessment, submission).await?;
        let answers = AnswerRepository::list_for_submission(db, submission.id).await?;

        let mut total = 0.0;
        let mut correct_count = 0;
        let mut pending_manual = 0;
        for ans in &answers {
            let Some(q) = questions.get(&ans.question_id) else {
                continue;
            };
            match ans.score {
                Some(score) => {
                    total += score;
                    if q.question_type.is_auto_gradable() && score == q.weight && q.weight > 0.0 {
                        correct_count += 1;
                    }
                }
                None => pending_manual += 1,
            }
        }

        // Applied to the freshly summed aggregate, so repeating the pipeline
        // can never compound the penalty.
        if submission.is_late {
            if let Some(pct) = assessment.late_penalty_percent {
                if pct > 0.0 {
                    total = (total * (1.0 - pct / 100.0)).max(0.0);
                }
            }
        }

        let max_score = questions.values().map(|q| q.weight).sum();
        Ok(GradeOutcome {
            score: total,
            max_score,
            correct_count,
            pending_manual,
        })
    }

    async fn question_map<C: ConnectionTrait>(
        db: &C,
        assessment: &assessment::Model,
        submission: &submission::Model,
    ) -> Result<HashMap<i64, question::Model>, EngineError> {
        let set = submission.question_ids();
        let questions = QuestionRepository::list_for_assessment(db, assessment.id).await?;
        Ok(questions
            .into_iter()
            .filter(|q| set.contains(&q.id))
            .map(|q| (q.id, q))
            .collect())
    }

    /// Grades a just-closed submission and moves it to its post-completion
    /// state. Runs inside the caller's transaction; the caller emits events
    /// after commit.
    pub async fn finalize<C: ConnectionTrait>(
        db: &C,
        assessment: &assessment::Model,
        submission: submission::Model,
        now: DateTime<Utc>,
    ) -> Result<(submission::Model, GradeOutcome), EngineError> {
        let questions = Self::question_map(db, assessment, &submission).await?;
        Self::auto_grade(db, &questions, submission.id, now).await?;
        let outcome = Self::aggregate(db, assessment, &submission).await?;

        let next_state = if submission.state.rank() <= 1 {
            if outcome.fully_graded() {
                SubmissionState::AutoGraded
            } else {
                SubmissionState::PendingManualGrading
            }
        } else {
            // Re-grade of an already-graded submission: never move backward.
            submission.state
        };

        let mut active: submission::ActiveModel = submission.into();
        active.score = Set(Some(outcome.score));
        active.state = Set(next_state);
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        Ok((updated, outcome))
    }

    /// Re-runs auto-grading and aggregation for a closed submission.
    /// Calling this twice without intervening edits yields the same score.
    pub async fn regrade(
        ctx: &EngineContext,
        submission_id: i64,
    ) -> Result<(submission::Model, GradeOutcome), EngineError> {
        let now = ctx.clock.now();
        let txn = ctx.db.begin().await?;

        let submission = SubmissionRepository::find_by_id(&txn, submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission_id))?;
        if submission.state.is_open() {
            return Err(EngineError::SubmissionNotGradable {
                submission_id,
                state: submission.state,
            });
        }
        let assessment = AssessmentRepository::find_by_id(&txn, submission.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(submission.assessment_id))?;

        let (updated, outcome) = Self::finalize(&txn, &assessment, submission, now).await?;
        txn.commit().await?;
        Ok((updated, outcome))
    }

    /// Writes a staff grade to one answer, then re-aggregates the whole
    /// submission. Safe to repeat; the aggregate is a pure function of the
    /// stored answer scores.
    pub async fn manual_grade(
        ctx: &EngineContext,
        answer_id: i64,
        score: f64,
        grader_id: i64,
    ) -> Result<submission::Model, EngineError> {
        let now = ctx.clock.now();

        let answer = AnswerRepository::find_by_id(&ctx.db, answer_id)
            .await?
            .ok_or(EngineError::AnswerNotFound(answer_id))?;
        let submission = SubmissionRepository::find_by_id(&ctx.db, answer.submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(answer.submission_id))?;
        let assessment = AssessmentRepository::find_by_id(&ctx.db, submission.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(submission.assessment_id))?;
        // An overdue open attempt settles into a gradable state here instead
        // of bouncing the grader.
        let submission =
            submission_service::SubmissionService::check_expiry(ctx, &assessment, submission)
                .await?;
        if submission.state.is_open() {
            return Err(EngineError::SubmissionNotGradable {
                submission_id: submission.id,
                state: submission.state,
            });
        }

        let txn = ctx.db.begin().await?;
        let question = QuestionRepository::find_by_id(&txn, answer.question_id)
            .await?
            .ok_or(EngineError::QuestionNotFound(answer.question_id))?;

        if !score.is_finite() || score < 0.0 || score > question.weight {
            return Err(EngineError::InvalidGrade(format!(
                "score {} outside 0..={} for question {}",
                score, question.weight, question.id
            )));
        }

        let mut active: answer::ActiveModel = answer.into();
        active.score = Set(Some(score));
        // A hand-written score is no longer the pipeline's; clearing the flag
        // protects it from the next auto-grade pass.
        active.is_auto_graded = Set(false);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        let outcome = Self::aggregate(&txn, &assessment, &submission).await?;
        let next_state = if outcome.fully_graded() {
            match submission.state {
                SubmissionState::Released => SubmissionState::Released,
                _ if assessment.review_mode == ReviewMode::Immediate => SubmissionState::Released,
                _ => SubmissionState::Graded,
            }
        } else {
            submission.state
        };

        let student_id = submission.student_id;
        let assessment_id = submission.assessment_id;
        let submission_id = submission.id;
        let previous_state = submission.state;

        let mut active: submission::ActiveModel = submission.into();
        active.score = Set(Some(outcome.score));
        active.state = Set(next_state);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "manual grade by {} on answer {}: submission {} -> {:.2}",
            grader_id,
            answer_id,
            submission_id,
            outcome.score
        );
        if outcome.fully_graded() {
            ctx.events.emit(DomainEvent::SubmissionGraded {
                submission_id,
                assessment_id,
                student_id,
                score: outcome.score,
                max_score: outcome.max_score,
                fully_graded: true,
                graded_at: now,
            });
        }
        if next_state == SubmissionState::Released && previous_state != SubmissionState::Released {
            ctx.events.emit(DomainEvent::ScoresReleased {
                submission_id,
                assessment_id,
                student_id,
                released_at: now,
            });
        }

        Ok(updated)
    }

    /// Per-question breakdown. Learners only see scores once visible under
    /// the review mode, and never see answer keys for `hidden` assessments.
    pub async fn grade_summary(
        ctx: &EngineContext,
        submission_id: i64,
        staff_view: bool,
    ) -> Result<GradeSummary, EngineError> {
        let db = &ctx.db;
        let submission = SubmissionRepository::find_by_id(db, submission_id)
            .await?
            .ok_or(EngineError::SubmissionNotFound(submission_id))?;
        let assessment = AssessmentRepository::find_by_id(db, submission.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(submission.assessment_id))?;
        let submission =
            submission_service::SubmissionService::check_expiry(ctx, &assessment, submission)
                .await?;

        let questions = Self::question_map(db, &assessment, &submission).await?;
        let answers: HashMap<i64, answer::Model> =
            AnswerRepository::list_for_submission(db, submission.id)
                .await?
                .into_iter()
                .map(|a| (a.question_id, a))
                .collect();

        let scores_visible =
            staff_view || submission_service::score_visible(&assessment, &submission);
        let key_visible = staff_view
            || (scores_visible && assessment.review_mode != ReviewMode::Hidden);

        let mut rows = Vec::new();
        for question_id in submission.question_ids() {
            let Some(q) = questions.get(&question_id) else {
                continue;
            };
            let answer = answers.get(&question_id);
            rows.push(QuestionGrade {
                question_id,
                prompt: q.prompt.clone(),
                weight: q.weight,
                score: if scores_visible {
                    answer.and_then(|a| a.score)
                } else {
                    None
                },
                is_auto_graded: answer.map(|a| a.is_auto_graded).unwrap_or(false),
                answer_key: if key_visible && q.question_type.is_auto_gradable() {
                    Some(q.answer_key())
                } else {
                    None
                },
            });
        }

        Ok(GradeSummary {
            submission_id: submission.id,
            state: submission.state,
            score: if scores_visible { submission.score } else { None },
            max_score: questions.values().map(|q| q.weight).sum(),
            questions: rows,
        })
    }
}

#[derive(Debug, Clone)]
pub struct QuestionGrade {
    pub question_id: i64,
    pub prompt: String,
    pub weight: f64,
    pub score: Option<f64>,
    pub is_auto_graded: bool,
    /// None when the viewer may not see the key.
    pub answer_key: Option<Vec<u32>>,
}

#[derive(Debug, Clone)]
pub struct GradeSummary {
    pub submission_id: i64,
    pub state: SubmissionState,
    pub score: Option<f64>,
    pub max_score: f64,
    pub questions: Vec<QuestionGrade>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use db::models::answer::AnswerValue;
    use db::models::question::QuestionType;

    fn question(key: Vec<u32>) -> question::Model {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        question::Model {
            id: 1,
            assessment_id: 1,
            position: 0,
            question_type: QuestionType::Checkbox,
            prompt: "Pick".into(),
            weight: 10.0,
            options: Some(serde_json::json!(["a", "b", "c"])),
            answer_key: Some(serde_json::json!(key)),
            created_at: now,
            updated_at: now,
        }
    }

    fn answer(selection: Vec<u32>) -> answer::Model {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        answer::Model {
            id: 1,
            submission_id: 1,
            question_id: 1,
            value: AnswerValue::Selection(selection).to_json(),
            score: None,
            is_auto_graded: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exact_match_requires_equal_sets() {
        let q = question(vec![0, 2]);
        assert!(exact_match(&answer(vec![0, 2]), &q));
        assert!(exact_match(&answer(vec![2, 0]), &q));
        // Subset, superset and disjoint all fail.
        assert!(!exact_match(&answer(vec![0]), &q));
        assert!(!exact_match(&answer(vec![0, 1, 2]), &q));
        assert!(!exact_match(&answer(vec![1]), &q));
        assert!(!exact_match(&answer(vec![]), &q));
    }

    #[test]
    fn empty_key_never_matches() {
        let q = question(vec![]);
        assert!(!exact_match(&answer(vec![]), &q));
    }
}
