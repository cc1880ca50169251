//! Per-question answer recording inside an open submission.
//!
//! Upserts are idempotent per (submission, question): re-saving replaces the
//! value and clears any earlier score so the next grading pass re-scores it.
//! Values are shape-checked against the question type before anything is
//! persisted.

use crate::context::EngineContext;
use crate::error::{is_unique_violation, EngineError};
use crate::submission_service::SubmissionService;
use db::models::answer::{self, AnswerValue};
use db::models::question::{self, QuestionType};
use db::repositories::answer_repository::AnswerRepository;
use db::repositories::question_repository::QuestionRepository;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};

pub struct AnswerLedger;

impl AnswerLedger {
    pub async fn upsert_answer(
        ctx: &EngineContext,
        submission_id: i64,
        question_id: i64,
        value: AnswerValue,
    ) -> Result<answer::Model, EngineError> {
        // Expire check runs first, so a stale InProgress row can never
        // accept another answer.
        let (_, submission) = SubmissionService::ensure_open(ctx, submission_id).await?;

        if !submission.question_ids().contains(&question_id) {
            return Err(EngineError::QuestionNotFound(question_id));
        }
        let question = QuestionRepository::find_by_id(&ctx.db, question_id)
            .await?
            .ok_or(EngineError::QuestionNotFound(question_id))?;
        validate_value(&question, &value)?;

        let now = ctx.clock.now();
        let txn = ctx.db.begin().await?;

        let saved = match AnswerRepository::find_for_question(&txn, submission_id, question_id).await? {
            Some(existing) => {
                let mut active: answer::ActiveModel = existing.into();
                active.value = Set(value.to_json());
                active.score = Set(None);
                active.is_auto_graded = Set(false);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => {
                let insert = answer::ActiveModel {
                    submission_id: Set(submission_id),
                    question_id: Set(question_id),
                    value: Set(value.to_json()),
                    score: Set(None),
                    is_auto_graded: Set(false),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await;
                match insert {
                    Ok(model) => model,
                    // Concurrent first save of the same question: fall back to
                    // replacing the row that won.
                    Err(err) if is_unique_violation(&err) => {
                        let existing =
                            AnswerRepository::find_for_question(&txn, submission_id, question_id)
                                .await?
                                .ok_or(EngineError::Db(err))?;
                        let mut active: answer::ActiveModel = existing.into();
                        active.value = Set(value.to_json());
                        active.score = Set(None);
                        active.is_auto_graded = Set(false);
                        active.updated_at = Set(now);
                        active.update(&txn).await?
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        txn.commit().await?;
        Ok(saved)
    }
}

fn validate_value(question: &question::Model, value: &AnswerValue) -> Result<(), EngineError> {
    let option_count = question.option_count() as u32;
    match (question.question_type, value) {
        (QuestionType::Essay, AnswerValue::Text(_)) => Ok(()),
        (QuestionType::FileUpload, AnswerValue::Files(files)) => {
            if files.is_empty() {
                Err(EngineError::InvalidAnswerValue(
                    "file upload answer needs at least one file reference".into(),
                ))
            } else {
                Ok(())
            }
        }
        (QuestionType::MultipleChoice | QuestionType::TrueFalse, AnswerValue::Selection(sel)) => {
            if sel.len() != 1 {
                return Err(EngineError::InvalidAnswerValue(
                    "single-select questions take exactly one option index".into(),
                ));
            }
            check_bounds(sel, option_count)
        }
        (QuestionType::Checkbox, AnswerValue::Selection(sel)) => {
            if sel.is_empty() {
                return Err(EngineError::InvalidAnswerValue(
                    "checkbox answers need at least one selected option".into(),
                ));
            }
            check_bounds(sel, option_count)
        }
        (question_type, _) => Err(EngineError::InvalidAnswerValue(format!(
            "value shape does not match a {question_type} question"
        ))),
    }
}

fn check_bounds(selection: &[u32], option_count: u32) -> Result<(), EngineError> {
    match selection.iter().find(|&&idx| idx >= option_count) {
        Some(idx) => Err(EngineError::InvalidAnswerValue(format!(
            "option index {idx} is outside 0..{option_count}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn question(question_type: QuestionType, options: usize) -> question::Model {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        let opts: Vec<String> = (0..options).map(|i| format!("opt{i}")).collect();
        question::Model {
            id: 1,
            assessment_id: 1,
            position: 0,
            question_type,
            prompt: "?".into(),
            weight: 1.0,
            options: if options > 0 { Some(serde_json::json!(opts)) } else { None },
            answer_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn selection_bounds_are_enforced() {
        let q = question(QuestionType::MultipleChoice, 3);
        assert!(validate_value(&q, &AnswerValue::Selection(vec![2])).is_ok());
        assert!(matches!(
            validate_value(&q, &AnswerValue::Selection(vec![3])),
            Err(EngineError::InvalidAnswerValue(_))
        ));
        assert!(matches!(
            validate_value(&q, &AnswerValue::Selection(vec![0, 1])),
            Err(EngineError::InvalidAnswerValue(_))
        ));
    }

    #[test]
    fn true_false_takes_one_of_two_indices() {
        let q = question(QuestionType::TrueFalse, 0);
        assert!(validate_value(&q, &AnswerValue::Selection(vec![1])).is_ok());
        assert!(validate_value(&q, &AnswerValue::Selection(vec![2])).is_err());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let q = question(QuestionType::Essay, 0);
        assert!(validate_value(&q, &AnswerValue::Text("ok".into())).is_ok());
        assert!(matches!(
            validate_value(&q, &AnswerValue::Selection(vec![0])),
            Err(EngineError::InvalidAnswerValue(_))
        ));

        let q = question(QuestionType::FileUpload, 0);
        assert!(validate_value(&q, &AnswerValue::Files(vec!["a.pdf".into()])).is_ok());
        assert!(validate_value(&q, &AnswerValue::Files(vec![])).is_err());
    }

    #[test]
    fn checkbox_allows_multi_select() {
        let q = question(QuestionType::Checkbox, 4);
        assert!(validate_value(&q, &AnswerValue::Selection(vec![0, 3])).is_ok());
        assert!(validate_value(&q, &AnswerValue::Selection(vec![])).is_err());
    }
}
