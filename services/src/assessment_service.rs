//! Authoring side: assessment creation, question management and the publish
//! gate. Publish is where data-integrity problems (missing weights, broken
//! answer keys) are rejected, so they can never reach a live submission.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use db::models::assessment::{self, RandomizationType, ReviewMode, ScopeType, Status};
use db::models::question::{self, QuestionType};
use db::repositories::assessment_repository::AssessmentRepository;
use db::repositories::question_repository::QuestionRepository;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, ModelTrait, Set};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Cached max score per assessment id, invalidated on every question write.
#[derive(Debug, Clone, Default)]
pub struct MaxScoreCache {
    inner: Arc<RwLock<HashMap<i64, f64>>>,
}

impl MaxScoreCache {
    pub async fn max_score<C: ConnectionTrait>(
        &self,
        db: &C,
        assessment_id: i64,
    ) -> Result<f64, EngineError> {
        let cached = self.inner.read().unwrap().get(&assessment_id).copied();
        if let Some(total) = cached {
            return Ok(total);
        }

        let questions = QuestionRepository::list_for_assessment(db, assessment_id).await?;
        let total = questions.iter().map(|q| q.weight).sum();
        self.inner.write().unwrap().insert(assessment_id, total);
        Ok(total)
    }

    pub fn invalidate(&self, assessment_id: i64) {
        self.inner.write().unwrap().remove(&assessment_id);
    }
}

#[derive(Debug, Clone)]
pub struct CreateAssessment {
    pub course_id: i64,
    pub scope_type: ScopeType,
    pub scope_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub available_from: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub tolerance_minutes: i64,
    pub time_limit_minutes: Option<i64>,
    pub max_attempts: Option<i32>,
    pub cooldown_minutes: i64,
    pub retake_enabled: bool,
    pub review_mode: ReviewMode,
    pub late_penalty_percent: Option<f64>,
    pub randomization: RandomizationType,
    pub question_bank_count: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateAssessment {
    pub title: Option<String>,
    pub description: Option<String>,
    pub available_from: Option<Option<DateTime<Utc>>>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub tolerance_minutes: Option<i64>,
    pub time_limit_minutes: Option<Option<i64>>,
    pub max_attempts: Option<Option<i32>>,
    pub cooldown_minutes: Option<i64>,
    pub retake_enabled: Option<bool>,
    pub review_mode: Option<ReviewMode>,
    pub late_penalty_percent: Option<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct CreateQuestion {
    pub assessment_id: i64,
    pub question_type: QuestionType,
    pub prompt: String,
    pub weight: f64,
    pub options: Option<Vec<String>>,
    pub answer_key: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateQuestion {
    pub prompt: Option<String>,
    pub weight: Option<f64>,
    pub options: Option<Vec<String>>,
    pub answer_key: Option<Vec<u32>>,
}

pub struct AssessmentService;

impl AssessmentService {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        params: CreateAssessment,
        now: DateTime<Utc>,
    ) -> Result<assessment::Model, EngineError> {
        let model = assessment::ActiveModel {
            course_id: Set(params.course_id),
            scope_type: Set(params.scope_type),
            scope_id: Set(params.scope_id),
            title: Set(params.title),
            description: Set(params.description),
            status: Set(Status::Draft),
            available_from: Set(params.available_from),
            deadline: Set(params.deadline),
            tolerance_minutes: Set(params.tolerance_minutes.max(0)),
            time_limit_minutes: Set(params.time_limit_minutes),
            max_attempts: Set(params.max_attempts),
            cooldown_minutes: Set(params.cooldown_minutes.max(0)),
            retake_enabled: Set(params.retake_enabled),
            review_mode: Set(params.review_mode),
            late_penalty_percent: Set(params.late_penalty_percent),
            randomization: Set(params.randomization),
            question_bank_count: Set(params.question_bank_count),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(model)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        params: UpdateAssessment,
        now: DateTime<Utc>,
    ) -> Result<assessment::Model, EngineError> {
        let existing = AssessmentRepository::find_by_id(db, assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        let mut active: assessment::ActiveModel = existing.into();
        if let Some(title) = params.title {
            active.title = Set(title);
        }
        if let Some(description) = params.description {
            active.description = Set(Some(description));
        }
        if let Some(available_from) = params.available_from {
            active.available_from = Set(available_from);
        }
        if let Some(deadline) = params.deadline {
            active.deadline = Set(deadline);
        }
        if let Some(tolerance) = params.tolerance_minutes {
            active.tolerance_minutes = Set(tolerance.max(0));
        }
        if let Some(limit) = params.time_limit_minutes {
            active.time_limit_minutes = Set(limit);
        }
        if let Some(max_attempts) = params.max_attempts {
            active.max_attempts = Set(max_attempts);
        }
        if let Some(cooldown) = params.cooldown_minutes {
            active.cooldown_minutes = Set(cooldown.max(0));
        }
        if let Some(retake) = params.retake_enabled {
            active.retake_enabled = Set(retake);
        }
        if let Some(review_mode) = params.review_mode {
            active.review_mode = Set(review_mode);
        }
        if let Some(penalty) = params.late_penalty_percent {
            active.late_penalty_percent = Set(penalty);
        }
        active.updated_at = Set(now);

        Ok(active.update(db).await?)
    }

    pub async fn add_question<C: ConnectionTrait>(
        db: &C,
        cache: &MaxScoreCache,
        params: CreateQuestion,
        now: DateTime<Utc>,
    ) -> Result<question::Model, EngineError> {
        AssessmentRepository::find_by_id(db, params.assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(params.assessment_id))?;

        let position =
            QuestionRepository::list_for_assessment(db, params.assessment_id).await?.len() as i32;

        let model = question::ActiveModel {
            assessment_id: Set(params.assessment_id),
            position: Set(position),
            question_type: Set(params.question_type),
            prompt: Set(params.prompt),
            weight: Set(params.weight),
            options: Set(params.options.map(|o| serde_json::json!(o))),
            answer_key: Set(params.answer_key.map(|k| serde_json::json!(k))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        cache.invalidate(params.assessment_id);
        Ok(model)
    }

    pub async fn update_question<C: ConnectionTrait>(
        db: &C,
        cache: &MaxScoreCache,
        question_id: i64,
        params: UpdateQuestion,
        now: DateTime<Utc>,
    ) -> Result<question::Model, EngineError> {
        let existing = QuestionRepository::find_by_id(db, question_id)
            .await?
            .ok_or(EngineError::QuestionNotFound(question_id))?;
        let assessment_id = existing.assessment_id;

        let mut active: question::ActiveModel = existing.into();
        if let Some(prompt) = params.prompt {
            active.prompt = Set(prompt);
        }
        if let Some(weight) = params.weight {
            active.weight = Set(weight);
        }
        if let Some(options) = params.options {
            active.options = Set(Some(serde_json::json!(options)));
        }
        if let Some(key) = params.answer_key {
            active.answer_key = Set(Some(serde_json::json!(key)));
        }
        active.updated_at = Set(now);

        let model = active.update(db).await?;
        cache.invalidate(assessment_id);
        Ok(model)
    }

    pub async fn remove_question<C: ConnectionTrait>(
        db: &C,
        cache: &MaxScoreCache,
        question_id: i64,
    ) -> Result<(), EngineError> {
        let existing = QuestionRepository::find_by_id(db, question_id)
            .await?
            .ok_or(EngineError::QuestionNotFound(question_id))?;
        let assessment_id = existing.assessment_id;

        existing.delete(db).await?;
        cache.invalidate(assessment_id);
        Ok(())
    }

    /// The publish gate. A question set that fails these checks would make
    /// grading arithmetic fail later, so it is rejected here instead.
    /// Publishing an already-published assessment is a no-op.
    pub async fn publish<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<assessment::Model, EngineError> {
        let existing = AssessmentRepository::find_by_id(db, assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        match existing.status {
            Status::Published => return Ok(existing),
            Status::Archived => {
                return Err(EngineError::NotPublishable(
                    "archived assessments cannot be published".into(),
                ));
            }
            Status::Draft => {}
        }

        let questions = QuestionRepository::list_for_assessment(db, assessment_id).await?;
        if questions.is_empty() {
            return Err(EngineError::NotPublishable("assessment has no questions".into()));
        }
        for q in &questions {
            validate_question(q)?;
        }

        let mut active: assessment::ActiveModel = existing.into();
        active.status = Set(Status::Published);
        active.updated_at = Set(now);
        let published = active.update(db).await?;

        log::info!("published assessment {} with {} questions", assessment_id, questions.len());
        Ok(published)
    }

    pub async fn archive<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        now: DateTime<Utc>,
    ) -> Result<assessment::Model, EngineError> {
        let existing = AssessmentRepository::find_by_id(db, assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        if existing.status == Status::Archived {
            return Ok(existing);
        }

        let mut active: assessment::ActiveModel = existing.into();
        active.status = Set(Status::Archived);
        active.updated_at = Set(now);
        Ok(active.update(db).await?)
    }

    /// Hard-deletes a drafted assessment and its questions; published
    /// assessments are archived, never deleted.
    pub async fn delete_draft<C: ConnectionTrait>(
        db: &C,
        cache: &MaxScoreCache,
        assessment_id: i64,
    ) -> Result<(), EngineError> {
        let existing = AssessmentRepository::find_by_id(db, assessment_id)
            .await?
            .ok_or(EngineError::AssessmentNotFound(assessment_id))?;

        if existing.status != Status::Draft {
            return Err(EngineError::NotPublishable(
                "only draft assessments can be deleted".into(),
            ));
        }

        db::models::Assessment::delete_by_id(assessment_id).exec(db).await?;
        cache.invalidate(assessment_id);
        Ok(())
    }
}

fn validate_question(q: &question::Model) -> Result<(), EngineError> {
    if !q.weight.is_finite() || q.weight <= 0.0 {
        return Err(EngineError::NotPublishable(format!(
            "question {} has a non-positive weight",
            q.id
        )));
    }

    if q.question_type.requires_options() && q.option_count() < 2 {
        return Err(EngineError::NotPublishable(format!(
            "question {} needs at least two options",
            q.id
        )));
    }

    if q.question_type.is_auto_gradable() {
        let key = q.answer_key();
        if key.is_empty() {
            return Err(EngineError::NotPublishable(format!(
                "question {} is auto-gradable but has no answer key",
                q.id
            )));
        }
        let option_count = q.option_count() as u32;
        if key.iter().any(|&idx| idx >= option_count) {
            return Err(EngineError::NotPublishable(format!(
                "question {} has answer key indices outside its options",
                q.id
            )));
        }
        let single_select = matches!(
            q.question_type,
            QuestionType::MultipleChoice | QuestionType::TrueFalse
        );
        if single_select && key.len() != 1 {
            return Err(EngineError::NotPublishable(format!(
                "question {} must have exactly one keyed option",
                q.id
            )));
        }
    }

    Ok(())
}
