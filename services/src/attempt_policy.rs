//! Gate for starting a new attempt. Checks run in a fixed order so callers
//! always get the same rejection for the same situation: membership,
//! published, window, open attempt, retake/attempt count, cooldown.

use crate::enrollment::EnrollmentGateway;
use crate::error::EngineError;
use crate::override_resolver::OverrideResolver;
use crate::window;
use chrono::{DateTime, Utc};
use db::models::assessment;
use db::repositories::submission_repository::SubmissionRepository;
use sea_orm::ConnectionTrait;

pub struct AttemptPolicy;

impl AttemptPolicy {
    pub async fn can_start_attempt<C: ConnectionTrait>(
        db: &C,
        enrollment: &dyn EnrollmentGateway,
        assessment: &assessment::Model,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !enrollment
            .is_actively_enrolled(student_id, assessment.course_id)
            .await?
        {
            return Err(EngineError::NotEnrolled { course_id: assessment.course_id });
        }

        let bypass =
            OverrideResolver::has_prerequisite_bypass(db, assessment.id, student_id, now).await?;
        if !bypass && !enrollment.prerequisites_met(student_id, assessment.id).await? {
            return Err(EngineError::NotEnrolled { course_id: assessment.course_id });
        }

        if !assessment.is_published() {
            return Err(EngineError::NotPublished { assessment_id: assessment.id });
        }

        let extension =
            OverrideResolver::deadline_extension(db, assessment.id, student_id, now).await?;
        if !window::is_open(assessment, extension.as_ref(), now) {
            return Err(EngineError::OutsideWindow { assessment_id: assessment.id });
        }

        if let Some(open) = SubmissionRepository::find_open(db, assessment.id, student_id).await? {
            return Err(EngineError::AlreadyOpenAttempt { submission_id: open.id });
        }

        let closed = SubmissionRepository::count_closed(db, assessment.id, student_id).await? as i64;
        if closed > 0 && !assessment.retake_enabled {
            return Err(EngineError::RetakeDisabled);
        }
        if let Some(max) = assessment.max_attempts {
            let allowed = max as i64
                + OverrideResolver::extra_attempts(db, assessment.id, student_id, now).await?;
            if closed >= allowed {
                return Err(EngineError::AttemptsExhausted { used: closed, allowed });
            }
        }

        if assessment.cooldown_minutes > 0 && closed > 0 {
            if let Some(last_end) =
                SubmissionRepository::latest_closed_end(db, assessment.id, student_id).await?
            {
                let until = last_end + assessment.cooldown();
                if now < until {
                    return Err(EngineError::CooldownActive { until });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use db::models::assessment::{RandomizationType, ReviewMode, ScopeType, Status};
    use db::models::enrollment;
    use db::models::submission::{self, SubmissionState};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};

    const STUDENT: i64 = 42;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 5, 12, 0, 0).unwrap()
    }

    struct AllowAll;

    #[async_trait]
    impl EnrollmentGateway for AllowAll {
        async fn is_actively_enrolled(&self, _: i64, _: i64) -> Result<bool, DbErr> {
            Ok(true)
        }
    }

    struct PrereqsUnmet;

    #[async_trait]
    impl EnrollmentGateway for PrereqsUnmet {
        async fn is_actively_enrolled(&self, _: i64, _: i64) -> Result<bool, DbErr> {
            Ok(true)
        }

        async fn prerequisites_met(&self, _: i64, _: i64) -> Result<bool, DbErr> {
            Ok(false)
        }
    }

    async fn seed_assessment(
        db: &DatabaseConnection,
        mutate: impl FnOnce(&mut assessment::ActiveModel),
    ) -> assessment::Model {
        let mut active = assessment::ActiveModel {
            course_id: Set(1),
            scope_type: Set(ScopeType::Course),
            scope_id: Set(1),
            title: Set("Quiz".into()),
            description: Set(None),
            status: Set(Status::Published),
            available_from: Set(None),
            deadline: Set(None),
            tolerance_minutes: Set(0),
            time_limit_minutes: Set(None),
            max_attempts: Set(Some(2)),
            cooldown_minutes: Set(0),
            retake_enabled: Set(true),
            review_mode: Set(ReviewMode::Immediate),
            late_penalty_percent: Set(None),
            randomization: Set(RandomizationType::Static),
            question_bank_count: Set(None),
            created_at: Set(t0()),
            updated_at: Set(t0()),
            ..Default::default()
        };
        mutate(&mut active);
        active.insert(db).await.unwrap()
    }

    async fn seed_enrollment(db: &DatabaseConnection) {
        enrollment::ActiveModel {
            student_id: Set(STUDENT),
            course_id: Set(1),
            active: Set(true),
            created_at: Set(t0()),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_closed_submission(
        db: &DatabaseConnection,
        assessment_id: i64,
        attempt: i32,
        finished_at: DateTime<Utc>,
    ) {
        submission::ActiveModel {
            assessment_id: Set(assessment_id),
            student_id: Set(STUDENT),
            attempt_number: Set(attempt),
            state: Set(SubmissionState::Graded),
            question_set: Set(serde_json::json!([])),
            started_at: Set(finished_at - chrono::Duration::minutes(10)),
            submitted_at: Set(Some(finished_at)),
            finished_at: Set(Some(finished_at)),
            is_late: Set(false),
            score: Set(Some(0.0)),
            created_at: Set(finished_at),
            updated_at: Set(finished_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn unenrolled_student_is_refused_first() {
        let db = setup_test_db().await;
        // Even a draft assessment reports NotEnrolled before NotPublished.
        let a = seed_assessment(&db, |m| m.status = Set(Status::Draft)).await;

        let gateway = crate::enrollment::DbEnrollmentGateway::new(db.clone());
        let err = AttemptPolicy::can_start_attempt(&db, &gateway, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotEnrolled { course_id: 1 }));
    }

    #[tokio::test]
    async fn unmet_prerequisites_refuse_unless_bypassed() {
        let db = setup_test_db().await;
        let a = seed_assessment(&db, |_| {}).await;

        let err = AttemptPolicy::can_start_attempt(&db, &PrereqsUnmet, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotEnrolled { .. }));

        db::models::assessment_override::ActiveModel {
            assessment_id: Set(a.id),
            student_id: Set(STUDENT),
            override_type: Set(db::models::assessment_override::OverrideType::PrerequisiteBypass),
            value: Set(serde_json::json!({})),
            granted_by: Set(9),
            granted_at: Set(t0()),
            expires_at: Set(None),
            created_at: Set(t0()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        AttemptPolicy::can_start_attempt(&db, &PrereqsUnmet, &a, STUDENT, t0())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn draft_assessment_reports_not_published() {
        let db = setup_test_db().await;
        seed_enrollment(&db).await;
        let a = seed_assessment(&db, |m| m.status = Set(Status::Draft)).await;

        let gateway = crate::enrollment::DbEnrollmentGateway::new(db.clone());
        let err = AttemptPolicy::can_start_attempt(&db, &gateway, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotPublished { .. }));
    }

    #[tokio::test]
    async fn closed_window_reports_outside_window() {
        let db = setup_test_db().await;
        let a = seed_assessment(&db, |m| {
            m.deadline = Set(Some(t0() - chrono::Duration::hours(1)));
        })
        .await;

        let err = AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::OutsideWindow { .. }));
    }

    #[tokio::test]
    async fn retake_disabled_refuses_second_attempt() {
        let db = setup_test_db().await;
        let a = seed_assessment(&db, |m| m.retake_enabled = Set(false)).await;
        seed_closed_submission(&db, a.id, 1, t0() - chrono::Duration::hours(2)).await;

        let err = AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RetakeDisabled));
    }

    #[tokio::test]
    async fn exhausted_attempts_lift_with_override() {
        let db = setup_test_db().await;
        let a = seed_assessment(&db, |m| m.max_attempts = Set(Some(2))).await;
        seed_closed_submission(&db, a.id, 1, t0() - chrono::Duration::hours(3)).await;
        seed_closed_submission(&db, a.id, 2, t0() - chrono::Duration::hours(2)).await;

        let err = AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AttemptsExhausted { used: 2, allowed: 2 }));

        db::models::assessment_override::ActiveModel {
            assessment_id: Set(a.id),
            student_id: Set(STUDENT),
            override_type: Set(db::models::assessment_override::OverrideType::ExtraAttempts),
            value: Set(serde_json::json!({ "additional_attempts": 1 })),
            granted_by: Set(9),
            granted_at: Set(t0()),
            expires_at: Set(None),
            created_at: Set(t0()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cooldown_counts_from_last_closed_end() {
        let db = setup_test_db().await;
        let a = seed_assessment(&db, |m| {
            m.cooldown_minutes = Set(60);
            m.max_attempts = Set(Some(3));
        })
        .await;
        seed_closed_submission(&db, a.id, 1, t0()).await;

        let err =
            AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0() + chrono::Duration::minutes(30))
                .await
                .unwrap_err();
        match err {
            EngineError::CooldownActive { until } => {
                assert_eq!(until, t0() + chrono::Duration::minutes(60));
            }
            other => panic!("expected CooldownActive, got {other:?}"),
        }

        AttemptPolicy::can_start_attempt(&db, &AllowAll, &a, STUDENT, t0() + chrono::Duration::minutes(61))
            .await
            .unwrap();
    }
}
