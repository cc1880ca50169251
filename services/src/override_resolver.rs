//! Read-only lookup of active staff-granted exceptions, merged with the
//! assessment's base policy by the callers (window validator, attempt policy).

use chrono::{DateTime, Utc};
use db::models::assessment_override::{self, OverrideType};
use db::repositories::override_repository::OverrideRepository;
use sea_orm::{ConnectionTrait, DbErr};

pub struct OverrideResolver;

impl OverrideResolver {
    /// Active override of the given type, most recently granted first.
    pub async fn active_override<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
        override_type: OverrideType,
        now: DateTime<Utc>,
    ) -> Result<Option<assessment_override::Model>, DbErr> {
        OverrideRepository::active_for(db, assessment_id, student_id, override_type, now).await
    }

    /// Active deadline extension, if any.
    pub async fn deadline_extension<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<assessment_override::Model>, DbErr> {
        Self::active_override(db, assessment_id, student_id, OverrideType::DeadlineExtension, now)
            .await
    }

    /// Attempts granted on top of the base max. Zero when no active override.
    pub async fn extra_attempts<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, DbErr> {
        let found =
            Self::active_override(db, assessment_id, student_id, OverrideType::ExtraAttempts, now)
                .await?;
        Ok(found.map(|o| o.additional_attempts()).unwrap_or(0))
    }

    pub async fn has_prerequisite_bypass<C: ConnectionTrait>(
        db: &C,
        assessment_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let found = Self::active_override(
            db,
            assessment_id,
            student_id,
            OverrideType::PrerequisiteBypass,
            now,
        )
        .await?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use db::models::assessment::{self, RandomizationType, ReviewMode, ScopeType, Status};
    use db::models::assessment_override::{ActiveModel as OverrideActiveModel, DeadlineExtension};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
    use serde_json::json;

    async fn seed_assessment(db: &DatabaseConnection) -> i64 {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        let model = assessment::ActiveModel {
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
            max_attempts: Set(Some(1)),
            cooldown_minutes: Set(0),
            retake_enabled: Set(true),
            review_mode: Set(ReviewMode::Immediate),
            late_penalty_percent: Set(None),
            randomization: Set(RandomizationType::Static),
            question_bank_count: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        model.id
    }

    async fn grant(
        db: &DatabaseConnection,
        assessment_id: i64,
        override_type: OverrideType,
        value: serde_json::Value,
        granted_at: chrono::DateTime<Utc>,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> i64 {
        OverrideActiveModel {
            assessment_id: Set(assessment_id),
            student_id: Set(42),
            override_type: Set(override_type),
            value: Set(value),
            granted_by: Set(9),
            granted_at: Set(granted_at),
            expires_at: Set(expires_at),
            created_at: Set(granted_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn expired_override_is_ignored() {
        let db = setup_test_db().await;
        let assessment_id = seed_assessment(&db).await;
        let t0 = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();

        grant(
            &db,
            assessment_id,
            OverrideType::ExtraAttempts,
            json!({ "additional_attempts": 2 }),
            t0 - Duration::days(2),
            Some(t0 - Duration::days(1)),
        )
        .await;

        let extra = OverrideResolver::extra_attempts(&db, assessment_id, 42, t0)
            .await
            .unwrap();
        assert_eq!(extra, 0);
    }

    #[tokio::test]
    async fn most_recently_granted_wins() {
        let db = setup_test_db().await;
        let assessment_id = seed_assessment(&db).await;
        let t0 = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();

        let first = DeadlineExtension {
            extended_deadline: Utc.with_ymd_and_hms(2026, 4, 10, 17, 0, 0).unwrap(),
        };
        let second = DeadlineExtension {
            extended_deadline: Utc.with_ymd_and_hms(2026, 4, 12, 17, 0, 0).unwrap(),
        };
        grant(
            &db,
            assessment_id,
            OverrideType::DeadlineExtension,
            serde_json::to_value(&first).unwrap(),
            t0 - Duration::hours(5),
            None,
        )
        .await;
        grant(
            &db,
            assessment_id,
            OverrideType::DeadlineExtension,
            serde_json::to_value(&second).unwrap(),
            t0 - Duration::hours(1),
            None,
        )
        .await;

        let winner = OverrideResolver::deadline_extension(&db, assessment_id, 42, t0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(winner.extended_deadline(), Some(second.extended_deadline));
    }

    #[tokio::test]
    async fn identical_grant_times_break_ties_by_id() {
        let db = setup_test_db().await;
        let assessment_id = seed_assessment(&db).await;
        let t0 = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();
        let granted = t0 - Duration::hours(1);

        grant(
            &db,
            assessment_id,
            OverrideType::ExtraAttempts,
            json!({ "additional_attempts": 1 }),
            granted,
            None,
        )
        .await;
        let newer = grant(
            &db,
            assessment_id,
            OverrideType::ExtraAttempts,
            json!({ "additional_attempts": 3 }),
            granted,
            None,
        )
        .await;

        let winner = OverrideResolver::active_override(
            &db,
            assessment_id,
            42,
            OverrideType::ExtraAttempts,
            t0,
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(winner.id, newer);
        assert_eq!(winner.additional_attempts(), 3);
    }

    #[tokio::test]
    async fn types_resolve_independently() {
        let db = setup_test_db().await;
        let assessment_id = seed_assessment(&db).await;
        let t0 = Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap();

        grant(
            &db,
            assessment_id,
            OverrideType::PrerequisiteBypass,
            json!({}),
            t0 - Duration::hours(1),
            None,
        )
        .await;

        assert!(
            OverrideResolver::has_prerequisite_bypass(&db, assessment_id, 42, t0)
                .await
                .unwrap()
        );
        assert!(
            OverrideResolver::deadline_extension(&db, assessment_id, 42, t0)
                .await
                .unwrap()
                .is_none()
        );
    }
}
