use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where an assessment hangs in the course hierarchy.
///
/// Stored as a (type, id) pair and resolved into this closed union once, at
/// read time, so consumers never re-interpret the raw tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentScope {
    Course(i64),
    Unit(i64),
    Lesson(i64),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "assessment_scope_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScopeType {
    #[sea_orm(string_value = "course")]
    Course,
    #[sea_orm(string_value = "unit")]
    Unit,
    #[sea_orm(string_value = "lesson")]
    Lesson,
}

/// Authoring lifecycle of an assessment. Only published assessments accept
/// attempts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "assessment_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "published")]
    Published,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// When learners may see their score and feedback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "review_mode")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ReviewMode {
    /// Score visible as soon as grading lands.
    #[sea_orm(string_value = "immediate")]
    Immediate,
    /// Score held back until staff (or a schedule) releases it.
    #[sea_orm(string_value = "deferred")]
    Deferred,
    /// Released like deferred, but the answer key is never shown.
    #[sea_orm(string_value = "hidden")]
    Hidden,
}

/// How the question set for an attempt is derived from the authored list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "randomization_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RandomizationType {
    #[sea_orm(string_value = "static")]
    Static,
    #[sea_orm(string_value = "random_order")]
    RandomOrder,
    #[sea_orm(string_value = "bank")]
    Bank,
}

/// A scored unit of work: time window, attempt policy, grading policy and
/// question-selection policy in one row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Course the assessment ultimately belongs to, regardless of scope.
    pub course_id: i64,
    pub scope_type: ScopeType,
    pub scope_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    /// Attempts may not start before this instant. `None` means no lower bound.
    pub available_from: Option<DateTime<Utc>>,
    /// Nominal deadline. `None` means the window never closes.
    pub deadline: Option<DateTime<Utc>>,
    /// Grace period after `deadline` during which completion is still accepted
    /// (flagged late).
    pub tolerance_minutes: i64,
    /// Per-attempt time limit; `None` means untimed.
    pub time_limit_minutes: Option<i64>,
    /// `None` means unlimited attempts.
    pub max_attempts: Option<i32>,
    /// Mandatory wait between the end of one attempt and the start of the next.
    pub cooldown_minutes: i64,
    pub retake_enabled: bool,
    pub review_mode: ReviewMode,
    /// Percentage docked from the aggregate of a late submission, applied once.
    pub late_penalty_percent: Option<f64>,
    pub randomization: RandomizationType,
    /// Sample size when `randomization` is `Bank`.
    pub question_bank_count: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Question,

    #[sea_orm(has_many = "super::submission::Entity")]
    Submission,

    #[sea_orm(has_many = "super::assessment_override::Entity")]
    AssessmentOverride,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn scope(&self) -> AssessmentScope {
        match self.scope_type {
            ScopeType::Course => AssessmentScope::Course(self.scope_id),
            ScopeType::Unit => AssessmentScope::Unit(self.scope_id),
            ScopeType::Lesson => AssessmentScope::Lesson(self.scope_id),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == Status::Published
    }

    pub fn tolerance(&self) -> Duration {
        Duration::minutes(self.tolerance_minutes)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_minutes.map(Duration::minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(scope_type: ScopeType, scope_id: i64) -> Model {
        Model {
            id: 1,
            course_id: 10,
            scope_type,
            scope_id,
            title: "Quiz 1".into(),
            description: None,
            status: Status::Draft,
            available_from: None,
            deadline: None,
            tolerance_minutes: 15,
            time_limit_minutes: Some(30),
            max_attempts: Some(2),
            cooldown_minutes: 60,
            retake_enabled: true,
            review_mode: ReviewMode::Immediate,
            late_penalty_percent: None,
            randomization: RandomizationType::Static,
            question_bank_count: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scope_resolves_to_tagged_union() {
        assert_eq!(
            assessment(ScopeType::Course, 10).scope(),
            AssessmentScope::Course(10)
        );
        assert_eq!(
            assessment(ScopeType::Lesson, 77).scope(),
            AssessmentScope::Lesson(77)
        );
    }

    #[test]
    fn duration_helpers_convert_minutes() {
        let a = assessment(ScopeType::Course, 10);
        assert_eq!(a.tolerance(), Duration::minutes(15));
        assert_eq!(a.cooldown(), Duration::minutes(60));
        assert_eq!(a.time_limit(), Some(Duration::minutes(30)));
    }
}
