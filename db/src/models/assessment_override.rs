use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "override_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OverrideType {
    #[sea_orm(string_value = "deadline_extension")]
    DeadlineExtension,
    #[sea_orm(string_value = "extra_attempts")]
    ExtraAttempts,
    #[sea_orm(string_value = "prerequisite_bypass")]
    PrerequisiteBypass,
}

/// Payload for a deadline-extension override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineExtension {
    pub extended_deadline: DateTime<Utc>,
}

/// Payload for an extra-attempts override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraAttempts {
    pub additional_attempts: i64,
}

/// A staff-granted, time-bounded exception for one (assessment, student)
/// pair. Expired rows are ignored by the resolver but kept for audit.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_overrides")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    pub student_id: i64,
    pub override_type: OverrideType,
    /// Structured payload matching `override_type`; empty object for
    /// prerequisite bypass.
    pub value: Json,
    pub granted_by: i64,
    pub granted_at: DateTime<Utc>,
    /// Null means the override never lapses.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessment::Entity",
        from = "Column::AssessmentId",
        to = "super::assessment::Column::Id"
    )]
    Assessment,
}

impl Related<super::assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assessment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }

    /// Extended deadline carried by a deadline-extension override.
    pub fn extended_deadline(&self) -> Option<DateTime<Utc>> {
        if self.override_type != OverrideType::DeadlineExtension {
            return None;
        }
        serde_json::from_value::<DeadlineExtension>(self.value.clone())
            .ok()
            .map(|p| p.extended_deadline)
    }

    /// Attempts added on top of the assessment's max. Zero for other types or
    /// malformed payloads.
    pub fn additional_attempts(&self) -> i64 {
        if self.override_type != OverrideType::ExtraAttempts {
            return 0;
        }
        serde_json::from_value::<ExtraAttempts>(self.value.clone())
            .map(|p| p.additional_attempts)
            .unwrap_or(0)
    }
}
