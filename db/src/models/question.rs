use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "question_type")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum QuestionType {
    #[sea_orm(string_value = "multiple_choice")]
    MultipleChoice,
    #[sea_orm(string_value = "checkbox")]
    Checkbox,
    #[sea_orm(string_value = "essay")]
    Essay,
    #[sea_orm(string_value = "file_upload")]
    FileUpload,
    #[sea_orm(string_value = "true_false")]
    TrueFalse,
}

impl QuestionType {
    /// Correctness decidable by exact comparison against the answer key.
    pub fn is_auto_gradable(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::Checkbox | QuestionType::TrueFalse
        )
    }

    /// Choice types must carry an options list.
    pub fn requires_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkbox)
    }
}

/// One question inside an assessment.
///
/// `options` is a JSON list of strings (choice types only); `answer_key` is a
/// JSON list of option indices (auto-gradable types only). True/false uses the
/// fixed options [true, false] with indices 0 and 1.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    /// Stored order within the assessment.
    pub position: i32,
    pub question_type: QuestionType,
    pub prompt: String,
    /// Positive contribution to the assessment's max score.
    pub weight: f64,
    pub options: Option<Json>,
    pub answer_key: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
    pub fn options(&self) -> Vec<String> {
        self.options
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Number of selectable options. True/false always has two.
    pub fn option_count(&self) -> usize {
        match self.question_type {
            QuestionType::TrueFalse => 2,
            _ => self.options().len(),
        }
    }

    pub fn answer_key(&self) -> Vec<u32> {
        self.answer_key
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Key as a set, for exact-set comparison against a selection.
    pub fn answer_key_set(&self) -> BTreeSet<u32> {
        self.answer_key().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(question_type: QuestionType, options: Option<Json>, key: Option<Json>) -> Model {
        Model {
            id: 1,
            assessment_id: 1,
            position: 0,
            question_type,
            prompt: "?".into(),
            weight: 5.0,
            options,
            answer_key: key,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn auto_gradable_types() {
        assert!(QuestionType::MultipleChoice.is_auto_gradable());
        assert!(QuestionType::Checkbox.is_auto_gradable());
        assert!(QuestionType::TrueFalse.is_auto_gradable());
        assert!(!QuestionType::Essay.is_auto_gradable());
        assert!(!QuestionType::FileUpload.is_auto_gradable());
    }

    #[test]
    fn answer_key_parses_from_json() {
        let q = question(
            QuestionType::Checkbox,
            Some(json!(["a", "b", "c"])),
            Some(json!([0, 2])),
        );
        assert_eq!(q.answer_key(), vec![0, 2]);
        assert_eq!(q.option_count(), 3);
        assert_eq!(q.answer_key_set(), [0u32, 2].into_iter().collect());
    }

    #[test]
    fn true_false_has_two_options_without_options_json() {
        let q = question(QuestionType::TrueFalse, None, Some(json!([1])));
        assert_eq!(q.option_count(), 2);
    }

    #[test]
    fn missing_key_parses_empty() {
        let q = question(QuestionType::Essay, None, None);
        assert!(q.answer_key().is_empty());
    }
}
