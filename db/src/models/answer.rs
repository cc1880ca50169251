use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A learner's response value, stored as tagged JSON in `answers.value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Free text (essay).
    Text(String),
    /// Selected option indices (choice types, single or multi).
    Selection(Vec<u32>),
    /// Stored file references (file upload).
    Files(Vec<String>),
}

impl AnswerValue {
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).expect("answer value serializes")
    }
}

/// One response to one question inside a submission. At most one row per
/// (submission, question); re-saving replaces the value and clears the score.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "answers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub question_id: i64,
    pub value: Json,
    /// Null until graded, automatically or by hand.
    pub score: Option<f64>,
    /// Set only when the grading pipeline wrote the score. A manual grade
    /// clears it.
    pub is_auto_graded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submission::Entity",
        from = "Column::SubmissionId",
        to = "super::submission::Column::Id"
    )]
    Submission,

    #[sea_orm(
        belongs_to = "super::question::Entity",
        from = "Column::QuestionId",
        to = "super::question::Column::Id"
    )]
    Question,
}

impl Related<super::submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn value(&self) -> Option<AnswerValue> {
        serde_json::from_value(self.value.clone()).ok()
    }

    /// Selection as a set, for exact-set grading. Empty for non-selection
    /// values.
    pub fn selection_set(&self) -> std::collections::BTreeSet<u32> {
        match self.value() {
            Some(AnswerValue::Selection(indices)) => indices.into_iter().collect(),
            _ => Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_roundtrips_through_json() {
        let v = AnswerValue::Selection(vec![0, 2]);
        let json = v.to_json();
        assert_eq!(json["type"], "selection");
        let back: AnswerValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn selection_set_ignores_text() {
        let m = Model {
            id: 1,
            submission_id: 1,
            question_id: 1,
            value: AnswerValue::Text("an essay".into()).to_json(),
            score: None,
            is_auto_graded: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(m.selection_set().is_empty());
    }

    #[test]
    fn selection_set_deduplicates() {
        let m = Model {
            id: 1,
            submission_id: 1,
            question_id: 1,
            value: AnswerValue::Selection(vec![2, 0, 2]).to_json(),
            score: None,
            is_auto_graded: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(m.selection_set(), [0u32, 2].into_iter().collect());
    }
}
