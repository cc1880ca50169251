pub mod answer;
pub mod assessment;
pub mod assessment_override;
pub mod enrollment;
pub mod question;
pub mod submission;

pub use answer::Entity as Answer;
pub use assessment::Entity as Assessment;
pub use assessment_override::Entity as AssessmentOverride;
pub use enrollment::Entity as Enrollment;
pub use question::Entity as Question;
pub use submission::Entity as Submission;
