pub mod m202608100001_create_enrollments;
pub mod m202608100002_create_assessments;
pub mod m202608100003_create_questions;
pub mod m202608100004_create_submissions;
pub mod m202608100005_create_answers;
pub mod m202608100006_create_assessment_overrides;
