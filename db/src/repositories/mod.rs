pub mod answer_repository;
pub mod assessment_repository;
pub mod enrollment_repository;
pub mod override_repository;
pub mod question_repository;
pub mod submission_repository;
