//! Question-set selection for a new attempt. Called once at submission
//! creation; the resulting ordered id list is frozen on the record and never
//! recomputed.

use db::models::assessment::{self, RandomizationType};
use db::models::question;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Mixes the submission id into a well-distributed shuffle seed (splitmix64
/// finalizer), so consecutive ids don't produce correlated orderings while
/// staying reproducible for audit.
pub fn derive_seed(submission_id: i64) -> u64 {
    let mut z = (submission_id as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Ordered question ids for one attempt. `questions` must already be in
/// stored order.
pub fn select_question_set(
    assessment: &assessment::Model,
    questions: &[question::Model],
    seed: u64,
) -> Vec<i64> {
    let mut ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

    match assessment.randomization {
        RandomizationType::Static => ids,
        RandomizationType::RandomOrder => {
            let mut rng = StdRng::seed_from_u64(seed);
            ids.shuffle(&mut rng);
            ids
        }
        RandomizationType::Bank => {
            let mut rng = StdRng::seed_from_u64(seed);
            ids.shuffle(&mut rng);
            // A pool smaller than the requested sample returns the whole
            // (shuffled) pool.
            let take = assessment
                .question_bank_count
                .map(|n| n.max(0) as usize)
                .unwrap_or(ids.len())
                .min(ids.len());
            ids.truncate(take);
            ids
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use db::models::assessment::{ReviewMode, ScopeType, Status};
    use db::models::question::QuestionType;

    fn assessment(randomization: RandomizationType, bank: Option<i32>) -> assessment::Model {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        assessment::Model {
            id: 1,
            course_id: 1,
            scope_type: ScopeType::Course,
            scope_id: 1,
            title: "Quiz".into(),
            description: None,
            status: Status::Published,
            available_from: None,
            deadline: None,
            tolerance_minutes: 0,
            time_limit_minutes: None,
            max_attempts: None,
            cooldown_minutes: 0,
            retake_enabled: true,
            review_mode: ReviewMode::Immediate,
            late_penalty_percent: None,
            randomization,
            question_bank_count: bank,
            created_at: now,
            updated_at: now,
        }
    }

    fn questions(n: i64) -> Vec<question::Model> {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
        (1..=n)
            .map(|id| question::Model {
                id,
                assessment_id: 1,
                position: id as i32,
                question_type: QuestionType::Essay,
                prompt: format!("Q{id}"),
                weight: 1.0,
                options: None,
                answer_key: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn static_keeps_stored_order() {
        let set = select_question_set(&assessment(RandomizationType::Static, None), &questions(5), 7);
        assert_eq!(set, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn shuffle_is_reproducible_per_seed() {
        let a = assessment(RandomizationType::RandomOrder, None);
        let qs = questions(10);
        let first = select_question_set(&a, &qs, 42);
        let second = select_question_set(&a, &qs, 42);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=10).collect::<Vec<_>>());

        let other = select_question_set(&a, &qs, 43);
        assert_ne!(first, other);
    }

    #[test]
    fn bank_samples_without_replacement() {
        let a = assessment(RandomizationType::Bank, Some(3));
        let qs = questions(10);
        let set = select_question_set(&a, &qs, 11);
        assert_eq!(set.len(), 3);
        let mut deduped = set.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), 3);
    }

    #[test]
    fn short_pool_returns_whole_pool_shuffled() {
        let a = assessment(RandomizationType::Bank, Some(8));
        let qs = questions(4);
        let mut set = select_question_set(&a, &qs, 3);
        assert_eq!(set.len(), 4);
        set.sort_unstable();
        assert_eq!(set, vec![1, 2, 3, 4]);
    }

    #[test]
    fn derived_seeds_differ_for_adjacent_ids() {
        assert_ne!(derive_seed(1), derive_seed(2));
        assert_ne!(derive_seed(0), derive_seed(1));
    }
}
