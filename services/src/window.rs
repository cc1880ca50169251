//! Window validation: pure functions over an assessment, an optional active
//! deadline-extension override and an instant. No side effects.

use chrono::{DateTime, Utc};
use db::models::{assessment, assessment_override};

/// Where a completion instant falls relative to the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishClass {
    /// At or before the (effective) deadline.
    OnTime,
    /// Past the deadline but within the tolerance window: accepted, flagged.
    Late,
    /// Past deadline + tolerance: refused outright (expiry auto-close is the
    /// one path that still lands here and is accepted).
    BeyondTolerance,
}

/// The deadline actually in force: an active extension replaces the base
/// deadline only when it is later. A deadline-less assessment never closes,
/// extension or not.
pub fn effective_deadline(
    assessment: &assessment::Model,
    deadline_override: Option<&assessment_override::Model>,
) -> Option<DateTime<Utc>> {
    let base = assessment.deadline?;
    let extended = deadline_override.and_then(|o| o.extended_deadline());
    match extended {
        Some(ext) if ext > base => Some(ext),
        _ => Some(base),
    }
}

/// Whether the assessment currently accepts new attempts. `now == deadline`
/// is still open.
pub fn is_open(
    assessment: &assessment::Model,
    deadline_override: Option<&assessment_override::Model>,
    now: DateTime<Utc>,
) -> bool {
    if !assessment.is_published() {
        return false;
    }
    if let Some(from) = assessment.available_from {
        if now < from {
            return false;
        }
    }
    match effective_deadline(assessment, deadline_override) {
        Some(deadline) => now <= deadline,
        None => true,
    }
}

pub fn classify_finish(
    assessment: &assessment::Model,
    deadline_override: Option<&assessment_override::Model>,
    at: DateTime<Utc>,
) -> FinishClass {
    match effective_deadline(assessment, deadline_override) {
        None => FinishClass::OnTime,
        Some(deadline) => {
            if at <= deadline {
                FinishClass::OnTime
            } else if at <= deadline + assessment.tolerance() {
                FinishClass::Late
            } else {
                FinishClass::BeyondTolerance
            }
        }
    }
}

pub fn is_late(
    assessment: &assessment::Model,
    deadline_override: Option<&assessment_override::Model>,
    submitted_at: DateTime<Utc>,
) -> bool {
    classify_finish(assessment, deadline_override, submitted_at) != FinishClass::OnTime
}
