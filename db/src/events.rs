//! Outbound domain events.
//!
//! State transitions publish facts here after their transaction commits;
//! delivery (notifications, audit) is a downstream concern and failures to
//! deliver never affect the transition itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// A new attempt was opened.
    AttemptStarted {
        submission_id: i64,
        assessment_id: i64,
        student_id: i64,
        attempt_number: i32,
        started_at: DateTime<Utc>,
    },

    /// A learner closed an attempt.
    SubmissionCompleted {
        submission_id: i64,
        assessment_id: i64,
        student_id: i64,
        attempt_number: i32,
        submitted_at: DateTime<Utc>,
        is_late: bool,
    },

    /// The time limit closed an attempt.
    SubmissionExpired {
        submission_id: i64,
        assessment_id: i64,
        student_id: i64,
        finished_at: DateTime<Utc>,
    },

    /// Grading finished (automatically or after the last manual grade).
    SubmissionGraded {
        submission_id: i64,
        assessment_id: i64,
        student_id: i64,
        score: f64,
        max_score: f64,
        fully_graded: bool,
        graded_at: DateTime<Utc>,
    },

    /// Score and feedback became visible to the learner.
    ScoresReleased {
        submission_id: i64,
        assessment_id: i64,
        student_id: i64,
        released_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn student_id(&self) -> i64 {
        match self {
            DomainEvent::AttemptStarted { student_id, .. } => *student_id,
            DomainEvent::SubmissionCompleted { student_id, .. } => *student_id,
            DomainEvent::SubmissionExpired { student_id, .. } => *student_id,
            DomainEvent::SubmissionGraded { student_id, .. } => *student_id,
            DomainEvent::ScoresReleased { student_id, .. } => *student_id,
        }
    }

    pub fn submission_id(&self) -> i64 {
        match self {
            DomainEvent::AttemptStarted { submission_id, .. } => *submission_id,
            DomainEvent::SubmissionCompleted { submission_id, .. } => *submission_id,
            DomainEvent::SubmissionExpired { submission_id, .. } => *submission_id,
            DomainEvent::SubmissionGraded { submission_id, .. } => *submission_id,
            DomainEvent::ScoresReleased { submission_id, .. } => *submission_id,
        }
    }
}

/// Fire-and-forget publisher backed by an unbounded in-process channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<DomainEvent>,
}

impl EventSink {
    pub fn new() -> (Self, UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Best-effort publish. A closed channel is logged, never propagated.
    pub fn emit(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            log::warn!("event sink closed; dropping domain event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn emitted_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::new();
        sink.emit(DomainEvent::AttemptStarted {
            submission_id: 1,
            assessment_id: 2,
            student_id: 3,
            attempt_number: 1,
            started_at: Utc::now(),
        });
        sink.emit(DomainEvent::ScoresReleased {
            submission_id: 1,
            assessment_id: 2,
            student_id: 3,
            released_at: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, DomainEvent::AttemptStarted { .. }));
        assert_eq!(first.submission_id(), 1);
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, DomainEvent::ScoresReleased { .. }));
        assert_eq!(second.student_id(), 3);
    }

    #[test]
    fn emit_survives_dropped_receiver() {
        let (sink, rx) = EventSink::new();
        drop(rx);
        sink.emit(DomainEvent::SubmissionExpired {
            submission_id: 9,
            assessment_id: 1,
            student_id: 2,
            finished_at: Utc::now(),
        });
    }

    #[test]
    fn events_serialize_tagged() {
        let event = DomainEvent::SubmissionGraded {
            submission_id: 5,
            assessment_id: 1,
            student_id: 2,
            score: 12.0,
            max_score: 15.0,
            fully_graded: true,
            graded_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SubmissionGraded");
        assert_eq!(json["data"]["score"], 12.0);
    }
}
