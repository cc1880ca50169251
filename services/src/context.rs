use crate::assessment_service::MaxScoreCache;
use crate::clock::{Clock, SystemClock};
use crate::enrollment::{DbEnrollmentGateway, EnrollmentGateway};
use db::events::EventSink;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared wiring for the engine: connection, clock, event sink, enrollment
/// collaborator and the max-score cache. Cheap to clone.
#[derive(Clone)]
pub struct EngineContext {
    pub db: DatabaseConnection,
    pub clock: Arc<dyn Clock>,
    pub events: EventSink,
    pub enrollment: Arc<dyn EnrollmentGateway>,
    pub max_scores: MaxScoreCache,
}

impl EngineContext {
    pub fn new(db: DatabaseConnection, events: EventSink) -> Self {
        let enrollment = Arc::new(DbEnrollmentGateway::new(db.clone()));
        Self {
            db,
            clock: Arc::new(SystemClock),
            events,
            enrollment,
            max_scores: MaxScoreCache::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_enrollment(mut self, enrollment: Arc<dyn EnrollmentGateway>) -> Self {
        self.enrollment = enrollment;
        self
    }
}
