//! IdGenerator port - job id generation for published tasks.
//!
//! Job ids must be globally unique without any coordination between
//! publishers, so they are ULIDs: time-sortable and collision resistant.

use ulid::Ulid;

use crate::domain::JobId;
use crate::ports::Clock;

/// Prefix of generated job ids.
pub const JOB_ID_PREFIX: &str = "job-";

/// IdGenerator hands out fresh job ids.
pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;
}

/// ULID based generator.
///
/// The timestamp part comes from the injected `Clock`, so tests using a
/// `FixedClock` get a known prefix; the random part still differs per call.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_job_id(&self) -> JobId {
        JobId::new(format!("{JOB_ID_PREFIX}{}", self.next_ulid()))
    }
}
