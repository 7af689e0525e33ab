//! Job-class guard held for the duration of one run.

use crate::error::StorageError;
use crate::status::{JobClass, StatusStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;

/// Released on drop.
pub struct GuardLease {
    store: Arc<dyn StatusStore>,
    job: JobClass,
    token: String,
}

impl GuardLease {
    /// `None` when another holder has an unexpired lease on `job`.
    pub fn try_acquire(
        store: &Arc<dyn StatusStore>,
        job: JobClass,
        owner: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Option<Self>, StorageError> {
        let nonce: [u8; 8] = rand::random();
        let token = format!("{}:{}:{}", owner, job.key(), hex::encode(nonce));
        if !store.try_acquire_guard(job, &token, now, ttl)? {
            return Ok(None);
        }
        Ok(Some(Self {
            store: Arc::clone(store),
            job,
            token,
        }))
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for GuardLease {
    fn drop(&mut self) {
        if let Err(err) = self.store.release_guard(self.job, &self.token) {
            warn!(job = self.job.key(), error = %err, "Failed to release guard");
        }
    }
}
