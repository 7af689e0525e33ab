//! Status persistence and job guards.

use super::{AutomationState, JobClass, StatusPatch};
use crate::error::StorageError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::io;
use tracing::debug;

const TREE_STATUS: &str = "automation_status";
const TREE_GUARDS: &str = "automation_guards";
const STATE_KEY: &[u8] = b"state";

pub trait StatusStore: Send + Sync {
    /// Current state; empty/idle when nothing was ever written.
    fn all(&self) -> Result<AutomationState, StorageError>;

    /// Atomically apply `patch` and return the resulting state.
    fn merge(&self, patch: StatusPatch) -> Result<AutomationState, StorageError>;

    /// Take the guard for `job` unless another unexpired holder has it.
    fn try_acquire_guard(
        &self,
        job: JobClass,
        token: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StorageError>;

    /// Release the guard if `token` still holds it.
    fn release_guard(&self, job: JobClass, token: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuardRecord {
    token: String,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SledStatusStore {
    status: Tree,
    guards: Tree,
}

impl SledStatusStore {
    pub fn new(db: &Db) -> Result<Self, StorageError> {
        Ok(Self {
            status: db.open_tree(TREE_STATUS).map_err(to_storage_io)?,
            guards: db.open_tree(TREE_GUARDS).map_err(to_storage_io)?,
        })
    }
}

impl StatusStore for SledStatusStore {
    fn all(&self) -> Result<AutomationState, StorageError> {
        let Some(raw) = self.status.get(STATE_KEY).map_err(to_storage_io)? else {
            return Ok(AutomationState::default());
        };
        serde_json::from_slice(&raw).map_err(to_storage_data)
    }

    fn merge(&self, patch: StatusPatch) -> Result<AutomationState, StorageError> {
        let mut failure: Option<StorageError> = None;
        let updated = self
            .status
            .update_and_fetch(STATE_KEY, |old| {
                failure = None;
                let mut state = match old.map(serde_json::from_slice::<AutomationState>) {
                    None => AutomationState::default(),
                    Some(Ok(state)) => state,
                    Some(Err(err)) => {
                        failure = Some(to_storage_data(err));
                        return old.map(<[u8]>::to_vec);
                    }
                };
                patch.apply(&mut state);
                match serde_json::to_vec(&state) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        failure = Some(to_storage_data(err));
                        old.map(<[u8]>::to_vec)
                    }
                }
            })
            .map_err(to_storage_io)?;
        if let Some(err) = failure {
            return Err(err);
        }
        self.status.flush().map_err(to_storage_io)?;

        match updated {
            Some(raw) => serde_json::from_slice(&raw).map_err(to_storage_data),
            None => Ok(AutomationState::default()),
        }
    }

    fn try_acquire_guard(
        &self,
        job: JobClass,
        token: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        let key = job.key();
        let record = GuardRecord {
            token: token.to_string(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        let encoded = serde_json::to_vec(&record).map_err(to_storage_data)?;

        loop {
            let current = self.guards.get(key).map_err(to_storage_io)?;
            if let Some(raw) = &current {
                let held: GuardRecord = serde_json::from_slice(raw).map_err(to_storage_data)?;
                if held.expires_at > now {
                    debug!(job = key, holder = %held.token, "Guard busy");
                    return Ok(false);
                }
                debug!(job = key, holder = %held.token, "Taking over expired guard");
            }

            let swapped = self
                .guards
                .compare_and_swap(key, current.as_ref(), Some(encoded.clone()))
                .map_err(to_storage_io)?;
            if swapped.is_ok() {
                self.guards.flush().map_err(to_storage_io)?;
                return Ok(true);
            }
            // Lost a race with another writer; look again.
        }
    }

    fn release_guard(&self, job: JobClass, token: &str) -> Result<(), StorageError> {
        let key = job.key();
        loop {
            let Some(current) = self.guards.get(key).map_err(to_storage_io)? else {
                return Ok(());
            };
            let held: GuardRecord = serde_json::from_slice(&current).map_err(to_storage_data)?;
            if held.token != token {
                return Ok(());
            }
            let swapped = self
                .guards
                .compare_and_swap(key, Some(&current), Option::<Vec<u8>>::None)
                .map_err(to_storage_io)?;
            if swapped.is_ok() {
                self.guards.flush().map_err(to_storage_io)?;
                return Ok(());
            }
        }
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::Serialization(err.to_string())
}
