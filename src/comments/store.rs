//! Durable comment plan storage.

use super::plan::CommentPlan;
use crate::error::StorageError;
use sled::{Db, Tree};
use std::io;
use tracing::warn;

const TREE_PLANS: &str = "comment_plans";

/// Plan persistence. Plans are always written whole.
pub trait PlanStore: Send + Sync {
    fn get(&self, item_id: u64) -> Result<Option<CommentPlan>, StorageError>;

    fn put(&self, plan: &CommentPlan) -> Result<(), StorageError>;

    /// Every plan that still has pending actions.
    fn live_plans(&self) -> Result<Vec<CommentPlan>, StorageError>;
}

#[derive(Clone)]
pub struct SledPlanStore {
    plans: Tree,
}

impl SledPlanStore {
    pub fn new(db: &Db) -> Result<Self, StorageError> {
        let plans = db.open_tree(TREE_PLANS).map_err(to_storage_io)?;
        Ok(Self { plans })
    }
}

impl PlanStore for SledPlanStore {
    fn get(&self, item_id: u64) -> Result<Option<CommentPlan>, StorageError> {
        let Some(raw) = self
            .plans
            .get(item_id.to_be_bytes())
            .map_err(to_storage_io)?
        else {
            return Ok(None);
        };
        let plan = serde_json::from_slice(&raw).map_err(to_storage_data)?;
        Ok(Some(plan))
    }

    fn put(&self, plan: &CommentPlan) -> Result<(), StorageError> {
        let value = serde_json::to_vec(plan).map_err(to_storage_data)?;
        self.plans
            .insert(plan.item_id.to_be_bytes(), value)
            .map_err(to_storage_io)?;
        self.plans.flush().map_err(to_storage_io)?;
        Ok(())
    }

    /// Records that no longer decode are logged and left out of the scan.
    fn live_plans(&self) -> Result<Vec<CommentPlan>, StorageError> {
        let mut out = Vec::new();
        for result in self.plans.iter() {
            let (key, value) = result.map_err(to_storage_io)?;
            let plan: CommentPlan = match serde_json::from_slice(&value) {
                Ok(plan) => plan,
                Err(err) => {
                    warn!(key = %hex::encode(&key), error = %err, "Unreadable comment plan skipped");
                    continue;
                }
            };
            if plan.is_live() {
                out.push(plan);
            }
        }
        Ok(out)
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::Serialization(err.to_string())
}
