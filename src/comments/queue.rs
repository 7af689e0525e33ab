//! Comment queue: creates plans for new items and drains due actions.

use super::author::{author_email, resolve_author};
use super::plan::{CommentPlan, Frequency, FrozenContext, PlanBounds};
use super::store::PlanStore;
use crate::config::{CommentApproval, CommentConfig, ContentConfig};
use crate::error::AutomationError;
use crate::provider::{ProviderGateway, ProviderResult};
use crate::status::{StatusPatch, StatusStore};
use crate::store::{CommentSink, NewComment};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Queue settings derived from configuration.
#[derive(Debug, Clone)]
pub struct CommentSettings {
    pub enabled: bool,
    pub bounds: PlanBounds,
    pub frequency: Frequency,
    pub approval: CommentApproval,
    pub author_prefix: String,
    pub site_host: String,
    /// Plans examined per drain call.
    pub drain_batch: usize,
}

impl CommentSettings {
    pub fn from_config(comments: &CommentConfig, content: &ContentConfig) -> Self {
        Self {
            enabled: comments.enabled,
            bounds: PlanBounds::new(comments.min, comments.max),
            frequency: comments.frequency(),
            approval: comments.status,
            author_prefix: comments.author_prefix.clone(),
            site_host: content.site_host(),
            drain_batch: comments.drain_batch.max(1),
        }
    }
}

/// What one drain call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub examined_plans: usize,
    pub attempted: usize,
    pub executed: usize,
    pub deferred: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
struct DueAction {
    item_id: u64,
    index: usize,
}

enum ActionOutcome {
    Done,
    Deferred,
    Skipped,
    Stale,
}

/// One async lock per item so plan read-modify-write never interleaves.
#[derive(Default)]
struct PlanLocks {
    inner: parking_lot::Mutex<HashMap<u64, Arc<tokio::sync::Mutex<()>>>>,
}

impl PlanLocks {
    fn lock_for(&self, item_id: u64) -> Arc<tokio::sync::Mutex<()>> {
        self.inner.lock().entry(item_id).or_default().clone()
    }

    fn prune(&self) {
        self.inner.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

fn due_actions(plans: &[CommentPlan], now: DateTime<Utc>) -> impl Iterator<Item = DueAction> + '_ {
    plans.iter().flat_map(move |plan| {
        plan.due_indices(now).into_iter().map(move |index| DueAction {
            item_id: plan.item_id,
            index,
        })
    })
}

pub struct CommentQueue {
    settings: CommentSettings,
    gateway: Arc<ProviderGateway>,
    plans: Arc<dyn PlanStore>,
    sink: Arc<dyn CommentSink>,
    status: Arc<dyn StatusStore>,
    locks: PlanLocks,
    rng: parking_lot::Mutex<StdRng>,
}

impl CommentQueue {
    pub fn new(
        settings: CommentSettings,
        gateway: Arc<ProviderGateway>,
        plans: Arc<dyn PlanStore>,
        sink: Arc<dyn CommentSink>,
        status: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            settings,
            gateway,
            plans,
            sink,
            status,
            locks: PlanLocks::default(),
            rng: parking_lot::Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic randomness for plan sizes and fallback names.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = parking_lot::Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn settings(&self) -> &CommentSettings {
        &self.settings
    }

    /// Create the plan for a freshly persisted item.
    ///
    /// Returns `None` when comments are disabled or the item already has a plan.
    pub async fn enqueue(
        &self,
        item_id: u64,
        context: FrozenContext,
        now: DateTime<Utc>,
    ) -> Result<Option<CommentPlan>, AutomationError> {
        if !self.settings.enabled {
            debug!(item_id, "Comments disabled; no plan created");
            return Ok(None);
        }

        let lock = self.locks.lock_for(item_id);
        let _guard = lock.lock().await;

        if self.plans.get(item_id)?.is_some() {
            debug!(item_id, "Comment plan already exists");
            return Ok(None);
        }

        let count = self.settings.bounds.sample(&mut *self.rng.lock());
        let plan = CommentPlan::build(item_id, context, count, self.settings.frequency, now);
        self.plans.put(&plan)?;
        let pending = self.refresh_pending()?;

        info!(
            item_id,
            actions = plan.actions.len(),
            first_due = %plan.actions[0].due_at,
            pending,
            "Comment plan created"
        );
        Ok(Some(plan))
    }

    /// Execute due actions until `budget` of them are done.
    ///
    /// At most `drain_batch` live plans are examined, most overdue first.
    pub async fn drain_due(
        &self,
        now: DateTime<Utc>,
        budget: usize,
    ) -> Result<DrainReport, AutomationError> {
        let mut report = DrainReport::default();

        let mut live = self.plans.live_plans()?;
        live.sort_by_key(|plan| (plan.next_pending_due(), plan.item_id));
        live.truncate(self.settings.drain_batch);
        report.examined_plans = live.len();

        for action in due_actions(&live, now) {
            if report.executed >= budget {
                break;
            }
            match self.execute(action, now).await? {
                ActionOutcome::Done => report.executed += 1,
                ActionOutcome::Deferred => report.deferred += 1,
                ActionOutcome::Skipped => report.skipped += 1,
                ActionOutcome::Stale => continue,
            }
            report.attempted += 1;
        }

        if report.executed > 0 {
            self.status
                .merge(StatusPatch::new().last_comment_at(now))
                .map_err(AutomationError::from)?;
        }
        let pending = self.refresh_pending()?;
        self.locks.prune();

        info!(
            examined = report.examined_plans,
            executed = report.executed,
            deferred = report.deferred,
            skipped = report.skipped,
            pending,
            "Comment queue drained"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        action: DueAction,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, AutomationError> {
        let lock = self.locks.lock_for(action.item_id);
        let _guard = lock.lock().await;

        // Re-read under the lock; another drain may have handled it already.
        let Some(mut plan) = self.plans.get(action.item_id)? else {
            return Ok(ActionOutcome::Stale);
        };
        let still_due = plan
            .actions
            .get(action.index)
            .map(|a| a.is_due(now))
            .unwrap_or(false);
        if !still_due {
            return Ok(ActionOutcome::Stale);
        }

        let content = match self.gateway.generate_comment(&plan.context).await {
            ProviderResult::Success(content) => content,
            ProviderResult::Empty => {
                debug!(item_id = action.item_id, index = action.index, "Empty comment; retry later");
                return Ok(ActionOutcome::Deferred);
            }
            ProviderResult::Failure(reason) => {
                warn!(item_id = action.item_id, reason = %reason, "Comment generation failed; retry later");
                return Ok(ActionOutcome::Deferred);
            }
        };

        let author = resolve_author(
            &self.gateway,
            &plan.context,
            &self.settings.author_prefix,
            &self.rng,
        )
        .await;
        let email = author_email(&author, &self.settings.site_host, &mut *self.rng.lock());
        let comment = NewComment {
            item_id: action.item_id,
            author,
            author_email: email,
            content,
            approved: self.settings.approval == CommentApproval::Approve,
            created_at: now,
        };

        match self.sink.insert_comment(&comment) {
            Ok(comment_id) => {
                plan.mark_done(action.index, comment_id);
                self.plans.put(&plan)?;
                debug!(item_id = action.item_id, comment_id, "Comment inserted");
                Ok(ActionOutcome::Done)
            }
            Err(err) => {
                warn!(item_id = action.item_id, error = %err, "Comment insert failed; action skipped");
                plan.mark_skipped(action.index);
                self.plans.put(&plan)?;
                let failure = AutomationError::SideEffectFailure(format!(
                    "comment for item {}: {}",
                    action.item_id, err
                ));
                self.status
                    .merge(StatusPatch::new().error(failure.to_string(), now))
                    .map_err(AutomationError::from)?;
                Ok(ActionOutcome::Skipped)
            }
        }
    }

    /// Pending actions across all live plans.
    pub fn pending_count(&self) -> Result<usize, AutomationError> {
        Ok(self
            .plans
            .live_plans()?
            .iter()
            .map(CommentPlan::pending_count)
            .sum())
    }

    fn refresh_pending(&self) -> Result<usize, AutomationError> {
        let pending = self.pending_count()?;
        self.status
            .merge(StatusPatch::new().pending_action_count(pending))
            .map_err(AutomationError::from)?;
        Ok(pending)
    }
}
