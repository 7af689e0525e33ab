//! Automation scheduler
//!
//! Decides when a generation cycle runs and drives comment drains on their own
//! cadence. Nothing here halts on failure: errors are recorded in the status and the
//! next run is always scheduled. Only [`AutomationScheduler::pause`] and
//! [`AutomationScheduler::block`] stop execution.

pub mod guard;
pub mod timing;

use crate::comments::{CommentQueue, DrainReport};
use crate::config::AutomationConfig;
use crate::content::{ContentPipeline, PipelineOutcome};
use crate::error::AutomationError;
use crate::status::{AutomationState, JobClass, StatusPatch, StatusSnapshot, StatusStore};
use chrono::{DateTime, NaiveTime, Utc};
use guard::GuardLease;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Lease length for a job-class guard; a crashed holder blocks at most this long.
const GUARD_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub identity: String,
    pub interval_hours: u32,
    pub preferred_times: Vec<NaiveTime>,
    pub utc_offset_minutes: i32,
    pub tick_interval: Duration,
    pub drain_interval: Duration,
    pub drain_budget: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &AutomationConfig) -> Self {
        let schedule = &config.schedule;
        Self {
            identity: "autoscribe".to_string(),
            interval_hours: schedule.interval_hours,
            preferred_times: schedule
                .preferred_times
                .iter()
                .filter_map(|raw| timing::parse_time_of_day(raw))
                .collect(),
            utc_offset_minutes: schedule.utc_offset_minutes,
            tick_interval: Duration::from_secs(schedule.tick_interval_secs.max(1)),
            drain_interval: Duration::from_secs(schedule.drain_interval_secs.max(1)),
            drain_budget: config.comments.drain_budget,
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Paused,
    Blocked(String),
    /// First tick: the next run time was computed and stored.
    Armed(DateTime<Utc>),
    NotDue(DateTime<Utc>),
    /// Another run of the same job class holds the guard.
    Busy,
    Ran {
        outcome: PipelineOutcome,
        next_run_at: DateTime<Utc>,
    },
}

#[derive(Debug)]
pub enum DrainOutcome {
    Paused,
    Blocked(String),
    Busy,
    Drained(DrainReport),
}

fn halted(state: &AutomationState) -> Option<TickOutcome> {
    if let Some(reason) = &state.block_reason {
        return Some(TickOutcome::Blocked(reason.clone()));
    }
    state.paused.then_some(TickOutcome::Paused)
}

pub struct AutomationScheduler {
    settings: SchedulerSettings,
    pipeline: Arc<ContentPipeline>,
    queue: Arc<CommentQueue>,
    status: Arc<dyn StatusStore>,
    rng: parking_lot::Mutex<StdRng>,
}

impl AutomationScheduler {
    pub fn new(
        settings: SchedulerSettings,
        pipeline: Arc<ContentPipeline>,
        queue: Arc<CommentQueue>,
        status: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            settings,
            pipeline,
            queue,
            status,
            rng: parking_lot::Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = parking_lot::Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Periodic entry point.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickOutcome, AutomationError> {
        let state = self.status.all()?;
        if let Some(halt) = halted(&state) {
            debug!(?halt, "Tick skipped");
            return Ok(halt);
        }

        let Some(next) = state.next_run_at else {
            let next = self.compute_next(now);
            self.status.merge(StatusPatch::new().next_run_at(next))?;
            info!(next_run_at = %next, "Scheduler armed");
            return Ok(TickOutcome::Armed(next));
        };
        if now < next {
            return Ok(TickOutcome::NotDue(next));
        }

        self.run_guarded(now, false).await
    }

    /// Run a cycle now regardless of the next run time. Pause, block and the guard
    /// still apply.
    pub async fn run_now(&self, now: DateTime<Utc>) -> Result<TickOutcome, AutomationError> {
        if let Some(halt) = halted(&self.status.all()?) {
            return Ok(halt);
        }
        self.run_guarded(now, true).await
    }

    async fn run_guarded(
        &self,
        now: DateTime<Utc>,
        manual: bool,
    ) -> Result<TickOutcome, AutomationError> {
        let Some(_lease) = GuardLease::try_acquire(
            &self.status,
            JobClass::Generation,
            &self.settings.identity,
            now,
            chrono::Duration::minutes(GUARD_TTL_MINUTES),
        )?
        else {
            debug!("Generation already running");
            return Ok(TickOutcome::Busy);
        };

        // Another tick may have finished a run between our read and the lease.
        let state = self.status.all()?;
        if let Some(halt) = halted(&state) {
            return Ok(halt);
        }
        if !manual {
            if let Some(next) = state.next_run_at.filter(|next| now < *next) {
                return Ok(TickOutcome::NotDue(next));
            }
        }

        info!(manual, "Generation cycle started");
        let outcome = self.pipeline.run(now).await;
        let next = self.compute_next(now);

        let patch = StatusPatch::new().next_run_at(next).last_run_at(now);
        let patch = match &outcome {
            PipelineOutcome::NothingProduced(err) => patch.error(err.to_string(), now),
            PipelineOutcome::Produced { warnings, .. } if !warnings.is_empty() => {
                patch.error(warnings.join("; "), now)
            }
            _ => patch.clear_error(),
        };
        if let Err(err) = self.status.merge(patch) {
            error!(error = %err, next_run_at = %next, "Failed to record run; writing next run time alone");
            if let Err(err) = self.status.merge(StatusPatch::new().next_run_at(next)) {
                error!(error = %err, "Failed to persist next run time");
            }
        }

        match &outcome {
            PipelineOutcome::Produced { item_id, warnings } => {
                info!(item_id, warnings = warnings.len(), next_run_at = %next, "Generation cycle finished")
            }
            PipelineOutcome::Previewed(item) => {
                info!(title = %item.title, next_run_at = %next, "Preview cycle finished")
            }
            PipelineOutcome::NothingProduced(err) => {
                warn!(kind = err.kind(), next_run_at = %next, "Generation cycle failed")
            }
        }
        Ok(TickOutcome::Ran {
            outcome,
            next_run_at: next,
        })
    }

    /// Drain due comment actions under the global budget.
    pub async fn drain_queues(&self, now: DateTime<Utc>) -> Result<DrainOutcome, AutomationError> {
        let state = self.status.all()?;
        match halted(&state) {
            Some(TickOutcome::Blocked(reason)) => return Ok(DrainOutcome::Blocked(reason)),
            Some(_) => return Ok(DrainOutcome::Paused),
            None => {}
        }

        let Some(_lease) = GuardLease::try_acquire(
            &self.status,
            JobClass::Drain,
            &self.settings.identity,
            now,
            chrono::Duration::minutes(GUARD_TTL_MINUTES),
        )?
        else {
            return Ok(DrainOutcome::Busy);
        };

        match self.queue.drain_due(now, self.settings.drain_budget).await {
            Ok(report) => Ok(DrainOutcome::Drained(report)),
            Err(err) => {
                self.status
                    .merge(StatusPatch::new().error(err.to_string(), now))?;
                Err(err)
            }
        }
    }

    pub fn pause(&self) -> Result<AutomationState, AutomationError> {
        info!("Automation paused");
        Ok(self.status.merge(StatusPatch::new().paused(true))?)
    }

    pub fn resume(&self) -> Result<AutomationState, AutomationError> {
        info!("Automation resumed");
        Ok(self.status.merge(StatusPatch::new().paused(false))?)
    }

    pub fn block(&self, reason: &str) -> Result<AutomationState, AutomationError> {
        let reason = reason.trim();
        let reason = if reason.is_empty() { "blocked" } else { reason };
        warn!(reason, "Automation blocked");
        Ok(self.status.merge(StatusPatch::new().block(reason))?)
    }

    pub fn unblock(&self) -> Result<AutomationState, AutomationError> {
        info!("Automation unblocked");
        Ok(self.status.merge(StatusPatch::new().unblock())?)
    }

    /// Status view with the pending count taken from the plans.
    pub fn snapshot(&self) -> Result<StatusSnapshot, AutomationError> {
        let state = self.status.all()?;
        let pending = self.queue.pending_count()?;
        Ok(StatusSnapshot::from_state(&state, pending))
    }

    /// Daemon loop: generation and drain timers until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut generation = tokio::time::interval(self.settings.tick_interval);
        generation.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut drain = tokio::time::interval(self.settings.drain_interval);
        drain.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            tick_secs = self.settings.tick_interval.as_secs(),
            drain_secs = self.settings.drain_interval.as_secs(),
            "Scheduler loop started"
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler loop stopping");
                    break;
                }
                _ = generation.tick() => {
                    if let Err(err) = self.tick(Utc::now()).await {
                        error!(kind = err.kind(), error = %err, "Tick failed");
                    }
                }
                _ = drain.tick() => {
                    if let Err(err) = self.drain_queues(Utc::now()).await {
                        error!(kind = err.kind(), error = %err, "Drain failed");
                    }
                }
            }
        }
    }

    fn compute_next(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        timing::next_run_at(
            now,
            self.settings.interval_hours,
            &self.settings.preferred_times,
            self.settings.utc_offset_minutes,
            &mut *self.rng.lock(),
        )
    }
}
