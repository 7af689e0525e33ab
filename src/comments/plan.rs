//! Comment plans: the per-item schedule of follow-up actions.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Delay before the first action of a new plan.
pub const FIRST_ACTION_DELAY_SECS: i64 = 30 * 60;
/// Lower bound on the spacing between consecutive actions.
pub const MIN_INTERVAL_SECS: i64 = 30 * 60;
/// Upper bound on actions in one plan.
pub const MAX_ACTIONS_PER_PLAN: u32 = 1000;

/// How densely a plan's actions are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Dense,
    Normal,
    Sparse,
}

impl Frequency {
    /// `dense` and `normal` are recognised; any other label means sparse.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "dense" => Frequency::Dense,
            "normal" => Frequency::Normal,
            _ => Frequency::Sparse,
        }
    }

    pub fn window_hours(self) -> i64 {
        match self {
            Frequency::Dense => 36,
            Frequency::Normal => 96,
            Frequency::Sparse => 168,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Done,
    /// Gave up on the action (the side effect could not be applied).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub due_at: DateTime<Utc>,
    pub status: ActionStatus,
    #[serde(default)]
    pub result_id: Option<u64>,
}

impl ScheduledAction {
    pub fn is_pending(&self) -> bool {
        self.status == ActionStatus::Pending
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.due_at <= now
    }
}

/// Item facts captured when the plan is created; later edits to the item do not
/// change what comments are written about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenContext {
    pub title: String,
    pub excerpt: String,
    pub summary: String,
}

impl From<&crate::content::GeneratedItem> for FrozenContext {
    fn from(item: &crate::content::GeneratedItem) -> Self {
        Self {
            title: item.title.clone(),
            excerpt: item.resolved_excerpt(),
            summary: item.summary_text().to_string(),
        }
    }
}

/// Inclusive bounds on the number of actions per plan, already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanBounds {
    min: u32,
    max: u32,
}

impl PlanBounds {
    /// Clamp to `1 <= min <= max <= MAX_ACTIONS_PER_PLAN`.
    pub fn new(min: u32, max: u32) -> Self {
        let min = min.clamp(1, MAX_ACTIONS_PER_PLAN);
        Self {
            min,
            max: max.clamp(min, MAX_ACTIONS_PER_PLAN),
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPlan {
    pub item_id: u64,
    pub created_at: DateTime<Utc>,
    pub context: FrozenContext,
    pub actions: Vec<ScheduledAction>,
}

impl CommentPlan {
    /// Lay out `count` actions over the frequency window, starting 30 minutes after `now`.
    pub fn build(
        item_id: u64,
        context: FrozenContext,
        count: u32,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> Self {
        let count = count.clamp(1, MAX_ACTIONS_PER_PLAN);
        let window_secs = frequency.window_hours() * 3600;
        let interval_secs = (window_secs / i64::from(count)).max(MIN_INTERVAL_SECS);
        let start = now + Duration::seconds(FIRST_ACTION_DELAY_SECS);

        let actions = (0..count)
            .map(|i| ScheduledAction {
                due_at: start + Duration::seconds(interval_secs * i64::from(i)),
                status: ActionStatus::Pending,
                result_id: None,
            })
            .collect();

        Self {
            item_id,
            created_at: now,
            context,
            actions,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_pending()).count()
    }

    /// A plan is live while it still has pending work.
    pub fn is_live(&self) -> bool {
        self.actions.iter().any(ScheduledAction::is_pending)
    }

    pub fn next_pending_due(&self) -> Option<DateTime<Utc>> {
        self.actions
            .iter()
            .filter(|a| a.is_pending())
            .map(|a| a.due_at)
            .min()
    }

    /// Indices of pending actions due at `now`, in due order.
    pub fn due_indices(&self, now: DateTime<Utc>) -> Vec<usize> {
        let mut due: Vec<usize> = (0..self.actions.len())
            .filter(|&i| self.actions[i].is_due(now))
            .collect();
        due.sort_by_key(|&i| self.actions[i].due_at);
        due
    }

    pub fn mark_done(&mut self, index: usize, result_id: u64) {
        if let Some(action) = self.actions.get_mut(index) {
            action.status = ActionStatus::Done;
            action.result_id = Some(result_id);
        }
    }

    pub fn mark_skipped(&mut self, index: usize) {
        if let Some(action) = self.actions.get_mut(index) {
            action.status = ActionStatus::Skipped;
        }
    }
}
