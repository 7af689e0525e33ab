//! Automation status
//!
//! [`AutomationState`] is the process-wide record of what the automation last did.
//! Components never overwrite it wholesale: they submit a [`StatusPatch`] and the
//! [`StatusStore`] applies it as one atomic read-modify-write.

mod store;

pub use store::{SledStatusStore, StatusStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable automation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationState {
    pub paused: bool,
    pub block_reason: Option<String>,
    pub last_item_id: Option<u64>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_comment_at: Option<DateTime<Utc>>,
    /// Mirror of the plan store; refreshed after every enqueue and drain.
    pub pending_action_count: usize,
}

impl AutomationState {
    pub fn is_blocked(&self) -> bool {
        self.block_reason.is_some()
    }

    /// Paused or blocked: the scheduler must not run anything.
    pub fn is_halted(&self) -> bool {
        self.paused || self.is_blocked()
    }
}

/// A partial update. Unset fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusPatch {
    paused: Option<bool>,
    block_reason: Option<Option<String>>,
    last_item_id: Option<u64>,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    last_error: Option<Option<String>>,
    last_error_at: Option<DateTime<Utc>>,
    last_comment_at: Option<DateTime<Utc>>,
    pending_action_count: Option<usize>,
}

impl StatusPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = Some(paused);
        self
    }

    pub fn block(mut self, reason: impl Into<String>) -> Self {
        self.block_reason = Some(Some(reason.into()));
        self
    }

    pub fn unblock(mut self) -> Self {
        self.block_reason = Some(None);
        self
    }

    pub fn last_item_id(mut self, item_id: u64) -> Self {
        self.last_item_id = Some(item_id);
        self
    }

    pub fn last_run_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_run_at = Some(at);
        self
    }

    pub fn next_run_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_run_at = Some(at);
        self
    }

    pub fn error(mut self, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.last_error = Some(Some(message.into()));
        self.last_error_at = Some(at);
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn last_comment_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_comment_at = Some(at);
        self
    }

    pub fn pending_action_count(mut self, count: usize) -> Self {
        self.pending_action_count = Some(count);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, state: &mut AutomationState) {
        if let Some(paused) = self.paused {
            state.paused = paused;
        }
        if let Some(reason) = &self.block_reason {
            state.block_reason = reason.clone();
        }
        if let Some(id) = self.last_item_id {
            state.last_item_id = Some(id);
        }
        if let Some(at) = self.last_run_at {
            state.last_run_at = Some(at);
        }
        if let Some(at) = self.next_run_at {
            state.next_run_at = Some(at);
        }
        if let Some(error) = &self.last_error {
            state.last_error = error.clone();
        }
        if let Some(at) = self.last_error_at {
            state.last_error_at = Some(at);
        }
        if let Some(at) = self.last_comment_at {
            state.last_comment_at = Some(at);
        }
        if let Some(count) = self.pending_action_count {
            state.pending_action_count = count;
        }
    }
}

/// Coarse label for status surfaces. Blocked wins over paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateLabel {
    Active,
    Paused,
    Blocked,
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StateLabel::Active => "active",
            StateLabel::Paused => "paused",
            StateLabel::Blocked => "blocked",
        };
        f.write_str(label)
    }
}

/// Job classes that each get their own single-winner guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobClass {
    Generation,
    Drain,
}

impl JobClass {
    pub fn key(self) -> &'static str {
        match self {
            JobClass::Generation => "generation",
            JobClass::Drain => "drain",
        }
    }
}

/// Read-only view handed to status surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: StateLabel,
    pub paused: bool,
    pub block_reason: Option<String>,
    pub last_item_id: Option<u64>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub pending_action_count: usize,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_comment_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Build from stored state, with the pending count taken fresh from the plans.
    pub fn from_state(state: &AutomationState, pending_action_count: usize) -> Self {
        let label = if state.is_blocked() {
            StateLabel::Blocked
        } else if state.paused {
            StateLabel::Paused
        } else {
            StateLabel::Active
        };
        Self {
            state: label,
            paused: state.paused,
            block_reason: state.block_reason.clone(),
            last_item_id: state.last_item_id,
            last_run_at: state.last_run_at,
            next_run_at: state.next_run_at,
            pending_action_count,
            last_error: state.last_error.clone(),
            last_error_at: state.last_error_at,
            last_comment_at: state.last_comment_at,
        }
    }
}
