//! Follow-up comment queue.
//!
//! Each persisted item gets one [`CommentPlan`]: a randomized number of actions
//! spread over a frequency window. Drains execute due actions under a global
//! per-call budget.

pub mod author;
pub mod plan;
pub mod queue;
pub mod store;

pub use author::{fallback_nickname, NICKNAME_POOL};
pub use plan::{
    ActionStatus, CommentPlan, Frequency, FrozenContext, PlanBounds, ScheduledAction,
    MAX_ACTIONS_PER_PLAN,
};
pub use queue::{CommentQueue, CommentSettings, DrainReport};
pub use store::{PlanStore, SledPlanStore};
