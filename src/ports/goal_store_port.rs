//! Goal store access port.

use crate::domain::error::TradelogError;
use crate::domain::goal::Goal;

/// One-row-per-account goal storage, upsert-only: replacing a goal
/// overwrites the previous one, never versions it.
pub trait GoalStorePort {
    fn upsert_goal(&self, goal: &Goal) -> Result<(), TradelogError>;

    fn get_goal(&self, account_id: &str) -> Result<Option<Goal>, TradelogError>;
}
