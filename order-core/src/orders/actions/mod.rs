//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use crate::orders::traits::{CommandContext, CommandHandler, OrderError};
use shared::order::OrderEvent;

mod place_partition;
mod update_status;

pub use place_partition::PlacePartitionAction;
pub use update_status::UpdateStatusAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    PlacePartition(PlacePartitionAction),
    UpdateStatus(UpdateStatusAction),
}

impl CommandHandler for CommandAction {
    fn execute(&self, ctx: &mut CommandContext<'_>) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::PlacePartition(action) => action.execute(ctx),
            CommandAction::UpdateStatus(action) => action.execute(ctx),
        }
    }
}
