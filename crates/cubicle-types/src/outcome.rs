//! Results returned to callers after each submitted action.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Ending, Intent};
use crate::structs::{ActiveGlobalEvent, ChatMessage};

/// Why an action was refused without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BlockReason {
    /// The game has ended. Restart to play again.
    GameOver,
    /// A global disruption is waiting to be acknowledged.
    GlobalEventActive,
}

/// What happened when an action was applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionReport {
    /// Intent that drove the effects engine, if any.
    pub intent: Option<Intent>,
    /// Magnitude the intent was applied at.
    pub magnitude: Option<f64>,
    /// Human-readable summary of the effects.
    pub narrative: String,
    /// Messages appended to the chat log by this action.
    pub new_messages: Vec<ChatMessage>,
    /// Simulated weeks that elapsed.
    pub weeks_advanced: u32,
    /// Global disruption raised at the end of this action.
    pub global_event: Option<ActiveGlobalEvent>,
    /// Set when this action ended the game.
    pub ending: Option<Ending>,
}

/// Result of a submit-action call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ActionOutcome {
    /// The action ran.
    Applied(Box<ActionReport>),
    /// The action was short-circuited.
    Blocked {
        /// Why.
        reason: BlockReason,
    },
}

impl ActionOutcome {
    /// The report, if the action ran.
    pub fn report(&self) -> Option<&ActionReport> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Blocked { .. } => None,
        }
    }

    /// Whether the action was short-circuited.
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}
