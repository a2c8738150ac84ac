//! Shared type definitions for the Cubicle office-career simulation.
//!
//! Every crate in the workspace speaks these types. They flow to
//! `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Session UUIDs and catalog string keys
//! - [`enums`] -- Roles, levels, statuses, intents, endings, global effects
//! - [`structs`] -- Player, project, NPC, and the per-session game state
//! - [`commands`] -- Typed commands, channels, and request payloads
//! - [`outcome`] -- Results of submitted actions

pub mod commands;
pub mod enums;
pub mod ids;
pub mod outcome;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::{
    ActionInput, ActionRequest, ActionRequestError, Channel, Command, CommandParseError,
    OnboardRequest,
};
pub use enums::{
    Ending, GlobalEffect, Intent, InvalidLevel, Level, MessageKind, NpcStatus, ProjectStatus,
    ProjectType, RelationLabel, ReviewStatus, Role,
};
pub use ids::{NpcId, ProjectId, SessionId};
pub use outcome::{ActionOutcome, ActionReport, BlockReason};
pub use structs::{
    ActiveGlobalEvent, ChatMessage, GameState, GearLevels, GlobalModifiers, Npc, Player, Project,
    PromotionReview,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::SessionId::export_all();
        let _ = crate::ids::ProjectId::export_all();
        let _ = crate::ids::NpcId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::ProjectType::export_all();
        let _ = crate::enums::ProjectStatus::export_all();
        let _ = crate::enums::NpcStatus::export_all();
        let _ = crate::enums::RelationLabel::export_all();
        let _ = crate::enums::Intent::export_all();
        let _ = crate::enums::Ending::export_all();
        let _ = crate::enums::ReviewStatus::export_all();
        let _ = crate::enums::MessageKind::export_all();
        let _ = crate::enums::GlobalEffect::export_all();

        // Structs
        let _ = crate::structs::GameState::export_all();
        let _ = crate::commands::Command::export_all();
        let _ = crate::commands::ActionRequest::export_all();
        let _ = crate::commands::OnboardRequest::export_all();
        let _ = crate::outcome::ActionOutcome::export_all();
    }
}
