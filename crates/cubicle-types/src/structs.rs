//! Core entity structs: player, projects, NPCs, and the per-session game state.
//!
//! Bounded fields are plain signed integers. Clamping is the engine's job;
//! these types only carry data across the crate and wire boundaries.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::Channel;
use crate::enums::{
    Ending, GlobalEffect, Level, MessageKind, NpcStatus, ProjectStatus, ProjectType,
    RelationLabel, ReviewStatus, Role,
};
use crate::ids::{NpcId, ProjectId};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Desk upgrades bought from the shop. Each level adds a small KPI bonus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GearLevels {
    /// Graphics card upgrades (+5% KPI each).
    pub gpu: u32,
    /// Monitor upgrades (+3% KPI each).
    pub monitor: u32,
    /// Chair upgrades (+2% KPI each).
    pub chair: u32,
}

/// The single player character of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Display name.
    pub name: String,
    /// Job family.
    pub role: Role,
    /// Career rank.
    #[ts(as = "String")]
    pub level: Level,
    /// Direct manager, falling back to the project leader.
    pub leader_id: Option<NpcId>,
    /// Multiplier on KPI gains. Rounded to two decimals.
    pub learning_rate: f64,
    /// Ceiling for `energy`.
    pub max_energy: i64,
    /// `0..=max_energy`, except that overwork may push it negative.
    pub energy: i64,
    /// `0..=100`.
    pub mood: i64,
    /// Technical skill. Unbounded.
    pub hard_skill: i64,
    /// Communication skill. Unbounded.
    pub soft_skill: i64,
    /// Desk upgrades.
    pub gear: GearLevels,
    /// Cumulative performance score. Only rises.
    pub kpi: i64,
    /// Standing with leadership. Never below zero.
    pub political_capital: i64,
    /// Savings. Going negative ends the game.
    pub money: i64,
    /// The project the player currently works on.
    pub current_project: ProjectId,
    /// Live projects the player has worked on.
    pub participated_live_projects: BTreeSet<ProjectId>,
    /// Projects the player shipped from R&D.
    pub launched_projects: BTreeSet<ProjectId>,
    /// Weeks spent on a project with risk at or above 90.
    pub major_accidents: u32,
    /// Purchase counters keyed by `"<catalog>:<item id>"`.
    pub purchases: BTreeMap<String, u32>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A product line the company works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Catalog key.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Product category.
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// 1..=5. Scales revenue and weekly risk growth.
    pub difficulty: u8,
    /// `0..=100`.
    pub risk: i64,
    /// `0..=200`. A milestone fires at 100.
    pub progress: i64,
    /// Grows toward the type-dependent target.
    pub revenue: i64,
    /// Team morale, `0..=100`.
    pub morale: i64,
    /// Project-scoped confidence, `0..=100`.
    pub stakeholder_trust: i64,
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// A colleague.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Npc {
    /// Catalog key.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Free-text role title.
    pub role: String,
    /// Free-text traits, matched by keyword rules.
    pub traits: String,
    /// Project affiliation. May be a pseudo-project such as `General`.
    pub project: ProjectId,
    /// Trust in the player, `0..=100`.
    pub trust: i64,
    /// `0..=100`.
    pub mood: i64,
    /// Career rank.
    #[ts(as = "String")]
    pub level: Level,
    /// Employment status.
    pub status: NpcStatus,
    /// Symmetric relations to other NPCs.
    pub relations: BTreeMap<NpcId, RelationLabel>,
    /// Whether the player has ever met this NPC.
    pub known: bool,
    /// Reporting line, set when the player manages this NPC.
    pub manager_id: Option<String>,
}

impl Npc {
    /// Whether this NPC still works at the company.
    pub fn is_employed(&self) -> bool {
        self.status == NpcStatus::Employed
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Company-wide multipliers set by quarterly macro events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GlobalModifiers {
    /// Applied to KPI gains.
    pub kpi: f64,
    /// Applied to overwork risk.
    pub risk: f64,
    /// Applied to salary and revenue.
    pub revenue: f64,
}

impl Default for GlobalModifiers {
    fn default() -> Self {
        Self {
            kpi: 1.0,
            risk: 1.0,
            revenue: 1.0,
        }
    }
}

/// One entry in the chat and event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Who wrote it.
    pub kind: MessageKind,
    /// Display name of the author.
    pub sender: String,
    /// Message body.
    pub content: String,
    /// Where it was posted.
    #[ts(as = "String")]
    pub channel: Channel,
    /// Simulated week at posting time.
    pub week: u32,
    /// Wall-clock posting time.
    pub timestamp: DateTime<Utc>,
}

/// A disruption that blocks the session until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActiveGlobalEvent {
    /// Catalog key.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// The handler that was applied, if any.
    pub effect: Option<GlobalEffect>,
    /// Week the event fired (before any skipped weeks).
    pub week: u32,
}

/// The free-text promotion review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PromotionReview {
    /// Sub-flow state.
    pub status: ReviewStatus,
    /// The level being reviewed for.
    #[ts(as = "String")]
    pub target_level: Level,
    /// Prompt shown to the player.
    pub question: String,
    /// The player's answer, once given.
    pub answer: Option<String>,
    /// Score in `0..=100`, once scored.
    pub score: Option<u8>,
    /// Whether the score met the level's pass threshold.
    pub passed: Option<bool>,
    /// Reviewer feedback.
    pub comment: Option<String>,
    /// Week the review opened.
    pub week: u32,
}

/// Everything a single session mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameState {
    /// The player.
    pub player: Player,
    /// All projects, including canceled ones.
    pub projects: BTreeMap<ProjectId, Project>,
    /// All NPCs, including resigned ones.
    pub npcs: BTreeMap<NpcId, Npc>,
    /// Simulated week, starting at 1.
    pub week: u32,
    /// Derived: 48 weeks per year.
    pub year: u32,
    /// Derived: 12 weeks per quarter.
    pub quarter: u32,
    /// Chat and event log.
    pub chat_history: Vec<ChatMessage>,
    /// Feedback lines for commands issued from the workbench.
    pub workbench_feedback: Vec<String>,
    /// Quarterly multipliers.
    pub modifiers: GlobalModifiers,
    /// Rolling deduplicated notable facts.
    pub memory_facts: Vec<String>,
    /// NPCs the player has met, in meeting order.
    pub known_npcs: Vec<NpcId>,
    /// NPCs reporting to the player.
    pub player_subordinates: Vec<NpcId>,
    /// Blocks all simulation while set.
    pub active_global_event: Option<ActiveGlobalEvent>,
    /// The promotion review, if one was ever opened.
    pub review: Option<PromotionReview>,
    /// Sticky terminal flag.
    pub game_over: bool,
    /// Why the game ended.
    pub ending: Option<Ending>,
}

impl GameState {
    /// The project the player is assigned to, if it exists.
    pub fn current_project(&self) -> Option<&Project> {
        self.projects.get(&self.player.current_project)
    }

    /// Mutable access to the player's project.
    pub fn current_project_mut(&mut self) -> Option<&mut Project> {
        self.projects.get_mut(&self.player.current_project)
    }

    /// Sum of revenue over every project.
    pub fn total_revenue(&self) -> i64 {
        self.projects
            .values()
            .fold(0_i64, |acc, p| acc.saturating_add(p.revenue))
    }

    /// Whether a review is waiting on the player or the scorer.
    pub fn review_pending(&self) -> bool {
        self.review.as_ref().is_some_and(|r| {
            matches!(
                r.status,
                ReviewStatus::PendingAnswer | ReviewStatus::PendingScore
            )
        })
    }
}
