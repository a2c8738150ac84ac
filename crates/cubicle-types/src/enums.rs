//! Enumeration types for the Cubicle simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Player role and career level
// ---------------------------------------------------------------------------

/// The player's job family. Alters starting stats and how effects land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Product manager: soft-skill heavy.
    Product,
    /// Engineer: hard-skill heavy.
    Dev,
    /// Operations: balanced.
    Ops,
}

impl Role {
    /// Short display label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Dev => "Dev",
            Self::Ops => "Ops",
        }
    }
}

/// Ordinal career rank, `P5` (entry) through `P10` (top).
///
/// Serialized as the `"P7"` string form.
/// Not a `ts-rs` export; fields of this type are declared `#[ts(as = "String")]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Level(u8);

/// A level string that is not `P5`..`P10`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid level {0:?}, expected P5..P10")]
pub struct InvalidLevel(pub String);

impl Level {
    /// Lowest rank.
    pub const MIN: u8 = 5;
    /// Highest rank.
    pub const MAX: u8 = 10;

    /// Entry level.
    pub const P5: Self = Self(5);
    /// `P6`.
    pub const P6: Self = Self(6);
    /// `P7`, the first level allowed to manage subordinates.
    pub const P7: Self = Self(7);
    /// `P8`.
    pub const P8: Self = Self(8);
    /// `P9`, executive rank.
    pub const P9: Self = Self(9);
    /// Terminal rank.
    pub const P10: Self = Self(10);

    /// Build a level from its number, rejecting anything outside 5..=10.
    pub fn from_number(n: u8) -> Result<Self, InvalidLevel> {
        if (Self::MIN..=Self::MAX).contains(&n) {
            Ok(Self(n))
        } else {
            Err(InvalidLevel(format!("P{n}")))
        }
    }

    /// The numeric rank.
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The next rank up, or `None` at `P10`.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).filter(|n| *n <= Self::MAX).map(Self)
    }

    /// Whether this is the terminal rank.
    pub const fn is_top(self) -> bool {
        self.0 >= Self::MAX
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::P5
    }
}

impl core::fmt::Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl core::str::FromStr for Level {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix('P')
            .or_else(|| s.trim().strip_prefix('p'))
            .ok_or_else(|| InvalidLevel(s.to_owned()))?;
        let n: u8 = digits
            .parse()
            .map_err(|e: core::num::ParseIntError| InvalidLevel(format!("{s} ({e})")))?;
        Self::from_number(n)
    }
}

impl TryFrom<String> for Level {
    type Error = InvalidLevel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.to_string()
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Product category. Drives the revenue target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ProjectType {
    /// A game title.
    Game,
    /// A consumer app.
    App,
    /// Internal infrastructure.
    Infra,
}

impl ProjectType {
    /// All project types, in catalog order.
    pub const ALL: [Self; 3] = [Self::Game, Self::App, Self::Infra];
}

impl core::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Game => "Game",
            Self::App => "App",
            Self::Infra => "Infra",
        })
    }
}

/// Lifecycle status. Transitions only move forward: `RnD -> Live -> Canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ProjectStatus {
    /// In development.
    #[serde(rename = "R&D")]
    RnD,
    /// Shipped and earning revenue.
    Live,
    /// Terminal. Receives no further simulation.
    Canceled,
}

// ---------------------------------------------------------------------------
// NPCs
// ---------------------------------------------------------------------------

/// Employment status of an NPC. One-way: employed to resigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NpcStatus {
    /// Currently employed.
    #[default]
    Employed,
    /// Left the company.
    Resigned,
}

/// Label on a symmetric NPC-to-NPC relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RelationLabel {
    /// Cooperative pair.
    Ally,
    /// Conflict-prone pair.
    Rival,
}

// ---------------------------------------------------------------------------
// Actions and outcomes
// ---------------------------------------------------------------------------

/// Classified intent of a free-text player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Intent {
    /// Push work forward.
    Work,
    /// Slack off or rest.
    Refuse,
    /// Buy food or small comforts.
    Shop,
    /// Study.
    Learn,
    /// Hostile outburst.
    Attack,
    /// Chat and coordination.
    #[serde(alias = "SOCIAL")]
    SmallTalk,
}

impl Intent {
    /// Parse a collaborator-supplied label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "WORK" => Some(Self::Work),
            "REFUSE" => Some(Self::Refuse),
            "SHOP" => Some(Self::Shop),
            "LEARN" => Some(Self::Learn),
            "ATTACK" => Some(Self::Attack),
            "SMALL_TALK" | "SOCIAL" | "SMALLTALK" => Some(Self::SmallTalk),
            _ => None,
        }
    }

    /// The wire label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Refuse => "REFUSE",
            Self::Shop => "SHOP",
            Self::Learn => "LEARN",
            Self::Attack => "ATTACK",
            Self::SmallTalk => "SMALL_TALK",
        }
    }
}

/// Terminal reason code for a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Ending {
    /// Energy reached zero.
    Exhausted,
    /// Money went negative.
    Bankrupt,
    /// Mood reached zero.
    Depressed,
    /// Chronic low mood and energy.
    Breakdown,
    /// A top executive lost all trust.
    Fired,
    /// The direct manager lost all trust.
    Pip,
    /// The active project imploded.
    ProjectCollapse,
    /// Stakeholders pulled the plug on the active project.
    ProjectCancelled,
    /// Survived to the end and reached the executive track.
    Executive,
    /// Survived to the end with a fortune.
    Rich,
    /// Survived to the end as a hit producer.
    Producer,
    /// Survived to the end without distinction.
    Stable,
    /// Quit voluntarily.
    Resignation,
}

impl Ending {
    /// Fixed closing narrative for this ending.
    pub const fn narrative(self) -> &'static str {
        match self {
            Self::Exhausted => {
                "You collapse at your desk. The doctor orders months of rest and your badge stops working."
            }
            Self::Bankrupt => {
                "Your account is overdrawn and the rent is due. You pack up and leave the city."
            }
            Self::Depressed => {
                "The joy has drained out of everything. You hand in your notice and go home to recover."
            }
            Self::Breakdown => {
                "One more meeting invite is the last straw. You walk out mid-standup and never come back."
            }
            Self::Fired => {
                "Leadership has lost all confidence in you. HR books a short meeting with no agenda."
            }
            Self::Pip => {
                "Your manager puts you on a performance plan. Nobody has ever survived one."
            }
            Self::ProjectCollapse => {
                "The project implodes under its own risk. You are named in the post-mortem."
            }
            Self::ProjectCancelled => {
                "Stakeholders cancel the project and your position goes with it."
            }
            Self::Executive => {
                "A year in, your results speak for themselves. You are fast-tracked into leadership."
            }
            Self::Rich => {
                "A year in, your savings are enough to retire early. You leave on your own terms."
            }
            Self::Producer => {
                "A year in, your project is a hit and your name is on the credits as producer."
            }
            Self::Stable => {
                "A year goes by. Nothing spectacular, nothing terrible. You are a reliable cog."
            }
            Self::Resignation => "You hand in your badge and walk out into the afternoon sun.",
        }
    }
}

/// State of the promotion review sub-flow. `None` on the game state means no review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ReviewStatus {
    /// Waiting for the player's free-text answer.
    PendingAnswer,
    /// Answer received, waiting for the scorer.
    PendingScore,
    /// Scored. A new review may be proposed.
    Finished,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MessageKind {
    /// The player.
    Player,
    /// An NPC.
    Npc,
    /// The game itself.
    System,
}

// ---------------------------------------------------------------------------
// Global disruption effects
// ---------------------------------------------------------------------------

/// Named handler for a global disruption event.
///
/// Each handler applies its own hand-authored stat deltas. Two of them
/// (`HospitalQuarter`, `BurnoutBreak`) also skip weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
#[allow(missing_docs)]
pub enum GlobalEffect {
    HospitalQuarter,
    ShortSickLeave,
    HealthCheckBonus,
    AllHandsMeeting,
    FireDrill,
    TeamBuilding,
    AuditWeek,
    ProjectReview,
    OutagePause,
    SecurityResponse,
    VersionFreeze,
    FamilyLeave,
    HouseMove,
    MarathonEvent,
    ExamStudy,
    StockUp,
    BonusRain,
    CelebrationParty,
    CommuteDisaster,
    RainWeek,
    BugStorm,
    OrgRestructure,
    PolicyChange,
    ToolRollout,
    MentorAssigned,
    InternalShare,
    InterviewPanel,
    CrossTeamProject,
    SummitInvite,
    AiStrategyNight,
    IpCrossoverCrunch,
    StreamerViral,
    AllInInvest,
    InternetMaintenance,
    BurnoutBreak,
}
