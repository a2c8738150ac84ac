//! Typed player commands and request payloads.
//!
//! Clients may still send the legacy `cmd:name:arg` string form;
//! [`Command::parse`] validates it into a [`Command`] at the boundary so
//! the engine only ever sees typed variants.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::Role;
use crate::ids::{NpcId, ProjectId};

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Where an action or message is directed.
///
/// Serialized as `"group"`, `"workbench"`, or the NPC key for a DM.
/// Fields of this type are exported to `TypeScript` as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    /// The team group chat.
    #[default]
    Group,
    /// The silent command panel. Commands here do not advance time.
    Workbench,
    /// A direct message with one NPC.
    Direct(NpcId),
}

impl Channel {
    /// The NPC on the other end of a DM.
    pub const fn direct_npc(&self) -> Option<&NpcId> {
        match self {
            Self::Direct(id) => Some(id),
            Self::Group | Self::Workbench => None,
        }
    }
}

impl From<String> for Channel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" | "group" => Self::Group,
            "workbench" => Self::Workbench,
            _ => Self::Direct(NpcId(value)),
        }
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Group => "group".to_owned(),
            Channel::Workbench => "workbench".to_owned(),
            Channel::Direct(id) => id.0,
        }
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Group => f.write_str("group"),
            Self::Workbench => f.write_str("workbench"),
            Self::Direct(id) => f.write_str(id.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A structured player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "arg", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Command {
    /// Buy a meal by catalog id.
    Eat(String),
    /// Buy a shop item by catalog id.
    Shop(String),
    /// Take a course by catalog id.
    Study(String),
    /// Work at 1.5 intensity.
    WorkHard,
    /// Work at normal intensity with a small skill-based bonus.
    WorkNormal,
    /// Intense technical push that also grows hard skill.
    TechBreakthrough,
    /// Build a slide deck for stakeholders.
    MakePpt,
    /// Run an alignment meeting.
    AlignMeeting,
    /// Slack off on the clock.
    PaidSlack,
    /// Take the week easy.
    Rest,
    /// Write a status report.
    Report,
    /// Message leadership to build standing.
    ManageUp,
    /// Move to another project.
    Transfer(ProjectId),
    /// Take an NPC as a direct report. Requires `P7`.
    AddSubordinate(NpcId),
    /// Release a direct report.
    RemoveSubordinate(NpcId),
    /// Put one direct report to work on the player's project.
    AssignSubordinate(NpcId),
    /// Put every direct report to work.
    AssignAllSubordinates,
    /// Quit the company. Ends the game.
    Resign,
}

/// Why a legacy command string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    /// The command name is not recognized.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// The command requires an argument that was not supplied.
    #[error("command {0} requires an argument")]
    MissingArgument(String),
}

impl Command {
    /// Parse the legacy `cmd:name[:arg]` form. The `cmd:` prefix is optional.
    pub fn parse(raw: &str) -> Result<Self, CommandParseError> {
        let body = raw.trim();
        let body = body.strip_prefix("cmd:").unwrap_or(body);
        let (name, arg) = match body.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (body, None),
        };

        let required = |arg: Option<&str>| {
            arg.map(ToOwned::to_owned)
                .ok_or_else(|| CommandParseError::MissingArgument(name.to_owned()))
        };

        let command = match name {
            "eat_mifan" => Self::Eat("standard".to_owned()),
            "eat_mifan_light" => Self::Eat("light".to_owned()),
            "eat_mifan_luxury" => Self::Eat("luxury".to_owned()),
            "rice" | "eat" => Self::Eat(required(arg)?),
            "buy_gift" => Self::Shop("gift".to_owned()),
            "buy_gpu" => Self::Shop("gpu".to_owned()),
            "buy_monitor" => Self::Shop("monitor".to_owned()),
            "buy_chair" => Self::Shop("chair".to_owned()),
            "shop" => Self::Shop(required(arg)?),
            "learn_skill" => Self::Study("base".to_owned()),
            "train_hard" => Self::Study("hard_camp".to_owned()),
            "train_soft" => Self::Study("soft_workshop".to_owned()),
            "train_leadership" => Self::Study("leadership".to_owned()),
            "academy" | "study" => Self::Study(required(arg)?),
            "work_hard" => Self::WorkHard,
            "work_normal" => Self::WorkNormal,
            "tech_breakthrough" => Self::TechBreakthrough,
            "make_ppt" => Self::MakePpt,
            "align_meeting" => Self::AlignMeeting,
            "paid_slack" => Self::PaidSlack,
            "rest" => Self::Rest,
            "report" => Self::Report,
            "msg_boss" | "manage_up" => Self::ManageUp,
            "transfer" => Self::Transfer(ProjectId(required(arg)?)),
            "add_subordinate" => Self::AddSubordinate(NpcId(required(arg)?)),
            "remove_subordinate" => Self::RemoveSubordinate(NpcId(required(arg)?)),
            "sub_work" => Self::AssignSubordinate(NpcId(required(arg)?)),
            "sub_all_work" => Self::AssignAllSubordinates,
            "resign" => Self::Resign,
            other => return Err(CommandParseError::Unknown(other.to_owned())),
        };
        Ok(command)
    }

    /// Stable snake-case name, used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Eat(_) => "eat",
            Self::Shop(_) => "shop",
            Self::Study(_) => "study",
            Self::WorkHard => "work_hard",
            Self::WorkNormal => "work_normal",
            Self::TechBreakthrough => "tech_breakthrough",
            Self::MakePpt => "make_ppt",
            Self::AlignMeeting => "align_meeting",
            Self::PaidSlack => "paid_slack",
            Self::Rest => "rest",
            Self::Report => "report",
            Self::ManageUp => "manage_up",
            Self::Transfer(_) => "transfer",
            Self::AddSubordinate(_) => "add_subordinate",
            Self::RemoveSubordinate(_) => "remove_subordinate",
            Self::AssignSubordinate(_) => "assign_subordinate",
            Self::AssignAllSubordinates => "assign_all_subordinates",
            Self::Resign => "resign",
        }
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// What the player submitted this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionInput {
    /// Free text, classified by intent.
    Text(String),
    /// A structured command.
    Command(Command),
}

/// Body of a submit-action request.
///
/// Exactly one of `text`, `command`, or `raw_command` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActionRequest {
    /// Free-text action.
    #[validate(length(min = 1, max = 2000))]
    #[serde(default)]
    pub text: Option<String>,
    /// Typed command.
    #[serde(default)]
    pub command: Option<Command>,
    /// Legacy `cmd:name:arg` command string.
    #[validate(length(min = 1, max = 200))]
    #[serde(default)]
    pub raw_command: Option<String>,
    /// Target channel. Defaults to the group chat.
    #[serde(default)]
    #[ts(as = "String")]
    pub target: Channel,
}

/// Why an [`ActionRequest`] could not be turned into an [`ActionInput`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionRequestError {
    /// No action was supplied.
    #[error("request must contain text or a command")]
    Empty,

    /// More than one action was supplied.
    #[error("request must contain only one of text, command, raw_command")]
    Ambiguous,

    /// The legacy command string did not parse.
    #[error(transparent)]
    Command(#[from] CommandParseError),
}

impl ActionRequest {
    /// Resolve the payload into a single typed input.
    pub fn into_input(self) -> Result<(ActionInput, Channel), ActionRequestError> {
        let input = match (self.text, self.command, self.raw_command) {
            (Some(text), None, None) => {
                // A text body in the legacy command form is still a command.
                if text.trim_start().starts_with("cmd:") {
                    ActionInput::Command(Command::parse(&text)?)
                } else {
                    ActionInput::Text(text)
                }
            }
            (None, Some(command), None) => ActionInput::Command(command),
            (None, None, Some(raw)) => ActionInput::Command(Command::parse(&raw)?),
            (None, None, None) => return Err(ActionRequestError::Empty),
            _ => return Err(ActionRequestError::Ambiguous),
        };
        Ok((input, self.target))
    }
}

/// Body of an initialize-session request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct OnboardRequest {
    /// Player display name.
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    /// Job family.
    pub role: Role,
    /// Starting project key.
    #[validate(length(min = 1, max = 64))]
    pub project_id: String,
}
