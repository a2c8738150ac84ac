//! Static content catalogs.
//!
//! Every table is authored as YAML under `data/` and embedded at compile
//! time. A [`Catalog`] is immutable once built; sessions clone entities out
//! of the templates and never alias them, so one session can never leak
//! state into another.

use std::collections::BTreeSet;

use cubicle_types::{
    GlobalEffect, Level, Npc, NpcId, NpcStatus, Project, ProjectId, ProjectStatus, ProjectType,
};
use serde::Deserialize;

const PROJECTS_YAML: &str = include_str!("../data/projects.yaml");
const NPCS_YAML: &str = include_str!("../data/npcs.yaml");
const MEALS_YAML: &str = include_str!("../data/meals.yaml");
const SHOP_YAML: &str = include_str!("../data/shop.yaml");
const COURSES_YAML: &str = include_str!("../data/courses.yaml");
const RANDOM_EVENTS_YAML: &str = include_str!("../data/random_events.yaml");
const QUARTERLY_YAML: &str = include_str!("../data/quarterly.yaml");
const GLOBAL_EVENTS_YAML: &str = include_str!("../data/global_events.yaml");

/// Errors raised while building a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A table failed to deserialize.
    #[error("failed to parse {table} catalog: {source}")]
    Yaml {
        /// Which table.
        table: &'static str,
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// A table that must have entries is empty.
    #[error("{table} catalog is empty")]
    Empty {
        /// Which table.
        table: &'static str,
    },

    /// Two entries share an id.
    #[error("duplicate id {id:?} in {table} catalog")]
    DuplicateId {
        /// Which table.
        table: &'static str,
        /// The repeated id.
        id: String,
    },

    /// An entry holds an out-of-range value.
    #[error("invalid entry {id:?} in {table} catalog: {reason}")]
    Invalid {
        /// Which table.
        table: &'static str,
        /// The offending entry.
        id: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Entity templates
// ---------------------------------------------------------------------------

/// A starting project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectTemplate {
    /// Catalog key.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Product category.
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    /// Starting status.
    pub status: ProjectStatus,
    /// 1..=5.
    pub difficulty: u8,
    /// Starting risk.
    pub risk: i64,
}

impl ProjectTemplate {
    /// Build a fresh project with default morale, trust, and counters.
    pub fn instantiate(&self) -> Project {
        Project {
            id: self.id.clone(),
            name: self.name.clone(),
            project_type: self.project_type,
            status: self.status,
            difficulty: self.difficulty,
            risk: self.risk.clamp(0, 100),
            progress: 0,
            revenue: 0,
            morale: 80,
            stakeholder_trust: 50,
        }
    }
}

/// A colleague as authored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NpcTemplate {
    /// Catalog key.
    pub id: NpcId,
    /// Display name.
    pub name: String,
    /// Free-text title.
    pub role: String,
    /// Free-text traits.
    #[serde(default)]
    pub traits: String,
    /// Affiliation.
    pub project: ProjectId,
    /// Starting rank.
    #[serde(default = "default_npc_level")]
    pub level: Level,
    /// Starting trust in the player.
    #[serde(default = "default_npc_trust")]
    pub trust: i64,
    /// Starting mood.
    #[serde(default = "default_npc_mood")]
    pub mood: i64,
}

impl NpcTemplate {
    /// Build a fresh NPC with no relations.
    pub fn instantiate(&self) -> Npc {
        Npc {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            traits: self.traits.clone(),
            project: self.project.clone(),
            trust: self.trust.clamp(0, 100),
            mood: self.mood.clamp(0, 100),
            level: self.level,
            status: NpcStatus::Employed,
            relations: std::collections::BTreeMap::new(),
            known: false,
            manager_id: None,
        }
    }
}

const fn default_npc_level() -> Level {
    Level::P6
}

const fn default_npc_trust() -> i64 {
    50
}

const fn default_npc_mood() -> i64 {
    80
}

// ---------------------------------------------------------------------------
// Purchasable items
// ---------------------------------------------------------------------------

/// Which store an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Store {
    /// Canteen meals.
    Meal,
    /// Company store.
    Shop,
    /// Academy courses.
    Course,
}

impl Store {
    /// Prefix used for purchase counters.
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Shop => "shop",
            Self::Course => "course",
        }
    }
}

/// A meal, shop item, or course.
///
/// Stat fields are deltas applied on purchase; absent fields are zero.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreItem {
    /// Catalog key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Money cost.
    pub cost: i64,
    /// Lowest level allowed to buy.
    #[serde(default)]
    pub min_level: Level,
    /// Lifetime purchase cap.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Energy restored (meals, shop).
    #[serde(default)]
    pub energy: i64,
    /// Energy spent (courses).
    #[serde(default)]
    pub energy_cost: i64,
    /// Mood delta.
    #[serde(default)]
    pub mood: i64,
    /// Hard skill delta.
    #[serde(default)]
    pub hard_skill: i64,
    /// Soft skill delta.
    #[serde(default)]
    pub soft_skill: i64,
    /// Political capital delta.
    #[serde(default)]
    pub political_capital: i64,
    /// Learning-rate bonus on a successful roll.
    #[serde(default)]
    pub learning_rate_delta: f64,
    /// Chance of the learning-rate bonus.
    #[serde(default)]
    pub learning_rate_chance: f64,
    /// Purchase flavor text.
    #[serde(default)]
    pub desc: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Stat deltas carried by a random flavor event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EventEffects {
    /// Player mood.
    #[serde(default)]
    pub mood: i64,
    /// Player energy.
    #[serde(default)]
    pub energy: i64,
    /// Player money.
    #[serde(default)]
    pub money: i64,
    /// Player political capital.
    #[serde(default)]
    pub political_capital: i64,
    /// Active project risk.
    #[serde(default)]
    pub risk: i64,
    /// Active project progress.
    #[serde(default)]
    pub progress: i64,
    /// Active project morale.
    #[serde(default)]
    pub morale: i64,
}

/// A per-turn flavor event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RandomEvent {
    /// Catalog key.
    pub id: String,
    /// Text shown to the player.
    pub message: String,
    /// Lowest player level that sees it.
    #[serde(default)]
    pub min_level: Level,
    /// `General` or a specific project.
    pub project: ProjectId,
    /// Deltas.
    #[serde(default)]
    pub effects: EventEffects,
}

impl RandomEvent {
    /// Whether a player at `level` on `project` can see this event.
    pub fn eligible(&self, level: Level, project: &ProjectId) -> bool {
        level >= self.min_level
            && (self.project.as_str() == ProjectId::GENERAL || &self.project == project)
    }
}

/// A quarterly macro modifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuarterlyEvent {
    /// Headline.
    pub name: String,
    /// Body text.
    pub description: String,
    /// KPI multiplier.
    pub kpi: f64,
    /// Risk multiplier.
    pub risk: f64,
    /// Revenue multiplier.
    pub revenue: f64,
}

/// Scope of a global disruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalEventKind {
    /// Affects only the player.
    Personal,
    /// Company-wide.
    Company,
    /// Requires an active project.
    Project,
}

/// A global disruption and its trigger filters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlobalEventTemplate {
    /// Catalog key.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Scope.
    pub kind: GlobalEventKind,
    /// Bespoke handler. `None` only logs the description.
    #[serde(default)]
    pub effect: Option<GlobalEffect>,
    /// Earliest week.
    #[serde(default)]
    pub min_week: Option<u32>,
    /// Latest week.
    #[serde(default)]
    pub max_week: Option<u32>,
    /// Lowest player mood.
    #[serde(default)]
    pub min_mood: Option<i64>,
    /// Highest player mood.
    #[serde(default)]
    pub max_mood: Option<i64>,
    /// Lowest player energy.
    #[serde(default)]
    pub min_energy: Option<i64>,
    /// Highest player energy.
    #[serde(default)]
    pub max_energy: Option<i64>,
}

impl GlobalEventTemplate {
    /// Whether the week, mood, and energy filters admit the current state.
    pub fn eligible(&self, week: u32, mood: i64, energy: i64, has_project: bool) -> bool {
        let within = |value: i64, min: Option<i64>, max: Option<i64>| {
            min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m)
        };
        self.min_week.is_none_or(|w| week >= w)
            && self.max_week.is_none_or(|w| week <= w)
            && within(mood, self.min_mood, self.max_mood)
            && within(energy, self.min_energy, self.max_energy)
            && (self.kind != GlobalEventKind::Project || has_project)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// All static content tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Starting projects.
    pub projects: Vec<ProjectTemplate>,
    /// Colleagues.
    pub npcs: Vec<NpcTemplate>,
    /// Canteen menu.
    pub meals: Vec<StoreItem>,
    /// Company store.
    pub shop: Vec<StoreItem>,
    /// Academy.
    pub courses: Vec<StoreItem>,
    /// Flavor events.
    pub random_events: Vec<RandomEvent>,
    /// Quarterly modifiers.
    pub quarterly_events: Vec<QuarterlyEvent>,
    /// Global disruptions.
    pub global_events: Vec<GlobalEventTemplate>,
}

impl Catalog {
    /// Parse and validate the embedded tables.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if a table fails to parse, is empty, or
    /// holds duplicate or out-of-range entries.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog = Self {
            projects: parse_table("projects", PROJECTS_YAML)?,
            npcs: parse_table("npcs", NPCS_YAML)?,
            meals: parse_table("meals", MEALS_YAML)?,
            shop: parse_table("shop", SHOP_YAML)?,
            courses: parse_table("courses", COURSES_YAML)?,
            random_events: parse_table("random_events", RANDOM_EVENTS_YAML)?,
            quarterly_events: parse_table("quarterly", QUARTERLY_YAML)?,
            global_events: parse_table("global_events", GLOBAL_EVENTS_YAML)?,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        non_empty("projects", &self.projects)?;
        non_empty("npcs", &self.npcs)?;
        non_empty("quarterly", &self.quarterly_events)?;

        unique_ids("projects", self.projects.iter().map(|p| p.id.as_str()))?;
        unique_ids("npcs", self.npcs.iter().map(|n| n.id.as_str()))?;
        unique_ids("meals", self.meals.iter().map(|i| i.id.as_str()))?;
        unique_ids("shop", self.shop.iter().map(|i| i.id.as_str()))?;
        unique_ids("courses", self.courses.iter().map(|i| i.id.as_str()))?;
        unique_ids("random_events", self.random_events.iter().map(|e| e.id.as_str()))?;
        unique_ids("global_events", self.global_events.iter().map(|e| e.id.as_str()))?;

        for project in &self.projects {
            if !(1..=5).contains(&project.difficulty) {
                return Err(CatalogError::Invalid {
                    table: "projects",
                    id: project.id.to_string(),
                    reason: format!("difficulty {} outside 1..=5", project.difficulty),
                });
            }
        }
        Ok(())
    }

    /// Look up a starting project.
    pub fn project(&self, id: &str) -> Option<&ProjectTemplate> {
        self.projects.iter().find(|p| p.id.as_str() == id)
    }

    /// Look up an item in one of the stores.
    pub fn item(&self, store: Store, id: &str) -> Option<&StoreItem> {
        let table = match store {
            Store::Meal => &self.meals,
            Store::Shop => &self.shop,
            Store::Course => &self.courses,
        };
        table.iter().find(|item| item.id == id)
    }
}

fn parse_table<T: serde::de::DeserializeOwned>(
    table: &'static str,
    yaml: &str,
) -> Result<Vec<T>, CatalogError> {
    serde_yml::from_str(yaml).map_err(|source| CatalogError::Yaml { table, source })
}

fn non_empty<T>(table: &'static str, entries: &[T]) -> Result<(), CatalogError> {
    if entries.is_empty() {
        Err(CatalogError::Empty { table })
    } else {
        Ok(())
    }
}

fn unique_ids<'a>(
    table: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                table,
                id: id.to_owned(),
            });
        }
    }
    Ok(())
}
