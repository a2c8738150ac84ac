//! Intent effects: how a classified action turns into stat deltas.
//!
//! Every function here mutates the player and, when one is active, the
//! player's current project, then re-clamps. Insufficient resources never
//! block an action. WORK and LEARN may push energy and money negative, which
//! the game-over check picks up later.

use cubicle_types::{GameState, Intent, Player, Project, ProjectStatus, Role};
use tracing::debug;

use crate::intent::{clamp_magnitude, mentions_any};
use crate::num::{pct, pct_add, pct_sub, real, trunc};
use crate::project;
use crate::turn::Turn;

const BOSS_WORDS: &[&str] = &["领导", "老板", "boss", "manager"];
const GOSSIP_WORDS: &[&str] = &["摸鱼", "八卦", "吃瓜", "gossip"];
const COOPERATIVE_WORDS: &[&str] = &[
    "对齐", "汇报", "同步", "沟通", "茶歇", "@", "私聊", "align", "sync", "report",
];

/// Clamp the player's bounded stats. Energy keeps any negative value.
pub fn clamp_player(player: &mut Player) {
    player.mood = pct(player.mood);
    player.energy = player.energy.min(player.max_energy);
    player.political_capital = player.political_capital.max(0);
}

/// The player and their project, unless that project is canceled or missing.
pub(crate) fn player_and_project(state: &mut GameState) -> (&mut Player, Option<&mut Project>) {
    let GameState {
        player, projects, ..
    } = state;
    let project = projects
        .get_mut(&player.current_project)
        .filter(|p| p.status != ProjectStatus::Canceled);
    (player, project)
}

/// KPI multiplier from desk upgrades.
pub fn gear_bonus(player: &Player) -> f64 {
    let gear = player.gear;
    1.0 + 0.05 * f64::from(gear.gpu) + 0.03 * f64::from(gear.monitor) + 0.02 * f64::from(gear.chair)
}

/// Apply one intent and return the narrative line (empty for small talk).
///
/// A milestone is settled afterwards if the project crossed 100 progress.
pub fn apply(turn: &mut Turn<'_>, intent: Intent, magnitude: f64, text: &str) -> String {
    let magnitude = clamp_magnitude(magnitude);
    let narrative = match intent {
        Intent::Work => work(turn.state, magnitude).narrative,
        Intent::Shop => shop(turn.state, magnitude),
        Intent::Refuse => refuse(turn.state, magnitude),
        Intent::Learn => learn(turn.state, magnitude),
        Intent::Attack => attack(turn.state, magnitude),
        Intent::SmallTalk => social(turn.state, magnitude, text),
    };
    debug!(intent = intent.as_str(), magnitude, "effects applied");
    project::settle_current_milestone(turn);
    narrative
}

/// What a WORK action produced, for handlers that layer extras on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOutcome {
    /// Player-facing summary.
    pub narrative: String,
    /// KPI earned.
    pub kpi_gain: i64,
}

/// WORK. Does not settle milestones; callers go through [`apply`] or settle
/// themselves after layering extra progress.
pub fn work(state: &mut GameState, magnitude: f64) -> WorkOutcome {
    let modifiers = state.modifiers;
    let (player, project) = player_and_project(state);

    let energy_cost = trunc(10.0 * magnitude);
    let mood_cost: i64 = if magnitude >= 1.3 {
        5
    } else if magnitude < 1.0 {
        1
    } else {
        2
    };
    let mood_factor = if player.mood > 0 {
        real(player.mood) / 100.0
    } else {
        0.1
    };
    let kpi_gain = trunc(
        (10.0
            * (real(player.hard_skill) / 50.0)
            * player.learning_rate
            * mood_factor
            * magnitude
            * gear_bonus(player)
            * modifiers.kpi)
            .floor(),
    )
    .max(0);

    player.energy = player.energy.saturating_sub(energy_cost);
    player.mood = pct_sub(player.mood, mood_cost);
    player.kpi = player.kpi.saturating_add(kpi_gain);

    let verb = if magnitude >= 1.3 {
        "You crunch hard"
    } else {
        "You put in a solid stretch of work"
    };
    let narrative =
        format!("{verb}. Energy -{energy_cost}, mood -{mood_cost}, KPI +{kpi_gain}.");

    if let Some(project) = project {
        let hard = real(player.hard_skill);
        let soft = real(player.soft_skill);
        let base_progress = trunc(real(kpi_gain) / 8.0 * magnitude).max(2);
        let progress_gain = match player.role {
            Role::Dev => base_progress.saturating_add(1),
            Role::Product => base_progress,
            Role::Ops => base_progress.saturating_sub(1).max(1),
        };
        let mut risk_reduction = match player.role {
            Role::Ops => trunc(soft / 20.0).max(1),
            Role::Product => trunc(soft / 24.0).max(1),
            Role::Dev => trunc(hard / 45.0).max(1),
        };
        if magnitude >= 1.3 {
            risk_reduction = risk_reduction.saturating_sub(trunc(2.0 * modifiers.risk));
        }
        let (morale_gain, trust_gain) = match player.role {
            Role::Product => (trunc(soft / 20.0 * magnitude), trunc(soft / 35.0 * magnitude)),
            Role::Ops => (trunc(soft / 25.0 * magnitude), trunc(soft / 40.0 * magnitude)),
            Role::Dev => (trunc(soft / 50.0 * magnitude), trunc(hard / 80.0 * magnitude)),
        };

        project::add_progress(project, progress_gain);
        project.risk = pct_sub(project.risk, risk_reduction);
        project.morale = pct_add(project.morale, morale_gain.max(0));
        project.stakeholder_trust = pct_add(project.stakeholder_trust, trust_gain.max(0));
        if risk_reduction > 0 {
            player.political_capital = player.political_capital.saturating_add(risk_reduction / 3);
        }
        project.progress = project.progress.clamp(0, project::MILESTONE);
    }
    clamp_player(player);

    WorkOutcome {
        narrative,
        kpi_gain,
    }
}

fn shop(state: &mut GameState, magnitude: f64) -> String {
    let (player, project) = player_and_project(state);
    let mag = magnitude.max(0.5);
    let cost = trunc(40.0 * mag);
    let energy_gain = trunc(20.0 * mag);
    let mood_gain = trunc(3.0 + real(player.mood) / 50.0).max(1);

    player.money = player.money.saturating_sub(cost);
    player.energy = player.energy.saturating_add(energy_gain);
    player.mood = pct_add(player.mood, mood_gain);

    if let Some(project) = project {
        project.morale = pct_add(project.morale, (mood_gain / 2).max(0));
        if player.soft_skill >= 70 {
            project.risk = pct_add(project.risk, -1);
        } else if player.soft_skill <= 40 {
            project.risk = pct_add(project.risk, 1);
        }
    }
    clamp_player(player);
    format!("You treat yourself to something nice. Money -{cost}, energy +{energy_gain}, mood +{mood_gain}.")
}

fn refuse(state: &mut GameState, magnitude: f64) -> String {
    let (player, project) = player_and_project(state);
    let mag = magnitude.max(0.5);
    let energy_gain = trunc(4.0 * mag);
    let mood_gain = trunc(2.0 * mag).max(1);

    player.energy = player.energy.saturating_add(energy_gain);
    player.mood = pct_add(player.mood, mood_gain);

    if let Some(project) = project {
        let importance = 1.0 + real(player.hard_skill) / 80.0;
        let progress_loss = trunc(2.0 * mag * importance).max(0);
        project.progress = project.progress.saturating_sub(progress_loss).max(0);
        let risk_add =
            trunc(1.5 * mag * (1.0 + real(100_i64.saturating_sub(player.soft_skill)) / 100.0)).max(1);
        project.risk = pct_add(project.risk, risk_add);
        project.morale = pct_sub(project.morale, trunc(mag).max(0));
    }
    clamp_player(player);
    format!("You step away from work for a while. Energy +{energy_gain}, mood +{mood_gain}.")
}

fn learn(state: &mut GameState, magnitude: f64) -> String {
    let (player, project) = player_and_project(state);
    let mag = magnitude.max(0.5);
    let cost = trunc(80.0 * mag);
    let energy_cost = trunc(20.0 * mag);

    player.money = player.money.saturating_sub(cost);
    player.energy = player.energy.saturating_sub(energy_cost);
    let skill = if player.role == Role::Product {
        player.soft_skill = player.soft_skill.saturating_add(1);
        "soft skill"
    } else {
        player.hard_skill = player.hard_skill.saturating_add(1);
        "hard skill"
    };

    if let Some(project) = project {
        let hard = real(player.hard_skill);
        let soft = real(player.soft_skill);
        let (risk_reduction, trust_gain) = if player.role == Role::Product {
            (trunc(soft / 32.0 * mag).max(1), trunc(soft / 50.0 * mag).max(0))
        } else {
            (trunc(hard / 50.0 * mag).max(1), trunc(soft / 60.0 * mag).max(0))
        };
        let progress_gain = trunc(mag).max(1);
        project.progress = project
            .progress
            .saturating_add(progress_gain)
            .min(project::MILESTONE);
        project.risk = pct_sub(project.risk, risk_reduction);
        project.stakeholder_trust = pct_add(project.stakeholder_trust, trust_gain);
    }
    clamp_player(player);
    format!("You carve out time to study. {skill} +1, energy -{energy_cost}, money -{cost}.")
}

fn attack(state: &mut GameState, magnitude: f64) -> String {
    let (player, project) = player_and_project(state);
    let mag = magnitude.max(0.5);
    let soft_mod = if player.soft_skill <= 40 {
        1.3
    } else if player.soft_skill >= 70 {
        0.8
    } else {
        1.0
    };
    let trust_drop = trunc(3.0 * mag * soft_mod).max(1);
    let mood_cost = trunc(2.0 * mag).max(1);

    player.mood = pct_sub(player.mood, mood_cost);
    player.political_capital = player.political_capital.saturating_sub(trust_drop / 3);

    if let Some(project) = project {
        project.stakeholder_trust = pct_sub(project.stakeholder_trust, trust_drop);
        project.risk = pct_add(project.risk, trunc(2.0 * mag).max(1));
        project.morale = pct_sub(project.morale, trunc(mag).max(1));
    }
    clamp_player(player);
    format!("You pick a fight and the room goes cold. Mood -{mood_cost}.")
}

fn social(state: &mut GameState, magnitude: f64, text: &str) -> String {
    let (player, project) = player_and_project(state);
    let (mood_delta, energy_delta) = if mentions_any(text, BOSS_WORDS) {
        (1, -3)
    } else if mentions_any(text, GOSSIP_WORDS) {
        (2, -1)
    } else {
        (1, -2)
    };
    player.mood = pct_add(player.mood, mood_delta);
    player.energy = player
        .energy
        .saturating_add(energy_delta)
        .clamp(0, player.max_energy.max(0));

    if let Some(project) = project {
        let mut gain = trunc(real(player.soft_skill) / 30.0 * magnitude.max(0.8)).max(0);
        if mentions_any(text, COOPERATIVE_WORDS) {
            gain = gain.max(trunc(real(gain) * 1.2));
        }
        project.stakeholder_trust = pct_add(project.stakeholder_trust, gain);
    }
    clamp_player(player);
    String::new()
}
