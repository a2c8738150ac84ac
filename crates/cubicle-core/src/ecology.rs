//! Weekly NPC ecology: relationship drama and career moves.
//!
//! Only NPCs the player has met or manages are simulated. Each candidate
//! takes at most one path per week: a relation event, or failing that a
//! career transition roll.

use cubicle_types::{Level, NpcId, NpcStatus, ProjectId, RelationLabel};
use tracing::debug;

use crate::num::{pct_add, pct_sub};
use crate::org;
use crate::turn::Turn;

/// A career move drawn for one NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Leaves the company.
    Resign,
    /// Moves to another project.
    Transfer,
    /// Goes up one level.
    Promote,
}

/// Base weekly transition probability for an NPC.
pub fn base_probability(mood: i64, trust: i64, project_risk: Option<i64>) -> f64 {
    let mut p = 0.02;
    if mood <= 40 {
        p += 0.04;
    }
    if trust <= 30 {
        p += 0.03;
    }
    if project_risk.is_some_and(|r| r >= 70) {
        p += 0.05;
    }
    p
}

/// Probability that a related NPC triggers a relation event instead.
pub fn relation_probability(base: f64, project_risk: Option<i64>, level: Level) -> f64 {
    let mut p = base + 0.03;
    if project_risk.is_some_and(|r| r >= 70) {
        p += 0.03;
    }
    if level >= Level::P7 {
        p += 0.02;
    }
    p
}

/// Resign, transfer and promote weights.
pub fn transition_weights(project_risk: Option<i64>, level: Level) -> [f64; 3] {
    let [mut resign, mut transfer, mut promote] = [0.40, 0.35, 0.25];
    if project_risk.is_some_and(|r| r >= 70) {
        resign += 0.15;
        transfer += 0.10;
        promote -= 0.05;
    }
    if level >= Level::P7 {
        resign -= 0.05;
        promote += 0.15;
    }
    [resign, transfer, promote]
}

fn pick_transition(draw: f64, weights: [f64; 3]) -> Transition {
    let [resign, transfer, promote] = weights;
    let point = draw * (resign + transfer + promote);
    if point < resign {
        Transition::Resign
    } else if point < resign + transfer {
        Transition::Transfer
    } else {
        Transition::Promote
    }
}

/// Simulate one week of NPC ecology.
pub fn tick(turn: &mut Turn<'_>) {
    let mut candidates: Vec<NpcId> = turn.state.known_npcs.clone();
    for id in &turn.state.player_subordinates {
        if !candidates.contains(id) {
            candidates.push(id.clone());
        }
    }

    for id in candidates {
        let Some(npc) = turn.state.npcs.get(&id) else {
            debug!(npc = %id, "ecology skipped unknown npc");
            continue;
        };
        if !npc.is_employed() {
            continue;
        }
        let risk = turn.state.projects.get(&npc.project).map(|p| p.risk);
        let level = npc.level;
        let base = base_probability(npc.mood, npc.trust, risk);
        let related: Vec<(NpcId, RelationLabel)> = npc
            .relations
            .iter()
            .filter(|(other, _)| turn.state.npcs.get(*other).is_some_and(|o| o.is_employed()))
            .map(|(other, label)| (other.clone(), *label))
            .collect();

        if !related.is_empty() {
            let p = relation_probability(base, risk, level);
            if turn.unit() < p {
                if let Some((other, label)) = turn.pick(&related) {
                    relation_event(turn, &id, &other, label);
                }
                continue;
            }
        }

        if turn.unit() >= base {
            continue;
        }
        let draw = turn.unit();
        let transition = pick_transition(draw, transition_weights(risk, level));
        apply_transition(turn, &id, transition);
    }
}

fn relation_event(turn: &mut Turn<'_>, id: &NpcId, other_id: &NpcId, label: RelationLabel) {
    let player_project = turn.state.player.current_project.clone();
    let (Some(npc), Some(other)) = (turn.state.npcs.get(id), turn.state.npcs.get(other_id)) else {
        return;
    };
    let (name, other_name) = (npc.name.clone(), other.name.clone());
    let involves_player_project = npc.project == player_project || other.project == player_project;
    let shared_project = if npc.project.as_str().is_empty() {
        other.project.clone()
    } else {
        npc.project.clone()
    };
    let project_name = turn
        .state
        .projects
        .get(&shared_project)
        .map_or_else(|| shared_project.to_string(), |p| p.name.clone());

    let message = match label {
        RelationLabel::Rival => {
            for target in [id, other_id] {
                if let Some(n) = turn.state.npcs.get_mut(target) {
                    n.mood = pct_sub(n.mood, 4);
                }
            }
            if involves_player_project {
                turn.state.player.mood = pct_sub(turn.state.player.mood, 2);
            }
            format!("{name} and {other_name} clash again over {project_name}. The chat goes silent.")
        }
        RelationLabel::Ally => {
            for target in [id, other_id] {
                if let Some(n) = turn.state.npcs.get_mut(target) {
                    n.mood = pct_add(n.mood, 3);
                }
            }
            if shared_project == player_project {
                turn.state.player.mood = pct_add(turn.state.player.mood, 1);
            }
            format!("{name} and {other_name} cover for each other on {project_name}. Smooth teamwork.")
        }
    };
    debug!(npc = %id, other = %other_id, ?label, "relation event");
    org::mark_known(turn.state, other_id);
    turn.system(message);
}

fn apply_transition(turn: &mut Turn<'_>, id: &NpcId, transition: Transition) {
    let is_subordinate = turn.state.player_subordinates.contains(id);
    let message = match transition {
        Transition::Resign => {
            let Some(npc) = turn.state.npcs.get_mut(id) else {
                return;
            };
            npc.status = NpcStatus::Resigned;
            let name = npc.name.clone();
            if is_subordinate {
                turn.state.player_subordinates.retain(|s| s != id);
                turn.state.player.mood = pct_sub(turn.state.player.mood, 5);
            }
            format!("{name} handed in their notice and has left the company.")
        }
        Transition::Transfer => {
            let current = turn.state.npcs.get(id).map(|n| n.project.clone());
            let targets: Vec<ProjectId> = turn
                .state
                .projects
                .keys()
                .filter(|p| Some(*p) != current.as_ref())
                .cloned()
                .collect();
            let Some(target) = turn.pick(&targets) else {
                return;
            };
            let Some(npc) = turn.state.npcs.get_mut(id) else {
                return;
            };
            npc.project = target.clone();
            let name = npc.name.clone();
            if is_subordinate && target != turn.state.player.current_project {
                turn.state.player_subordinates.retain(|s| s != id);
                turn.state.player.mood = pct_sub(turn.state.player.mood, 3);
            }
            format!("{name} requested an internal transfer to {target}.")
        }
        Transition::Promote => {
            let Some(npc) = turn.state.npcs.get_mut(id) else {
                return;
            };
            let Some(next) = npc.level.next() else {
                return;
            };
            npc.level = next;
            npc.trust = pct_add(npc.trust, 5);
            format!("{} was promoted to {next}.", npc.name)
        }
    };
    debug!(npc = %id, ?transition, "npc career move");
    turn.system(message);
}
