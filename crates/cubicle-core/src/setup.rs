//! Building a fresh session state and onboarding the player.
//!
//! Every entity is cloned from its catalog template, so sessions never
//! share mutable state with each other or with the catalog.

use std::collections::{BTreeMap, BTreeSet};

use cubicle_types::{
    GameState, GearLevels, GlobalModifiers, Level, OnboardRequest, Player, ProjectId, Role,
};
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::clock::Calendar;
use crate::events;
use crate::org;
use crate::session::SessionError;
use crate::turn::Turn;

/// Starting stats for one role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    /// Starting hard skill.
    pub hard_skill: i64,
    /// Starting soft skill.
    pub soft_skill: i64,
    /// Energy cap, and starting energy.
    pub max_energy: i64,
    /// Starting savings.
    pub money: i64,
    /// Skill growth multiplier.
    pub learning_rate: f64,
}

/// Starting stats for `role`.
pub const fn profile(role: Role) -> RoleProfile {
    match role {
        Role::Product => RoleProfile {
            hard_skill: 30,
            soft_skill: 70,
            max_energy: 100,
            money: 5000,
            learning_rate: 1.1,
        },
        Role::Dev => RoleProfile {
            hard_skill: 70,
            soft_skill: 30,
            max_energy: 120,
            money: 5000,
            learning_rate: 1.0,
        },
        Role::Ops => RoleProfile {
            hard_skill: 50,
            soft_skill: 50,
            max_energy: 100,
            money: 8000,
            learning_rate: 1.0,
        },
    }
}

fn new_player(name: &str, role: Role, project: ProjectId) -> Player {
    let stats = profile(role);
    Player {
        name: name.to_owned(),
        role,
        level: Level::P5,
        leader_id: None,
        learning_rate: stats.learning_rate,
        max_energy: stats.max_energy,
        energy: stats.max_energy,
        mood: 80,
        hard_skill: stats.hard_skill,
        soft_skill: stats.soft_skill,
        gear: GearLevels::default(),
        kpi: 0,
        political_capital: 0,
        money: stats.money,
        current_project: project,
        participated_live_projects: BTreeSet::new(),
        launched_projects: BTreeSet::new(),
        major_accidents: 0,
        purchases: BTreeMap::new(),
    }
}

/// Build the week-1 state for a new player.
///
/// # Errors
///
/// Returns [`SessionError::EmptyName`] for a blank name and
/// [`SessionError::UnknownProject`] when the starting project is not in the
/// catalog.
pub fn initial_state<R: Rng + ?Sized>(
    catalog: &Catalog,
    request: &OnboardRequest,
    rng: &mut R,
    calendar: Calendar,
) -> Result<GameState, SessionError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    let project_id = request.project_id.trim();
    let Some(template) = catalog.project(project_id) else {
        return Err(SessionError::UnknownProject {
            project_id: project_id.to_owned(),
        });
    };

    let projects = catalog
        .projects
        .iter()
        .map(|t| (t.id.clone(), t.instantiate()))
        .collect();
    let mut npcs: BTreeMap<_, _> = catalog
        .npcs
        .iter()
        .map(|t| (t.id.clone(), t.instantiate()))
        .collect();
    org::seed_relations(&mut npcs, rng);

    let mut state = GameState {
        player: new_player(name, request.role, template.id.clone()),
        projects,
        npcs,
        week: 1,
        year: 1,
        quarter: 1,
        chat_history: Vec::new(),
        workbench_feedback: Vec::new(),
        modifiers: GlobalModifiers::default(),
        memory_facts: Vec::new(),
        known_npcs: Vec::new(),
        player_subordinates: Vec::new(),
        active_global_event: None,
        review: None,
        game_over: false,
        ending: None,
    };
    calendar.sync(&mut state);
    debug!(
        projects = state.projects.len(),
        npcs = state.npcs.len(),
        "session state cloned from catalog"
    );
    Ok(state)
}

fn first_task(role: Role, project: &str) -> String {
    match role {
        Role::Product => format!(
            "Welcome aboard. Please draft the requirements for the next {project} version and walk me through them on Friday."
        ),
        Role::Dev => format!(
            "Welcome. Grab the top crash from the {project} bug tracker and get the build green this week."
        ),
        Role::Ops => format!(
            "Welcome. Put together a plan for the next {project} live event and send me the numbers you expect."
        ),
    }
}

/// Post the welcome, announce leadership, and roll the opening event.
pub fn onboard(turn: &mut Turn<'_>) {
    let project_id = turn.state.player.current_project.clone();
    let project_name = turn
        .state
        .current_project()
        .map_or_else(|| project_id.to_string(), |p| p.name.clone());
    let role = turn.state.player.role;
    let name = turn.state.player.name.clone();
    turn.system(format!(
        "Welcome to the company, {name}. You join {project_name} as a {} at {}.",
        role.as_str(),
        turn.state.player.level
    ));

    let leader = org::project_leader(turn.state, &project_id);
    let manager = org::direct_manager(turn.state, &project_id, turn.state.player.level);
    let describe = |id: Option<&cubicle_types::NpcId>| {
        id.and_then(|id| turn.state.npcs.get(id))
            .map(|n| format!("{} ({})", n.name, n.role))
    };
    if let Some(leader_line) = describe(leader.as_ref()) {
        let manager_line = describe(manager.as_ref()).unwrap_or_else(|| leader_line.clone());
        turn.system(format!(
            "Project lead: {leader_line}. Your direct manager: {manager_line}."
        ));
    }

    let reports_to = manager.or(leader);
    turn.state.player.leader_id.clone_from(&reports_to);
    if let Some(id) = &reports_to {
        org::mark_known(turn.state, id);
        if let Some(speaker) = turn.state.npcs.get(id).map(|n| n.name.clone()) {
            turn.npc_says(speaker, first_task(role, &project_name));
        }
    }
    info!(
        player = %name,
        role = role.as_str(),
        project = %project_id,
        leader = ?reports_to,
        "player onboarded"
    );

    let chance = turn.config.init_event_chance;
    events::maybe_random(turn, chance);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cubicle_types::NpcId;

    use super::*;
    use crate::testkit::Fixture;

    #[test]
    fn dev_on_genshin_starts_with_role_stats() {
        let fx = Fixture::seeded(3);
        let player = &fx.state.player;
        assert_eq!(player.hard_skill, 70);
        assert_eq!(player.soft_skill, 30);
        assert_eq!(player.max_energy, 120);
        assert_eq!(player.energy, 120);
        assert_eq!(player.money, 5000);
        assert_eq!(player.level, Level::P5);
        assert_eq!(fx.state.week, 1);
        assert_eq!(fx.state.quarter, 1);
    }

    #[test]
    fn profiles_differ_by_role() {
        assert!((profile(Role::Product).learning_rate - 1.1).abs() < 1e-9);
        assert_eq!(profile(Role::Ops).money, 8000);
        assert_eq!(profile(Role::Product).soft_skill, 70);
    }

    #[test]
    fn manager_becomes_leader_and_is_known() {
        let fx = Fixture::seeded(3);
        let manager = NpcId::from("NPC_0013");
        assert_eq!(fx.state.player.leader_id, Some(manager.clone()));
        assert!(fx.state.npcs.get(&manager).unwrap().known);
        assert!(fx.state.known_npcs.contains(&manager));
        let task = fx.state.chat_history.last().unwrap();
        assert!(task.content.contains("bug tracker"), "{}", task.content);
    }

    #[test]
    fn unknown_project_and_blank_name_are_rejected() {
        let fx = Fixture::seeded(3);
        let calendar = Calendar::new(&fx.config).unwrap();
        let mut rng = rand::rng();
        let bad_project = OnboardRequest {
            name: "Ada".to_owned(),
            role: Role::Dev,
            project_id: "General".to_owned(),
        };
        assert!(matches!(
            initial_state(&fx.catalog, &bad_project, &mut rng, calendar),
            Err(SessionError::UnknownProject { .. })
        ));
        let blank = OnboardRequest {
            name: "  ".to_owned(),
            role: Role::Dev,
            project_id: "Genshin".to_owned(),
        };
        assert!(matches!(
            initial_state(&fx.catalog, &blank, &mut rng, calendar),
            Err(SessionError::EmptyName)
        ));
    }

    #[test]
    fn relations_are_symmetric() {
        let fx = Fixture::seeded(11);
        for npc in fx.state.npcs.values() {
            for (other, label) in &npc.relations {
                let back = fx.state.npcs.get(other).unwrap().relations.get(&npc.id);
                assert_eq!(back, Some(label));
            }
        }
    }

    #[test]
    fn fresh_state_ignores_earlier_sessions() {
        let mut first = Fixture::seeded(9);
        first.state.projects.values_mut().for_each(|p| p.risk = 99);
        first.state.npcs.values_mut().for_each(|n| n.trust = 0);
        let second = Fixture::seeded(9);
        let genshin = second.state.projects.get(&ProjectId::from("Genshin")).unwrap();
        assert_eq!(genshin.risk, 25);
        assert_eq!(second.state.npcs.get(&NpcId::from("NPC_0001")).unwrap().trust, 45);
    }
}
