//! Game-over evaluation.
//!
//! Causes are checked in a fixed priority order and the first match wins.
//! Once set, `game_over` is never cleared within a session.

use cubicle_types::{Ending, GameState, ProjectStatus};
use tracing::info;

use crate::org;
use crate::turn::Turn;

/// Chance that chronic low mood and energy end the game on a given check.
pub const BREAKDOWN_CHANCE: f64 = 0.3;

fn depletion(state: &GameState) -> Option<Ending> {
    let player = &state.player;
    if player.energy <= 0 {
        Some(Ending::Exhausted)
    } else if player.money < 0 {
        Some(Ending::Bankrupt)
    } else if player.mood <= 0 {
        Some(Ending::Depressed)
    } else {
        None
    }
}

fn chronic_low(state: &GameState) -> bool {
    state.player.mood <= 10 && state.player.energy <= 20
}

fn social_collapse(state: &GameState) -> Option<Ending> {
    let fired = org::top_executives(state)
        .iter()
        .filter_map(|id| state.npcs.get(id))
        .any(|npc| npc.trust <= 0);
    if fired {
        return Some(Ending::Fired);
    }
    let leader_lost = state
        .player
        .leader_id
        .as_ref()
        .and_then(|id| state.npcs.get(id))
        .is_some_and(|npc| npc.trust <= 0);
    leader_lost.then_some(Ending::Pip)
}

fn project_collapse(state: &GameState) -> Option<Ending> {
    let project = state
        .current_project()
        .filter(|p| p.status != ProjectStatus::Canceled)?;
    if project.risk >= 95 && project.morale <= 10 {
        Some(Ending::ProjectCollapse)
    } else if project.stakeholder_trust <= 0 {
        Some(Ending::ProjectCancelled)
    } else {
        None
    }
}

fn survival(state: &GameState, survival_week: u32) -> Option<Ending> {
    if state.week < survival_week {
        return None;
    }
    let player = &state.player;
    let ending = if player.kpi >= 5000 && player.political_capital >= 30 {
        Ending::Executive
    } else if player.money >= 60_000 {
        Ending::Rich
    } else if state.total_revenue() >= 100_000 && player.kpi >= 3500 {
        Ending::Producer
    } else {
        Ending::Stable
    };
    Some(ending)
}

/// Run the game-over check and finish the game on a match.
///
/// Skipped while a global event is active. Returns the ending, including
/// one set by an earlier check.
pub fn check(turn: &mut Turn<'_>) -> Option<Ending> {
    if turn.state.game_over {
        return turn.state.ending;
    }
    if turn.state.active_global_event.is_some() {
        return None;
    }

    let mut ending = depletion(turn.state);
    if ending.is_none() && chronic_low(turn.state) && turn.chance(BREAKDOWN_CHANCE) {
        ending = Some(Ending::Breakdown);
    }
    let ending = ending
        .or_else(|| social_collapse(turn.state))
        .or_else(|| project_collapse(turn.state))
        .or_else(|| survival(turn.state, turn.config.survival_week))?;
    finish(turn, ending);
    Some(ending)
}

/// Mark the game as over with `ending` and post its narrative.
pub fn finish(turn: &mut Turn<'_>, ending: Ending) {
    if turn.state.game_over {
        return;
    }
    turn.state.game_over = true;
    turn.state.ending = Some(ending);
    let player = &turn.state.player;
    info!(
        ?ending,
        week = turn.state.week,
        level = %player.level,
        kpi = player.kpi,
        money = player.money,
        "game over"
    );
    turn.system(ending.narrative());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cubicle_types::{ActiveGlobalEvent, NpcId};

    use super::*;
    use crate::testkit::Fixture;

    #[test]
    fn negative_money_is_bankrupt() {
        let mut fx = Fixture::seeded(1);
        fx.state.player.money = -1;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Bankrupt));
        assert!(fx.state.game_over);
        assert_eq!(fx.state.ending, Some(Ending::Bankrupt));
        assert_eq!(
            fx.state.chat_history.last().unwrap().content,
            Ending::Bankrupt.narrative()
        );
    }

    #[test]
    fn depletion_outranks_social_collapse() {
        let mut fx = Fixture::seeded(1);
        fx.state.player.energy = 0;
        fx.state.npcs.get_mut(&NpcId::from("NPC_0001")).unwrap().trust = 0;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Exhausted));
    }

    #[test]
    fn executive_distrust_fires_before_pip() {
        let mut fx = Fixture::seeded(1);
        fx.state.npcs.get_mut(&NpcId::from("NPC_0001")).unwrap().trust = 0;
        let leader = fx.state.player.leader_id.clone().unwrap();
        fx.state.npcs.get_mut(&leader).unwrap().trust = 0;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Fired));
    }

    #[test]
    fn manager_distrust_is_pip() {
        let mut fx = Fixture::seeded(1);
        let leader = fx.state.player.leader_id.clone().unwrap();
        fx.state.npcs.get_mut(&leader).unwrap().trust = 0;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Pip));
    }

    #[test]
    fn project_collapse_and_cancellation() {
        let mut fx = Fixture::seeded(1);
        let p = fx.state.current_project_mut().unwrap();
        p.risk = 96;
        p.morale = 5;
        assert_eq!(check(&mut fx.turn()), Some(Ending::ProjectCollapse));

        let mut fx = Fixture::seeded(1);
        fx.state.current_project_mut().unwrap().stakeholder_trust = 0;
        assert_eq!(check(&mut fx.turn()), Some(Ending::ProjectCancelled));
    }

    #[test]
    fn survival_endings() {
        let mut fx = Fixture::seeded(1);
        fx.state.week = 52;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Stable));

        let mut fx = Fixture::seeded(1);
        fx.state.week = 52;
        fx.state.player.kpi = 5000;
        fx.state.player.political_capital = 30;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Executive));

        let mut fx = Fixture::seeded(1);
        fx.state.week = 60;
        fx.state.player.money = 60_000;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Rich));
    }

    #[test]
    fn game_over_is_sticky() {
        let mut fx = Fixture::seeded(1);
        fx.state.player.mood = 0;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Depressed));
        fx.state.player.mood = 80;
        fx.state.player.money = -50;
        assert_eq!(check(&mut fx.turn()), Some(Ending::Depressed));
        assert_eq!(fx.state.ending, Some(Ending::Depressed));
    }

    #[test]
    fn active_global_event_defers_the_check() {
        let mut fx = Fixture::seeded(1);
        fx.state.player.money = -10;
        fx.state.active_global_event = Some(ActiveGlobalEvent {
            id: "gl_test".to_owned(),
            title: "Test".to_owned(),
            description: String::new(),
            effect: None,
            week: 1,
        });
        assert_eq!(check(&mut fx.turn()), None);
        assert!(!fx.state.game_over);
    }

    #[test]
    fn breakdown_is_probabilistic() {
        let mut hits = 0_u32;
        for seed in 0..400 {
            let mut fx = Fixture::seeded(seed);
            fx.state.player.mood = 5;
            fx.state.player.energy = 10;
            if check(&mut fx.turn()) == Some(Ending::Breakdown) {
                hits += 1;
            }
        }
        assert!((80..=160).contains(&hits), "hits = {hits}");
    }
}
