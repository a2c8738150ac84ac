//! Structured command handlers.
//!
//! Each handler returns the narrative shown to the player. A refused
//! command reports why and leaves state untouched, and the session then
//! skips the week it would otherwise advance.

use cubicle_types::{Command, Ending, Intent, Level, NpcId, Project, ProjectId, ProjectStatus};
use tracing::{debug, info};

use crate::catalog::Store;
use crate::effects::{self, player_and_project};
use crate::num::{ceil, pct_add, pct_sub, real, trunc};
use crate::turn::Turn;
use crate::{ending, org, project, purchase};

/// Lowest level allowed to manage direct reports.
pub const MANAGER_LEVEL: Level = Level::P7;

/// A handler's narrative, or the reason it refused.
pub type Handled = Result<String, String>;

/// What running a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Narrative shown to the player.
    pub narrative: String,
    /// The command was refused and changed nothing.
    pub refused: bool,
}

/// Run `command` and report what happened.
pub fn run(turn: &mut Turn<'_>, command: &Command) -> CommandOutcome {
    debug!(command = command.name(), channel = %turn.channel, "running command");
    let handled = match command {
        Command::Eat(id) => purchase::buy(turn, Store::Meal, id),
        Command::Shop(id) => purchase::buy(turn, Store::Shop, id),
        Command::Study(id) => purchase::buy(turn, Store::Course, id),
        Command::WorkHard => Ok(effects::apply(turn, Intent::Work, 1.5, "")),
        Command::WorkNormal => Ok(work_normal(turn)),
        Command::TechBreakthrough => Ok(tech_breakthrough(turn)),
        Command::MakePpt => Ok(make_ppt(turn)),
        Command::AlignMeeting => Ok(align_meeting(turn)),
        Command::PaidSlack => Ok(paid_slack(turn)),
        Command::Rest => Ok(effects::apply(turn, Intent::Refuse, 1.0, "")),
        Command::Report => Ok(effects::apply(turn, Intent::Work, 1.0, "")),
        Command::ManageUp => manage_up(turn),
        Command::Transfer(id) => transfer(turn, id),
        Command::AddSubordinate(id) => add_subordinate(turn, id),
        Command::RemoveSubordinate(id) => remove_subordinate(turn, id),
        Command::AssignSubordinate(id) => assign_subordinate(turn, id),
        Command::AssignAllSubordinates => assign_all(turn),
        Command::Resign => {
            ending::finish(turn, Ending::Resignation);
            Ok("You submit your resignation. Goodbye desk, goodbye weekly reports.".to_owned())
        }
    };
    match handled {
        Ok(narrative) => CommandOutcome {
            narrative,
            refused: false,
        },
        Err(narrative) => {
            debug!(command = command.name(), "command refused");
            CommandOutcome {
                narrative,
                refused: true,
            }
        }
    }
}

fn active_project<'s>(turn: &'s mut Turn<'_>) -> Option<&'s mut Project> {
    player_and_project(turn.state).1
}

fn signed(delta: i64) -> String {
    format!("{delta:+}")
}

fn work_normal(turn: &mut Turn<'_>) -> String {
    let base = effects::work(turn.state, 1.0).narrative;
    let (hard, mood) = (turn.state.player.hard_skill, turn.state.player.mood);
    let progress_gain = turn.roll(0, (hard / 40).max(0));
    let risk_shift = if mood >= 70 {
        0_i64.saturating_sub(turn.roll(0, 2))
    } else if mood <= 40 {
        turn.roll(0, 2)
    } else {
        0
    };

    let Some(project) = active_project(turn) else {
        return base;
    };
    let mut extras = Vec::new();
    if progress_gain > 0 {
        project::add_progress(project, progress_gain);
        extras.push(format!("extra progress +{progress_gain}"));
    }
    if risk_shift != 0 {
        project.risk = pct_add(project.risk, risk_shift);
        extras.push(format!("project risk {}", signed(risk_shift)));
    }
    project::settle_current_milestone(turn);
    if extras.is_empty() {
        base
    } else {
        format!("{base} {}.", extras.join(", "))
    }
}

fn tech_breakthrough(turn: &mut Turn<'_>) -> String {
    let base = effects::work(turn.state, 1.5).narrative;
    let bonus = i64::from(turn.state.player.hard_skill >= 60);
    let hard_gain = turn.roll(1, 1_i64.saturating_add(bonus));
    let player = &mut turn.state.player;
    player.hard_skill = player.hard_skill.saturating_add(hard_gain);
    let hard = real(player.hard_skill);

    let base_progress = turn.roll(2, 5);
    let base_risk = turn.roll(1, 3);
    let mut parts = vec![format!("hard skill +{hard_gain}")];
    if let Some(project) = active_project(turn) {
        let progress = trunc(real(base_progress) * (hard / 60.0).clamp(0.7, 1.6)).max(1);
        let risk_drop = trunc(real(base_risk) * (hard / 70.0).clamp(0.7, 1.5)).max(1);
        project::add_progress(project, progress);
        project.risk = pct_sub(project.risk, risk_drop);
        parts.push(format!("project progress +{progress}"));
        parts.push(format!("project risk -{risk_drop}"));
    }
    project::settle_current_milestone(turn);
    format!("You dig into a hard technical problem. {base} {}.", parts.join(", "))
}

fn make_ppt(turn: &mut Turn<'_>) -> String {
    let energy_cost = turn.roll(6, 10);
    let mood_drop = turn.roll(1, 4);
    let soft_bonus = i64::from(turn.state.player.soft_skill >= 60);
    let soft_gain = turn.roll(1, 1_i64.saturating_add(soft_bonus));
    let progress = turn.roll(0, 2);
    let mut trust = turn.roll(2, 4);
    let morale = turn.roll(0, 2);

    let (player, project) = player_and_project(turn.state);
    player.energy = player.energy.saturating_sub(energy_cost).max(0);
    player.mood = pct_sub(player.mood, mood_drop);
    player.soft_skill = player.soft_skill.saturating_add(soft_gain);
    if player.soft_skill >= 70 {
        trust = trust.saturating_add(1);
    }

    let mut line = format!(
        "You spend the week polishing slides and telling the project's story. Energy -{energy_cost}, mood -{mood_drop}, soft skill +{soft_gain}"
    );
    if let Some(project) = project {
        project::add_progress(project, progress);
        project.stakeholder_trust = pct_add(project.stakeholder_trust, trust);
        project.morale = pct_add(project.morale, morale);
        line.push_str(&format!(", stakeholder trust +{trust}, project progress +{progress}"));
    }
    project::settle_current_milestone(turn);
    line.push('.');
    line
}

fn align_meeting(turn: &mut Turn<'_>) -> String {
    let base = effects::apply(turn, Intent::SmallTalk, 1.1, "align the project cadence");
    let soft = turn.state.player.soft_skill;
    let progress = turn
        .roll(0, 2)
        .saturating_add(i64::from(soft >= 60))
        .max(1);
    let risk_drop = turn.roll(0, 2).saturating_add(i64::from(soft >= 70));

    let mut line = if base.is_empty() {
        "You pull everyone into an alignment meeting.".to_owned()
    } else {
        base
    };
    if let Some(project) = active_project(turn) {
        project::add_progress(project, progress);
        project.risk = pct_sub(project.risk, risk_drop);
        line.push_str(&format!(" Project progress +{progress}, project risk -{risk_drop}."));
    }
    project::settle_current_milestone(turn);
    line
}

fn paid_slack(turn: &mut Turn<'_>) -> String {
    let player = &turn.state.player;
    let mood_max = if player.mood <= 40 { 8 } else { 6 };
    let energy_max = if player.energy <= player.max_energy / 2 { 6 } else { 5 };
    let skilled = player.hard_skill >= 70 || player.soft_skill >= 70;
    let connected = player.political_capital >= 10;
    let mood_gain = turn.roll(2, mood_max);
    let energy_gain = turn.roll(2, energy_max);
    let mut progress_loss = turn.roll(1, 3);
    let mut trust_loss = turn.roll(1, 2);
    if skilled {
        progress_loss = progress_loss.saturating_sub(1).max(1);
    }
    if connected {
        trust_loss = trust_loss.saturating_sub(1).max(1);
    }

    let (player, project) = player_and_project(turn.state);
    player.mood = pct_add(player.mood, mood_gain);
    player.energy = player.energy.saturating_add(energy_gain).min(player.max_energy);
    let mut line =
        format!("You slack off at your desk on the clock. Mood +{mood_gain}, energy +{energy_gain}");
    if let Some(project) = project {
        project.progress = project.progress.saturating_sub(progress_loss).max(0);
        project.stakeholder_trust = pct_sub(project.stakeholder_trust, trust_loss);
        line.push_str(&format!(
            ", project progress -{progress_loss}, stakeholder trust -{trust_loss}"
        ));
    }
    line.push('.');
    line
}

fn manage_up(turn: &mut Turn<'_>) -> Handled {
    let current = turn.state.player.current_project.clone();
    let leader = org::project_leader(turn.state, &current)
        .filter(|id| turn.state.npcs.get(id).is_some_and(org::is_executive));
    let Some(target) = leader.or_else(|| org::top_executives(turn.state).into_iter().next()) else {
        return Err("You try to manage up, but there is no clear senior leader to talk to.".to_owned());
    };
    if !turn.state.npcs.get(&target).is_some_and(|n| n.is_employed()) {
        return Err("You try to manage up, but leadership is not around.".to_owned());
    }

    let soft = turn.state.player.soft_skill;
    let base = trunc(3.0 + real(soft) / 25.0);
    let trust_gain = turn.roll(base.saturating_sub(2).max(2), base.saturating_add(2).min(12));
    let pc_base = ceil(real(trust_gain) / 3.0).max(1);
    let pc_max = if soft >= 70 {
        pc_base.saturating_add(1)
    } else {
        pc_base
    };
    let pc_gain = turn.roll(1, pc_max);

    let Some(boss) = turn.state.npcs.get_mut(&target) else {
        return Err("You try to manage up, but leadership is not around.".to_owned());
    };
    boss.trust = pct_add(boss.trust, trust_gain);
    let name = boss.name.clone();
    org::mark_known(turn.state, &target);
    let player = &mut turn.state.player;
    player.energy = player.energy.saturating_sub(8).max(0);
    player.political_capital = player.political_capital.saturating_add(pc_gain);
    Ok(format!(
        "You manage up and have a smooth chat with {name}. {name}'s trust +{trust_gain}, political capital +{pc_gain}, energy -8."
    ))
}

fn transfer(turn: &mut Turn<'_>, id: &ProjectId) -> Handled {
    let Some(project) = turn.state.projects.get(id) else {
        return Err(format!("Transfer failed: there is no project {id}."));
    };
    let name = project.name.clone();
    if project.status == ProjectStatus::Canceled {
        return Err(format!("Transfer failed: {name} has been canceled."));
    }
    if &turn.state.player.current_project == id {
        return Err(format!("You are already on {name}."));
    }

    turn.state.player.current_project = id.clone();
    let level = turn.state.player.level;
    if let Some(manager) = org::direct_manager(turn.state, id, level) {
        org::mark_known(turn.state, &manager);
        turn.state.player.leader_id = Some(manager);
    }
    info!(project = %id, week = turn.state.week, "player transferred");
    turn.remember(format!("Transferred to {name}"));
    Ok(format!("You file a transfer request and join {name}."))
}

fn on_player_line(project: &ProjectId, current: &ProjectId) -> bool {
    project == current || project.is_pseudo()
}

fn add_subordinate(turn: &mut Turn<'_>, id: &NpcId) -> Handled {
    let player = &turn.state.player;
    if player.level < MANAGER_LEVEL {
        return Err(format!("Not enough authority: managing direct reports requires {MANAGER_LEVEL} or above."));
    }
    let Some(npc) = turn.state.npcs.get(id) else {
        return Err("Could not add a report: no such colleague.".to_owned());
    };
    let name = npc.name.clone();
    if !npc.is_employed() {
        return Err(format!("Could not add a report: {name} no longer works here."));
    }
    if turn.state.player_subordinates.contains(id) {
        return Err(format!("{name} already reports to you."));
    }
    if !on_player_line(&npc.project, &player.current_project) {
        return Err(format!("Could not add a report: {name} is not on your project line."));
    }
    if npc.level >= player.level {
        return Err(format!("Could not add a report: {name} is not junior to you."));
    }

    let manager = player.name.clone();
    turn.state.player_subordinates.push(id.clone());
    if let Some(npc) = turn.state.npcs.get_mut(id) {
        npc.manager_id = Some(manager);
    }
    org::mark_known(turn.state, id);
    info!(npc = %id, "subordinate added");
    Ok(format!("{name} now formally reports to you."))
}

fn remove_subordinate(turn: &mut Turn<'_>, id: &NpcId) -> Handled {
    if !turn.state.player_subordinates.contains(id) {
        return Err("You have no such direct report.".to_owned());
    }
    turn.state.player_subordinates.retain(|s| s != id);
    let manager = turn.state.player.name.clone();
    let name = match turn.state.npcs.get_mut(id) {
        Some(npc) => {
            if npc.manager_id.as_ref() == Some(&manager) {
                npc.manager_id = None;
            }
            npc.name.clone()
        }
        None => id.to_string(),
    };
    info!(npc = %id, "subordinate removed");
    Ok(format!("You end the reporting line with {name}."))
}

/// Progress one report adds per assignment.
fn efficiency(level: Level) -> i64 {
    i64::from(level.number() / 2).max(1)
}

fn assign_subordinate(turn: &mut Turn<'_>, id: &NpcId) -> Handled {
    if turn.state.player.level < MANAGER_LEVEL {
        return Err(format!("Assignment failed: directing reports requires {MANAGER_LEVEL} or above."));
    }
    let Some(npc) = turn.state.npcs.get(id) else {
        return Err("Assignment failed: no such colleague.".to_owned());
    };
    let name = npc.name.clone();
    if !turn.state.player_subordinates.contains(id) {
        return Err(format!("Assignment failed: {name} does not report to you."));
    }
    if active_project(turn).is_none() {
        return Err("Assignment failed: you have no active project.".to_owned());
    }

    let mood_drop = turn.roll(0, 8);
    let manager = turn.state.player.name.clone();
    let Some(npc) = turn.state.npcs.get_mut(id) else {
        return Err("Assignment failed: no such colleague.".to_owned());
    };
    npc.mood = pct_sub(npc.mood, mood_drop);
    npc.manager_id = Some(manager);
    let unhappy = npc.mood < 40;
    npc.trust = if unhappy {
        pct_sub(npc.trust, 2)
    } else {
        pct_add(npc.trust, 1)
    };
    let progress = efficiency(npc.level);
    if let Some(project) = active_project(turn) {
        project::add_progress(project, progress);
    }
    project::settle_current_milestone(turn);
    Ok(if unhappy {
        format!("{name} pushes some work forward but grumbles about the overtime. Project progress +{progress}.")
    } else {
        format!("{name} stays late to help push the project. Project progress +{progress}.")
    })
}

fn assign_all(turn: &mut Turn<'_>) -> Handled {
    if turn.state.player.level < MANAGER_LEVEL {
        return Err(format!("Assignment failed: directing reports requires {MANAGER_LEVEL} or above."));
    }
    if turn.state.player_subordinates.is_empty() {
        return Err("You have no direct reports to assign yet.".to_owned());
    }
    if active_project(turn).is_none() {
        return Err("Assignment failed: you have no active project.".to_owned());
    }

    let mut total = 0_i64;
    let mut unhappy = 0_u32;
    for id in turn.state.player_subordinates.clone() {
        let drop = turn.roll(3, 10);
        let Some(npc) = turn.state.npcs.get_mut(&id) else {
            debug!(npc = %id, "assignment skipped unknown npc");
            continue;
        };
        if !npc.is_employed() {
            continue;
        }
        total = total.saturating_add(efficiency(npc.level));
        npc.mood = pct_sub(npc.mood, drop);
        if npc.mood < 35 {
            unhappy = unhappy.saturating_add(1);
            npc.trust = pct_sub(npc.trust, 3);
        }
    }
    if total == 0 {
        return Err("None of your reports can spare time today.".to_owned());
    }
    if let Some(project) = active_project(turn) {
        project::add_progress(project, total);
    }
    project::settle_current_milestone(turn);
    let mut line = format!("You rally your reports behind the project. Project progress +{total}.");
    if unhappy > 0 {
        line.push_str(&format!(" {unhappy} of them complain about the pressure."));
    }
    Ok(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::Fixture;

    fn promote_to_p7(fx: &mut Fixture) {
        fx.state.player.level = Level::P7;
    }

    fn junior_on_project(fx: &Fixture) -> NpcId {
        let current = fx.state.player.current_project.clone();
        fx.state
            .npcs
            .values()
            .find(|n| n.is_employed() && n.project == current && n.level < Level::P7)
            .map(|n| n.id.clone())
            .unwrap()
    }

    #[test]
    fn subordinates_need_p7() {
        let mut fx = Fixture::seeded(2);
        let id = junior_on_project(&fx);
        let outcome = run(&mut fx.turn(), &Command::AddSubordinate(id));
        assert!(outcome.refused);
        assert!(outcome.narrative.starts_with("Not enough authority"), "{}", outcome.narrative);
        assert!(fx.state.player_subordinates.is_empty());
    }

    #[test]
    fn add_assign_remove_cycle() {
        let mut fx = Fixture::seeded(2);
        promote_to_p7(&mut fx);
        let id = junior_on_project(&fx);
        run(&mut fx.turn(), &Command::AddSubordinate(id.clone()));
        assert_eq!(fx.state.player_subordinates, vec![id.clone()]);
        assert_eq!(
            fx.state.npcs.get(&id).unwrap().manager_id.as_deref(),
            Some(fx.state.player.name.as_str())
        );

        let again = run(&mut fx.turn(), &Command::AddSubordinate(id.clone()));
        assert!(again.refused);
        assert!(again.narrative.contains("already reports"), "{}", again.narrative);

        fx.state.current_project_mut().unwrap().progress = 10;
        let level = fx.state.npcs.get(&id).unwrap().level;
        run(&mut fx.turn(), &Command::AssignSubordinate(id.clone()));
        assert_eq!(
            fx.state.current_project().unwrap().progress,
            10 + efficiency(level)
        );

        run(&mut fx.turn(), &Command::RemoveSubordinate(id.clone()));
        assert!(fx.state.player_subordinates.is_empty());
        assert_eq!(fx.state.npcs.get(&id).unwrap().manager_id, None);
    }

    #[test]
    fn senior_colleague_cannot_report_to_player() {
        let mut fx = Fixture::seeded(2);
        promote_to_p7(&mut fx);
        let outcome = run(&mut fx.turn(), &Command::AddSubordinate(NpcId::from("NPC_0010")));
        assert!(outcome.refused);
        assert!(outcome.narrative.ends_with("is not junior to you."), "{}", outcome.narrative);
    }

    #[test]
    fn assign_all_penalizes_unhappy_reports() {
        let mut fx = Fixture::seeded(2);
        promote_to_p7(&mut fx);
        let id = junior_on_project(&fx);
        fx.state.player_subordinates.push(id.clone());
        let npc = fx.state.npcs.get_mut(&id).unwrap();
        npc.mood = 20;
        npc.trust = 50;
        let outcome = run(&mut fx.turn(), &Command::AssignAllSubordinates);
        assert!(!outcome.refused);
        assert!(outcome.narrative.contains("1 of them complain"), "{}", outcome.narrative);
        assert_eq!(fx.state.npcs.get(&id).unwrap().trust, 47);
    }

    #[test]
    fn transfer_rules() {
        let mut fx = Fixture::seeded(2);
        let missing = run(&mut fx.turn(), &Command::Transfer(ProjectId::from("NOPE")));
        assert!(missing.refused);
        assert_eq!(missing.narrative, "Transfer failed: there is no project NOPE.");

        fx.state.projects.get_mut(&ProjectId::from("HSR")).unwrap().status = ProjectStatus::Canceled;
        let canceled = run(&mut fx.turn(), &Command::Transfer(ProjectId::from("HSR")));
        assert!(canceled.refused);
        assert!(canceled.narrative.ends_with("has been canceled."), "{}", canceled.narrative);

        assert!(!run(&mut fx.turn(), &Command::Transfer(ProjectId::from("ZZZ"))).refused);
        assert_eq!(fx.state.player.current_project, ProjectId::from("ZZZ"));
        let leader = fx.state.player.leader_id.clone().unwrap();
        assert!(fx.state.known_npcs.contains(&leader));
    }

    #[test]
    fn manage_up_builds_standing() {
        let mut fx = Fixture::seeded(2);
        fx.state.player.energy = 50;
        let pc = fx.state.player.political_capital;
        let outcome = run(&mut fx.turn(), &Command::ManageUp);
        assert!(outcome.narrative.starts_with("You manage up"), "{}", outcome.narrative);
        assert_eq!(fx.state.player.energy, 42);
        assert!(fx.state.player.political_capital > pc);
    }

    #[test]
    fn refused_purchase_is_flagged() {
        let mut fx = Fixture::seeded(2);
        let money = fx.state.player.money;
        let outcome = run(&mut fx.turn(), &Command::Shop("yacht".to_owned()));
        assert!(outcome.refused);
        assert_eq!(fx.state.player.money, money);

        let outcome = run(&mut fx.turn(), &Command::Eat("standard".to_owned()));
        assert!(!outcome.refused);
        assert!(fx.state.player.money < money);
    }

    #[test]
    fn make_ppt_trades_energy_for_trust() {
        let mut fx = Fixture::seeded(2);
        fx.state.player.energy = 50;
        let trust = fx.state.current_project().unwrap().stakeholder_trust;
        run(&mut fx.turn(), &Command::MakePpt);
        assert!((40..=44).contains(&fx.state.player.energy));
        assert!(fx.state.current_project().unwrap().stakeholder_trust >= trust + 2);
    }

    #[test]
    fn paid_slack_costs_progress() {
        let mut fx = Fixture::seeded(2);
        fx.state.current_project_mut().unwrap().progress = 50;
        run(&mut fx.turn(), &Command::PaidSlack);
        let progress = fx.state.current_project().unwrap().progress;
        assert!((47..=49).contains(&progress), "{progress}");
    }

    #[test]
    fn tech_breakthrough_grows_hard_skill() {
        let mut fx = Fixture::seeded(2);
        let hard = fx.state.player.hard_skill;
        run(&mut fx.turn(), &Command::TechBreakthrough);
        let gained = fx.state.player.hard_skill - hard;
        assert!((1..=2).contains(&gained));
    }

    #[test]
    fn resign_ends_the_game() {
        let mut fx = Fixture::seeded(2);
        run(&mut fx.turn(), &Command::Resign);
        assert!(fx.state.game_over);
        assert_eq!(fx.state.ending, Some(Ending::Resignation));
    }

    #[test]
    fn commands_keep_stats_in_bounds() {
        let commands = [
            Command::WorkHard,
            Command::WorkNormal,
            Command::TechBreakthrough,
            Command::MakePpt,
            Command::AlignMeeting,
            Command::PaidSlack,
            Command::Rest,
            Command::Report,
            Command::ManageUp,
        ];
        let mut fx = Fixture::seeded(8);
        for command in commands.iter().cycle().take(90) {
            run(&mut fx.turn(), command);
            let p = fx.state.current_project().unwrap();
            assert!((0..=100).contains(&p.risk));
            assert!((0..=100).contains(&p.stakeholder_trust));
            assert!((0..=project::PROGRESS_CAP).contains(&p.progress));
            assert!((0..=100).contains(&fx.state.player.mood));
            assert!(fx.state.player.energy <= fx.state.player.max_energy);
        }
    }
}
