//! Project lifecycle: weekly evolution, cancellation, and milestones.
//!
//! Status only moves forward (`R&D -> Live -> Canceled`). Canceled projects
//! are kept in the map for history but receive no further simulation.

use cubicle_types::{GlobalModifiers, Project, ProjectId, ProjectStatus, ProjectType};
use tracing::{debug, info};

use crate::num::{ceil, pct, pct_add, real, trunc};
use crate::org;
use crate::turn::Turn;

/// Progress at which a milestone completes.
pub const MILESTONE: i64 = 100;
/// Upper bound for stored progress.
pub const PROGRESS_CAP: i64 = 200;

/// Revenue ceiling for a project: a type-dependent base scaled by difficulty.
pub fn revenue_target(project: &Project) -> i64 {
    let base: i64 = match project.project_type {
        ProjectType::Game => 50_000,
        ProjectType::App => 35_000,
        ProjectType::Infra => 25_000,
    };
    base.saturating_mul(i64::from(project.difficulty.max(1)))
}

/// Clamp every bounded project field into range.
pub fn clamp(project: &mut Project) {
    project.risk = pct(project.risk);
    project.morale = pct(project.morale);
    project.stakeholder_trust = pct(project.stakeholder_trust);
    project.progress = project.progress.clamp(0, PROGRESS_CAP);
    project.revenue = project.revenue.max(0);
}

/// Add progress, keeping it within `0..=200`.
pub fn add_progress(project: &mut Project, delta: i64) {
    project.progress = project.progress.saturating_add(delta).clamp(0, PROGRESS_CAP);
}

/// One week of organic change for a non-canceled project.
pub fn evolve_week(project: &mut Project, modifiers: &GlobalModifiers) {
    if project.status == ProjectStatus::Canceled {
        return;
    }
    let growth = ceil(f64::from(project.difficulty) * 0.5).max(0);
    project.risk = pct_add(project.risk, growth);
    project.morale = pct_add(project.morale, -1);

    if project.status == ProjectStatus::Live {
        let base = trunc(800.0 * f64::from(project.difficulty) * modifiers.revenue);
        let trust_factor = 0.5 + 0.5 * real(project.stakeholder_trust) / 100.0;
        let potential = trunc(real(base) * trust_factor).max(0);
        let gap = revenue_target(project).saturating_sub(project.revenue).max(0);
        project.revenue = project.revenue.saturating_add(potential.min(gap));

        let trust = project.stakeholder_trust;
        if trust >= 70 && project.morale >= 60 {
            project.risk = pct_add(project.risk, -2);
        } else if trust >= 50 && project.morale >= 50 {
            project.risk = pct_add(project.risk, -1);
        } else if trust <= 30 {
            project.risk = pct_add(project.risk, 1);
        }
    }

    if project.risk >= 80 {
        project.stakeholder_trust = pct_add(project.stakeholder_trust, -2);
    } else if project.risk >= 60 {
        project.stakeholder_trust = pct_add(project.stakeholder_trust, -1);
    }
}

/// Pressure toward cancellation from extreme risk and collapsing morale.
pub const fn cancellation_pressure(project: &Project) -> u32 {
    let from_risk: u32 = if project.risk >= 95 {
        2
    } else if project.risk >= 90 {
        1
    } else {
        0
    };
    let from_morale: u32 = if project.morale <= 5 {
        2
    } else if project.morale <= 15 {
        1
    } else {
        0
    };
    from_risk.saturating_add(from_morale)
}

/// Weekly cancellation probability. Live projects are harder to kill.
pub fn cancellation_chance(project: &Project) -> f64 {
    let pressure = cancellation_pressure(project);
    if pressure == 0 || project.status == ProjectStatus::Canceled {
        return 0.0;
    }
    let chance = (0.15 * f64::from(pressure)).min(0.8);
    if project.status == ProjectStatus::Live {
        chance * 0.6
    } else {
        chance
    }
}

/// Weekly evolution of every non-canceled project.
pub fn evolve_all(turn: &mut Turn<'_>) {
    let modifiers = turn.state.modifiers;
    for project in turn.state.projects.values_mut() {
        evolve_week(project, &modifiers);
        debug!(project = %project.id, risk = project.risk, revenue = project.revenue, "project evolved");
    }
}

/// Record Live participation and major accidents for the player's project.
pub fn record_exposure(turn: &mut Turn<'_>) {
    let Some(project) = turn.state.current_project() else {
        return;
    };
    let (id, name, risk, live) = (
        project.id.clone(),
        project.name.clone(),
        project.risk,
        project.status == ProjectStatus::Live,
    );
    if live {
        turn.state.player.participated_live_projects.insert(id);
    }
    if risk >= 90 {
        turn.state.player.major_accidents = turn.state.player.major_accidents.saturating_add(1);
        turn.system(format!("{name} is in a major incident (risk {risk}/100)."));
        let week = turn.state.week;
        turn.remember(format!("Major incident on {name} in week {week}"));
    }
}

/// Roll cancellation for every project under pressure.
pub fn roll_cancellations(turn: &mut Turn<'_>) {
    let at_risk: Vec<(ProjectId, f64)> = turn
        .state
        .projects
        .values()
        .map(|p| (p.id.clone(), cancellation_chance(p)))
        .filter(|(_, chance)| *chance > 0.0)
        .collect();
    for (id, chance) in at_risk {
        if turn.chance(chance) {
            cancel(turn, &id);
        }
    }
}

/// Cancel a project and apply the fallout to the player.
pub fn cancel(turn: &mut Turn<'_>, id: &ProjectId) {
    let Some(project) = turn.state.projects.get_mut(id) else {
        return;
    };
    if project.status == ProjectStatus::Canceled {
        return;
    }
    project.status = ProjectStatus::Canceled;
    project.progress = 0;
    let (name, risk, morale) = (project.name.clone(), project.risk, project.morale);
    info!(project = %id, risk, morale, week = turn.state.week, "project canceled");
    turn.system(format!("{name} has been canceled (risk {risk}/100, morale {morale}/100)."));
    turn.remember(format!("{name} was canceled"));

    if &turn.state.player.current_project != id {
        return;
    }
    turn.state.player.mood = pct_add(turn.state.player.mood, -15);
    for exec in org::top_executives(turn.state) {
        if let Some(npc) = turn.state.npcs.get_mut(&exec) {
            npc.trust = pct_add(npc.trust, -10);
        }
    }
    let fallback = turn
        .state
        .projects
        .values()
        .find(|p| p.status != ProjectStatus::Canceled)
        .map(|p| (p.id.clone(), p.name.clone()));
    if let Some((fallback_id, fallback_name)) = fallback {
        turn.state.player.current_project = fallback_id;
        turn.system(format!("You have been temporarily reassigned to {fallback_name}."));
    }
}

/// Complete a milestone on `id` if its progress has reached 100.
///
/// Returns whether a milestone fired.
pub fn settle_milestone(turn: &mut Turn<'_>, id: &ProjectId) -> bool {
    let revenue_mult = turn.state.modifiers.revenue;
    let Some(project) = turn.state.projects.get_mut(id) else {
        return false;
    };
    if project.status == ProjectStatus::Canceled || project.progress < MILESTONE {
        return false;
    }

    let launched = project.status == ProjectStatus::RnD;
    project.progress = project.progress.saturating_sub(MILESTONE).max(0);
    if launched {
        project.status = ProjectStatus::Live;
    }
    let base = trunc(5000.0 * f64::from(project.difficulty) * revenue_mult).max(0);
    let gap = revenue_target(project).saturating_sub(project.revenue).max(0);
    project.revenue = project.revenue.saturating_add(base.min(gap));
    project.risk = pct_add(project.risk, -5);
    project.morale = pct_add(project.morale, 5);
    project.stakeholder_trust = pct_add(project.stakeholder_trust, 4);
    let name = project.name.clone();

    let bonus = base / 5;
    let player = &mut turn.state.player;
    player.money = player.money.saturating_add(bonus);
    player.political_capital = player.political_capital.saturating_add(5).max(0);

    if launched {
        player.launched_projects.insert(id.clone());
        info!(project = %id, week = turn.state.week, "project launched");
        turn.system(format!("{name} leaves R&D and goes Live!"));
        turn.remember(format!("{name} launched"));
    }
    info!(project = %id, revenue = base, bonus, "milestone completed");
    turn.system(format!(
        "{name} hit a milestone: revenue +{base}, bonus +{bonus}, political capital +5."
    ));
    turn.remember(format!("Completed a {name} milestone"));
    true
}

/// Settle a milestone on the player's current project.
pub fn settle_current_milestone(turn: &mut Turn<'_>) -> bool {
    let id = turn.state.player.current_project.clone();
    settle_milestone(turn, &id)
}

/// Letter grade for a KPI total.
pub const fn kpi_grade(kpi: i64) -> &'static str {
    if kpi >= 4000 {
        "S"
    } else if kpi >= 2000 {
        "A"
    } else if kpi >= 1200 {
        "B"
    } else if kpi >= 600 {
        "C"
    } else {
        "D"
    }
}
