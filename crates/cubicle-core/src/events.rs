//! Event generators: weekly flavor events, quarterly modifiers, project
//! spawns, and global disruptions.
//!
//! Flavor, quarterly, and spawn events run inside the weekly tick. The
//! global disruption check runs once per time advance, after every queued
//! week has been ticked.

use cubicle_types::{
    ActiveGlobalEvent, GameState, GlobalEffect, GlobalModifiers, Player, ProjectId,
    ProjectStatus, ProjectType,
};
use tracing::{debug, info, warn};

use crate::catalog::{GlobalEventTemplate, RandomEvent};
use crate::num::{pct_add, pct_sub};
use crate::project::PROGRESS_CAP;
use crate::turn::Turn;

// ---------------------------------------------------------------------------
// Flavor events
// ---------------------------------------------------------------------------

/// Roll and apply a flavor event with probability `chance`.
///
/// Returns the event id when one fired.
pub fn maybe_random(turn: &mut Turn<'_>, chance: f64) -> Option<String> {
    if !turn.chance(chance) {
        return None;
    }
    trigger_random(turn)
}

/// Apply one eligible flavor event, chosen uniformly.
pub fn trigger_random(turn: &mut Turn<'_>) -> Option<String> {
    let level = turn.state.player.level;
    let project = turn.state.player.current_project.clone();
    let catalog = turn.catalog;
    let eligible: Vec<&RandomEvent> = catalog
        .random_events
        .iter()
        .filter(|e| e.eligible(level, &project))
        .collect();
    let event = turn.pick(&eligible)?;
    let effects = &event.effects;
    let mut parts = Vec::new();

    let player = &mut turn.state.player;
    if effects.mood != 0 {
        player.mood = pct_add(player.mood, effects.mood);
        parts.push(signed("Mood", effects.mood));
    }
    if effects.energy != 0 {
        player.energy = player
            .energy
            .saturating_add(effects.energy)
            .clamp(0, player.max_energy.max(0));
        parts.push(signed("Energy", effects.energy));
    }
    if effects.money != 0 {
        player.money = player.money.saturating_add(effects.money);
        parts.push(signed("Money", effects.money));
    }
    if effects.political_capital != 0 {
        player.political_capital = player
            .political_capital
            .saturating_add(effects.political_capital)
            .max(0);
        parts.push(signed("Political capital", effects.political_capital));
    }
    if let Some(p) = turn.state.projects.get_mut(&project) {
        if effects.risk != 0 {
            p.risk = pct_add(p.risk, effects.risk);
            parts.push(signed("Risk", effects.risk));
        }
        if effects.progress != 0 {
            p.progress = p.progress.saturating_add(effects.progress).clamp(0, PROGRESS_CAP);
            parts.push(signed("Progress", effects.progress));
        }
        if effects.morale != 0 {
            p.morale = pct_add(p.morale, effects.morale);
            parts.push(signed("Morale", effects.morale));
        }
    }

    let message = if parts.is_empty() {
        event.message.clone()
    } else {
        format!("{} ({})", event.message, parts.join(", "))
    };
    debug!(event = %event.id, "flavor event");
    turn.system(message);
    Some(event.id.clone())
}

fn signed(label: &str, value: i64) -> String {
    if value > 0 {
        format!("{label} +{value}")
    } else {
        format!("{label} {value}")
    }
}

// ---------------------------------------------------------------------------
// Quarterly and spawn events
// ---------------------------------------------------------------------------

/// Draw a quarterly modifier if `week` closes a quarter.
pub fn maybe_quarterly(turn: &mut Turn<'_>) {
    let week = turn.state.week;
    if !turn.calendar.is_quarter_end(week) {
        return;
    }
    let catalog = turn.catalog;
    let Some(event) = turn.pick(&catalog.quarterly_events) else {
        return;
    };
    turn.state.modifiers = GlobalModifiers {
        kpi: event.kpi,
        risk: event.risk,
        revenue: event.revenue,
    };
    info!(week, event = %event.name, kpi = event.kpi, risk = event.risk, revenue = event.revenue, "quarterly modifier");
    turn.system(format!("{}: {}", event.name, event.description));
    turn.remember(format!("Week {week}: {}", event.name));
}

/// Create a new R&D project if `week` is a spawn week.
pub fn maybe_spawn(turn: &mut Turn<'_>) -> Option<ProjectId> {
    let week = turn.state.week;
    if !turn.calendar.is_spawn_week(week) {
        return None;
    }
    let id = ProjectId(format!("NEW_{week}"));
    if turn.state.projects.contains_key(&id) {
        return None;
    }
    let project_type = turn.pick(&ProjectType::ALL).unwrap_or(ProjectType::Game);
    let difficulty = u8::try_from(turn.roll(2, 5)).unwrap_or(2);
    let risk = turn.roll(10, 35);
    let name = format!("New R&D Project {week} ({project_type})");
    let project = cubicle_types::Project {
        id: id.clone(),
        name: name.clone(),
        project_type,
        status: ProjectStatus::RnD,
        difficulty,
        risk,
        progress: 0,
        revenue: 0,
        morale: 80,
        stakeholder_trust: 50,
    };
    turn.state.projects.insert(id.clone(), project);
    info!(week, project = %id, difficulty, risk, "project spawned");
    turn.system(format!("{name} is greenlit: difficulty {difficulty}, risk {risk}."));
    turn.remember(format!("Week {week}: {name} greenlit"));
    Some(id)
}

// ---------------------------------------------------------------------------
// Global disruptions
// ---------------------------------------------------------------------------

/// Trigger probability from the player's condition.
pub fn global_probability(turn: &Turn<'_>) -> f64 {
    let settings = &turn.config.global_events;
    let player = &turn.state.player;
    let mut p = settings.base_probability;
    if player.mood <= 25 {
        p += settings.low_mood_bonus;
    }
    if player.energy <= 25 {
        p += settings.low_energy_bonus;
    }
    if active_project_risk(turn.state).is_some_and(|r| r >= 80) {
        p += settings.high_risk_bonus;
    }
    p
}

fn active_project_risk(state: &GameState) -> Option<i64> {
    state
        .current_project()
        .filter(|p| p.status != ProjectStatus::Canceled)
        .map(|p| p.risk)
}

/// Roll for a global disruption. `override_probability` replaces the
/// condition-based probability (commands use a flat rate).
///
/// Returns the activated event, if any.
pub fn maybe_global(
    turn: &mut Turn<'_>,
    override_probability: Option<f64>,
) -> Option<ActiveGlobalEvent> {
    if turn.state.active_global_event.is_some() || turn.state.game_over {
        return None;
    }
    let week = turn.state.week;
    let (mood, energy) = (turn.state.player.mood, turn.state.player.energy);
    let has_project = active_project_risk(turn.state).is_some();
    let catalog = turn.catalog;
    let candidates: Vec<&GlobalEventTemplate> = catalog
        .global_events
        .iter()
        .filter(|e| e.eligible(week, mood, energy, has_project))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let p = override_probability.unwrap_or_else(|| global_probability(turn));
    if !turn.chance(p) {
        return None;
    }
    let template = turn.pick(&candidates)?;
    Some(activate(turn, template))
}

/// Raise the gate and apply the event's handler.
pub fn activate(turn: &mut Turn<'_>, template: &GlobalEventTemplate) -> ActiveGlobalEvent {
    let event = ActiveGlobalEvent {
        id: template.id.clone(),
        title: template.title.clone(),
        description: template.description.clone(),
        effect: template.effect,
        week: turn.state.week,
    };
    turn.state.active_global_event = Some(event.clone());
    info!(event = %event.id, week = event.week, effect = ?event.effect, "global event activated");

    let body = match template.effect {
        Some(effect) => apply_global(turn, effect),
        None => template.description.clone(),
    };
    turn.system(format!("{}: {body}", template.title));
    event
}

fn restore_energy(player: &mut Player, amount: i64) {
    player.energy = player.energy.saturating_add(amount).min(player.max_energy);
}

fn drain_energy(player: &mut Player, amount: i64) {
    player.energy = player.energy.saturating_sub(amount).max(0);
}

fn lose_weeks(turn: &mut Turn<'_>, weeks: u32) {
    if let Err(error) = turn.calendar.advance(turn.state, weeks) {
        warn!(%error, "could not skip weeks for global event");
    }
}

/// Apply a bespoke global handler and return its narrative.
fn apply_global(turn: &mut Turn<'_>, effect: GlobalEffect) -> String {
    let GameState {
        player, projects, ..
    } = &mut *turn.state;
    let mut project = projects
        .get_mut(&player.current_project)
        .filter(|p| p.status != ProjectStatus::Canceled);

    match effect {
        GlobalEffect::HospitalQuarter => {
            restore_energy(player, 40);
            player.mood = pct_sub(player.mood, 10);
            player.money = player.money.saturating_sub(3000);
            lose_weeks(turn, 12);
            turn.remember("Spent a quarter in hospital");
            "A whole quarter slips by while you recover. Medical bills pile up.".to_owned()
        }
        GlobalEffect::ShortSickLeave => {
            drain_energy(player, 10);
            player.mood = pct_add(player.mood, 10);
            "You rest at home for a few days and feel slightly better.".to_owned()
        }
        GlobalEffect::HealthCheckBonus => {
            player.mood = pct_add(player.mood, 8);
            restore_energy(player, 10);
            "A full checkup and a spa day. You feel restored.".to_owned()
        }
        GlobalEffect::AllHandsMeeting => {
            "You spend the whole day in the auditorium. Project work stalls.".to_owned()
        }
        GlobalEffect::FireDrill => {
            drain_energy(player, 5);
            "Stairs and roll calls tire you out, but at least you stretched your legs.".to_owned()
        }
        GlobalEffect::TeamBuilding => {
            player.mood = pct_add(player.mood, 12);
            if let Some(p) = project.as_deref_mut() {
                p.morale = pct_add(p.morale, 8);
            }
            "The team grows closer, though the schedule takes a hit.".to_owned()
        }
        GlobalEffect::AuditWeek => {
            player.mood = pct_sub(player.mood, 8);
            "Spreadsheets and explanations drain you completely.".to_owned()
        }
        GlobalEffect::ProjectReview => {
            if let Some(p) = project.as_deref_mut() {
                p.risk = pct_sub(p.risk, 5);
            }
            player.political_capital = player.political_capital.saturating_add(3);
            "You hold steady in the review and win some support for the project.".to_owned()
        }
        GlobalEffect::OutagePause => {
            if let Some(p) = project.as_deref_mut() {
                p.risk = pct_add(p.risk, 5);
            }
            "Most planned work slips while systems are down.".to_owned()
        }
        GlobalEffect::SecurityResponse => {
            if let Some(p) = project.as_deref_mut() {
                p.risk = pct_sub(p.risk, 3);
            }
            player.hard_skill = player.hard_skill.saturating_add(1);
            "You join the hardening effort and learn the system more deeply.".to_owned()
        }
        GlobalEffect::VersionFreeze => {
            "Development slows down. You finally tidy up docs and tech debt.".to_owned()
        }
        GlobalEffect::FamilyLeave => {
            player.mood = pct_sub(player.mood, 5);
            "You step away for family matters while colleagues cover for you.".to_owned()
        }
        GlobalEffect::HouseMove => {
            drain_energy(player, 10);
            player.mood = pct_add(player.mood, 5);
            "Moving is exhausting, but the shorter commute cheers you up.".to_owned()
        }
        GlobalEffect::MarathonEvent => {
            drain_energy(player, 15);
            player.mood = pct_add(player.mood, 8);
            "Your legs are gone, but finishing feels great.".to_owned()
        }
        GlobalEffect::ExamStudy => {
            player.money = player.money.saturating_sub(800);
            player.hard_skill = player.hard_skill.saturating_add(1);
            player.soft_skill = player.soft_skill.saturating_add(1);
            "The fees hurt, but your skills improve.".to_owned()
        }
        GlobalEffect::StockUp => {
            player.money = player.money.saturating_add(3000);
            "The payout lands and you grin all week.".to_owned()
        }
        GlobalEffect::BonusRain => {
            player.money = player.money.saturating_add(8000);
            player.political_capital = player.political_capital.saturating_add(2);
            "The bonus arrives and people start to notice you.".to_owned()
        }
        GlobalEffect::CelebrationParty => {
            player.mood = pct_add(player.mood, 6);
            drain_energy(player, 8);
            "The party is great. The morning after is not.".to_owned()
        }
        GlobalEffect::CommuteDisaster => {
            drain_energy(player, 10);
            player.mood = pct_sub(player.mood, 5);
            "Your commute doubles and eats your energy every day.".to_owned()
        }
        GlobalEffect::RainWeek => {
            player.mood = pct_sub(player.mood, 4);
            "Grey skies drag your mood down with them.".to_owned()
        }
        GlobalEffect::BugStorm => {
            if let Some(p) = project.as_deref_mut() {
                p.risk = pct_add(p.risk, 5);
            }
            "Bug after bug lands on your desk. The pressure spikes.".to_owned()
        }
        GlobalEffect::OrgRestructure => {
            player.political_capital = player.political_capital.saturating_add(3);
            turn.remember("Lived through an org restructure");
            "You stay neutral through the reshuffle and keep key relationships intact.".to_owned()
        }
        GlobalEffect::PolicyChange => {
            "New rules take effect. You look for a new work-life balance.".to_owned()
        }
        GlobalEffect::ToolRollout => {
            player.hard_skill = player.hard_skill.saturating_add(1);
            "You dig into the new tools and become the team's go-to person.".to_owned()
        }
        GlobalEffect::MentorAssigned => {
            player.soft_skill = player.soft_skill.saturating_add(2);
            "With your mentor's help you start planning your career seriously.".to_owned()
        }
        GlobalEffect::InternalShare => {
            player.soft_skill = player.soft_skill.saturating_add(1);
            player.political_capital = player.political_capital.saturating_add(2);
            "Your talk gets you noticed across the company.".to_owned()
        }
        GlobalEffect::InterviewPanel => {
            player.soft_skill = player.soft_skill.saturating_add(1);
            "Interviewing candidates teaches you to see the team's perspective.".to_owned()
        }
        GlobalEffect::CrossTeamProject => {
            player.soft_skill = player.soft_skill.saturating_add(1);
            turn.remember("Worked on a cross-team project");
            "Cross-team work widens your network.".to_owned()
        }
        GlobalEffect::SummitInvite => {
            player.hard_skill = player.hard_skill.saturating_add(1);
            player.soft_skill = player.soft_skill.saturating_add(1);
            "The summit brings new ideas and new contacts.".to_owned()
        }
        GlobalEffect::AiStrategyNight => {
            drain_energy(player, 25);
            player.mood = pct_sub(player.mood, 5);
            if let Some(p) = project.as_deref_mut() {
                p.risk = pct_sub(p.risk, 5);
            }
            "An all-night AI strategy session fills the whiteboard and wins the project some promises.".to_owned()
        }
        GlobalEffect::IpCrossoverCrunch => {
            if let Some(p) = project.as_deref_mut() {
                p.progress = p.progress.saturating_add(15).clamp(0, PROGRESS_CAP);
                p.risk = pct_add(p.risk, 10);
            }
            drain_energy(player, 20);
            "You crunch on crossover content. Progress soars and so does tech debt.".to_owned()
        }
        GlobalEffect::StreamerViral => {
            player.mood = pct_add(player.mood, 12);
            player.political_capital = player.political_capital.saturating_add(4);
            "Your stream goes viral and marketing adopts it as a showcase.".to_owned()
        }
        GlobalEffect::AllInInvest => {
            let delta = turn.roll(-5000, 8000);
            let player = &mut turn.state.player;
            player.money = player.money.saturating_add(delta);
            if delta > 0 {
                player.mood = pct_add(player.mood, 8);
                format!("The market swings and your account jumps by {delta}.")
            } else {
                player.mood = pct_sub(player.mood, 8);
                format!("The market swings and your account drops by {}.", delta.saturating_abs())
            }
        }
        GlobalEffect::InternetMaintenance => {
            drain_energy(player, 8);
            if let Some(p) = project.as_deref_mut() {
                p.progress = p.progress.saturating_sub(5).max(0);
            }
            "The network keeps dropping. Builds and test cycles fall apart.".to_owned()
        }
        GlobalEffect::BurnoutBreak => {
            restore_energy(player, 30);
            player.mood = pct_sub(player.mood, 5);
            player.money = player.money.saturating_sub(1000);
            lose_weeks(turn, 4);
            turn.remember("Was sent on a forced burnout break");
            "You are sent on a month of mandatory rest. Income dips, but you avoid burning out.".to_owned()
        }
    }
}

/// Clear the disruption gate. Returns whether one was active.
pub fn acknowledge(state: &mut GameState) -> bool {
    let cleared = state.active_global_event.take();
    if let Some(event) = &cleared {
        info!(event = %event.id, "global event acknowledged");
    }
    cleared.is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::Fixture;

    fn template(fx: &Fixture, effect: GlobalEffect) -> GlobalEventTemplate {
        fx.catalog
            .global_events
            .iter()
            .find(|e| e.effect == Some(effect))
            .cloned()
            .unwrap()
    }

    #[test]
    fn quarterly_sets_modifiers_on_quarter_end() {
        let mut fx = Fixture::seeded(3);
        fx.state.week = 11;
        maybe_quarterly(&mut fx.turn());
        assert_eq!(fx.state.modifiers, GlobalModifiers::default());

        fx.state.week = 12;
        maybe_quarterly(&mut fx.turn());
        assert_ne!(fx.state.modifiers, GlobalModifiers::default());
        assert!(fx.state.memory_facts.iter().any(|f| f.starts_with("Week 12: ")));
    }

    #[test]
    fn spawn_creates_one_project_per_interval() {
        let mut fx = Fixture::seeded(5);
        fx.state.week = 104;
        let id = maybe_spawn(&mut fx.turn()).unwrap();
        assert_eq!(id.as_str(), "NEW_104");
        let p = fx.state.projects.get(&id).unwrap();
        assert_eq!(p.status, ProjectStatus::RnD);
        assert!((2..=5).contains(&p.difficulty));
        assert!((10..=35).contains(&p.risk));
        assert!(p.name.starts_with("New R&D Project 104 ("));
        assert!(maybe_spawn(&mut fx.turn()).is_none());

        fx.state.week = 105;
        assert!(maybe_spawn(&mut fx.turn()).is_none());
    }

    #[test]
    fn flavor_event_respects_level_and_project() {
        let mut fx = Fixture::seeded(8);
        for _ in 0..100 {
            let id = trigger_random(&mut fx.turn()).unwrap();
            let event = fx.catalog.random_events.iter().find(|e| e.id == id).unwrap();
            assert!(event.min_level <= fx.state.player.level);
            assert!(
                event.project.as_str() == ProjectId::GENERAL
                    || event.project == fx.state.player.current_project
            );
            fx.state.player.energy = 50;
            fx.state.player.mood = 50;
        }
    }

    #[test]
    fn hospital_quarter_skips_twelve_weeks() {
        let mut fx = Fixture::seeded(1);
        fx.state.week = 20;
        fx.state.player.energy = 10;
        let money = fx.state.player.money;
        let gl = template(&fx, GlobalEffect::HospitalQuarter);
        let event = activate(&mut fx.turn(), &gl);
        assert_eq!(event.week, 20);
        assert_eq!(fx.state.week, 32);
        assert_eq!(fx.state.player.energy, 50);
        assert_eq!(fx.state.player.money, money - 3000);
        assert!(fx.state.active_global_event.is_some());
    }

    #[test]
    fn gate_blocks_a_second_disruption() {
        let mut fx = Fixture::seeded(2);
        let first = maybe_global(&mut fx.turn(), Some(1.0)).unwrap();
        assert!(maybe_global(&mut fx.turn(), Some(1.0)).is_none());
        assert_eq!(fx.state.active_global_event.as_ref().unwrap().id, first.id);
        assert!(acknowledge(&mut fx.state));
        assert!(!acknowledge(&mut fx.state));
    }

    #[test]
    fn zero_probability_never_fires() {
        let mut fx = Fixture::seeded(2);
        for _ in 0..50 {
            assert!(maybe_global(&mut fx.turn(), Some(0.0)).is_none());
        }
    }

    #[test]
    fn low_stats_raise_global_probability() {
        let mut fx = Fixture::seeded(2);
        fx.state.player.mood = 20;
        fx.state.player.energy = 20;
        let p = global_probability(&fx.turn());
        assert!((p - 0.32).abs() < 1e-9);
    }
}
