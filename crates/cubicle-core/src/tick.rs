//! Weekly scheduler.
//!
//! One simulated week runs its sub-steps in a fixed order: calendar, salary,
//! projects, exposure, NPC ecology, cancellations, promotion, game-over,
//! quarterly modifier, project spawn. The global disruption roll happens
//! once per call to [`advance`], after all queued weeks.

use cubicle_types::{ActiveGlobalEvent, Ending, Level};
use tracing::{debug, warn};

use crate::num::{real, trunc};
use crate::turn::Turn;
use crate::{ecology, ending, events, project, promotion};

/// Fixed weekly living cost deducted from salary.
pub const LIVING_COST: i64 = 300;

/// Net weekly income at `level` under the current revenue multiplier.
pub fn salary(level: Level, revenue_mult: f64) -> i64 {
    let steps = i64::from(level.number().saturating_sub(Level::MIN));
    let gross = 500_i64.saturating_add(steps.saturating_mul(200));
    trunc(real(gross) * revenue_mult).saturating_sub(LIVING_COST)
}

/// What a time advance produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advance {
    /// Weeks actually simulated.
    pub weeks: u32,
    /// Disruption raised after the last week.
    pub global_event: Option<ActiveGlobalEvent>,
    /// Set when the game ended during the advance.
    pub ending: Option<Ending>,
}

/// Simulate one week. Returns the ending if the game finished this week.
pub fn week(turn: &mut Turn<'_>) -> Option<Ending> {
    let calendar = turn.calendar;
    if let Err(error) = calendar.advance(turn.state, 1) {
        warn!(%error, "week counter did not advance");
        return None;
    }

    let pay = salary(turn.state.player.level, turn.state.modifiers.revenue);
    let money = turn.state.player.money.saturating_add(pay);
    turn.state.player.money = money;
    debug!(week = turn.state.week, pay, money, "weekly tick");

    project::evolve_all(turn);
    project::record_exposure(turn);
    ecology::tick(turn);
    project::roll_cancellations(turn);
    promotion::check(turn);
    if let Some(ending) = ending::check(turn) {
        return Some(ending);
    }
    events::maybe_quarterly(turn);
    events::maybe_spawn(turn);
    None
}

/// Advance `weeks` weeks, then roll for a global disruption.
///
/// Stops early if the game ends. `global_override` replaces the
/// condition-based disruption probability.
pub fn advance(turn: &mut Turn<'_>, weeks: u32, global_override: Option<f64>) -> Advance {
    let mut report = Advance::default();
    if turn.state.game_over || turn.state.active_global_event.is_some() {
        return report;
    }
    for _ in 0..weeks {
        report.weeks = report.weeks.saturating_add(1);
        if let Some(ending) = week(turn) {
            report.ending = Some(ending);
            return report;
        }
    }
    report.global_event = events::maybe_global(turn, global_override);
    report
}
