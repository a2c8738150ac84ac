//! Simulated calendar.
//!
//! The week counter on [`GameState`] is the single source of truth. Year
//! and quarter are derived from it and re-synced after every change, never
//! advanced independently.

use cubicle_types::GameState;

use crate::config::SimulationConfig;

/// Errors raised by calendar arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The week counter would overflow.
    #[error("week counter overflow: cannot advance {by} weeks past week {week}")]
    WeekOverflow {
        /// Week before the attempted advance.
        week: u32,
        /// Requested advance.
        by: u32,
    },

    /// The calendar configuration is unusable.
    #[error("invalid calendar configuration: {reason}")]
    InvalidConfig {
        /// Explanation.
        reason: String,
    },
}

/// Week-to-calendar mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    weeks_per_quarter: u32,
    weeks_per_year: u32,
    spawn_interval: u32,
}

impl Calendar {
    /// Build a calendar from the simulation settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if any period is zero or a
    /// quarter is longer than a year.
    pub fn new(config: &SimulationConfig) -> Result<Self, ClockError> {
        if config.weeks_per_quarter == 0
            || config.weeks_per_year == 0
            || config.spawn_interval_weeks == 0
        {
            return Err(ClockError::InvalidConfig {
                reason: "calendar periods must be at least one week".to_owned(),
            });
        }
        if config.weeks_per_quarter > config.weeks_per_year {
            return Err(ClockError::InvalidConfig {
                reason: format!(
                    "quarter ({}) longer than year ({})",
                    config.weeks_per_quarter, config.weeks_per_year
                ),
            });
        }
        Ok(Self {
            weeks_per_quarter: config.weeks_per_quarter,
            weeks_per_year: config.weeks_per_year,
            spawn_interval: config.spawn_interval_weeks,
        })
    }

    /// One-based year containing `week`.
    pub fn year_of(&self, week: u32) -> u32 {
        week.saturating_sub(1)
            .checked_div(self.weeks_per_year)
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// One-based quarter within the year containing `week`.
    pub fn quarter_of(&self, week: u32) -> u32 {
        week.saturating_sub(1)
            .checked_rem(self.weeks_per_year)
            .and_then(|w| w.checked_div(self.weeks_per_quarter))
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// Whether a quarterly macro event fires on `week`.
    pub fn is_quarter_end(&self, week: u32) -> bool {
        week > 0 && week.checked_rem(self.weeks_per_quarter) == Some(0)
    }

    /// Whether a new project spawns on `week`.
    pub fn is_spawn_week(&self, week: u32) -> bool {
        week > 0 && week.checked_rem(self.spawn_interval) == Some(0)
    }

    /// Recompute year and quarter from the week counter.
    pub fn sync(&self, state: &mut GameState) {
        state.year = self.year_of(state.week);
        state.quarter = self.quarter_of(state.week);
    }

    /// Move the week counter forward by `weeks` and resync.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::WeekOverflow`] if the counter would overflow.
    pub fn advance(&self, state: &mut GameState, weeks: u32) -> Result<u32, ClockError> {
        state.week = state
            .week
            .checked_add(weeks)
            .ok_or(ClockError::WeekOverflow {
                week: state.week,
                by: weeks,
            })?;
        self.sync(state);
        Ok(state.week)
    }
}
