//! Mutable context threaded through every engine step of one action.

use cubicle_types::{Channel, GameState, MessageKind};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::catalog::Catalog;
use crate::clock::Calendar;
use crate::config::SimulationConfig;
use crate::journal;

/// Everything a sub-step may read or mutate while one action is applied.
///
/// A `Turn` borrows the session for the duration of a single action, so at
/// most one can exist per session at a time.
pub struct Turn<'a> {
    /// The session state.
    pub state: &'a mut GameState,
    /// The session's random source.
    pub rng: &'a mut StdRng,
    /// Immutable content tables.
    pub catalog: &'a Catalog,
    /// Simulation settings.
    pub config: &'a SimulationConfig,
    /// Week-to-calendar mapping.
    pub calendar: Calendar,
    /// Where engine messages for this action are posted.
    pub channel: Channel,
}

impl Turn<'_> {
    /// Post a system message on the turn's channel.
    pub fn system(&mut self, content: impl Into<String>) {
        journal::system(self.state, content, &self.channel);
    }

    /// Post an NPC message on the turn's channel.
    pub fn npc_says(&mut self, sender: impl Into<String>, content: impl Into<String>) {
        journal::post(self.state, MessageKind::Npc, sender, content, &self.channel);
    }

    /// Record a memory fact.
    pub fn remember(&mut self, fact: impl Into<String>) {
        journal::remember(self.state, fact, self.config.memory_fact_limit);
    }

    /// Bernoulli draw. Probabilities outside `0..=1` saturate; `NaN` is false.
    pub fn chance(&mut self, p: f64) -> bool {
        if p.is_nan() || p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.rng.random_bool(p)
        }
    }

    /// Uniform draw in `lo..=hi`. Returns `lo` when the range is empty.
    pub fn roll(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo { lo } else { self.rng.random_range(lo..=hi) }
    }

    /// A uniformly chosen element, cloned. `None` for an empty slice.
    pub fn pick<T: Clone>(&mut self, items: &[T]) -> Option<T> {
        items.choose(self.rng).cloned()
    }

    /// Uniform draw in `0.0..1.0`.
    pub fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
