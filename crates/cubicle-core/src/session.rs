//! One player's game: state, RNG, and the action flows that drive it.
//!
//! A [`Session`] is an explicit simulation context. It owns its state and
//! random source, borrows the shared catalog, and is dropped with the
//! player's session. Callers serialize access: each submitted action runs
//! to completion, including every weekly sub-step, before the next one.
//!
//! Free text goes through the narrator under a deadline. A narrator failure
//! is logged and settled by rules; it never aborts the action.

use std::sync::Arc;

use cubicle_types::{
    ActionInput, ActionOutcome, ActionReport, BlockReason, Channel, Command, GameState, Intent,
    MessageKind, NpcId, OnboardRequest, ReviewStatus,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogError};
use crate::clock::{Calendar, ClockError};
use crate::commands::CommandOutcome;
use crate::config::EngineConfig;
use crate::intent::{self, SMALL_TALK_MAGNITUDE};
use crate::narrator::{
    NarrationRequest, NarrationSection, Narrator, NarratorError, REVIEW_JITTER, ReviewRequest,
    ReviewVerdict,
};
use crate::num::pct_add;
use crate::turn::Turn;
use crate::{commands, effects, events, journal, org, promotion, setup, tick};

/// Narrative used when the narrator cannot be reached.
pub const FALLBACK_NARRATIVE: &str =
    "The narrative service is unavailable. This turn was settled by the rules.";

/// Score applied when the review scorer cannot be reached.
pub const FALLBACK_REVIEW_SCORE: u8 = 60;

/// Largest mood hint a narrator may apply.
pub const MOOD_HINT_LIMIT: i64 = 10;

/// Largest trust hint a narrator may apply.
pub const TRUST_HINT_LIMIT: i64 = 20;

const COMMAND_REMARKS: &[&str] = &[
    "Saw that. Keep it up.",
    "Noted. Make sure it shows up in the weekly report.",
    "Interesting call. Let's talk about it on Friday.",
    "Okay. Ping me if you get blocked.",
];

/// Errors raised while creating a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The player name was blank.
    #[error("player name must not be empty")]
    EmptyName,

    /// The starting project is not in the catalog.
    #[error("unknown starting project {project_id:?}")]
    UnknownProject {
        /// The requested project key.
        project_id: String,
    },

    /// The embedded catalog failed to load.
    #[error("catalog error: {source}")]
    Catalog {
        /// The underlying error.
        #[from]
        source: CatalogError,
    },

    /// The calendar configuration is unusable.
    #[error("calendar error: {source}")]
    Clock {
        /// The underlying error.
        #[from]
        source: ClockError,
    },
}

/// A single player's running game.
#[derive(Debug)]
pub struct Session {
    state: GameState,
    rng: StdRng,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    calendar: Calendar,
}

impl Session {
    /// Create a session and run onboarding.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for a blank name, an unknown starting
    /// project, or an unusable calendar configuration.
    pub fn new(
        catalog: Arc<Catalog>,
        config: EngineConfig,
        request: &OnboardRequest,
    ) -> Result<Self, SessionError> {
        let calendar = Calendar::new(&config.simulation)?;
        let mut rng = config
            .simulation
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let state = setup::initial_state(&catalog, request, &mut rng, calendar)?;
        let mut session = Self {
            state,
            rng,
            catalog,
            config,
            calendar,
        };
        setup::onboard(&mut session.turn(Channel::Group));
        journal::trim(&mut session.state, session.config.simulation.chat_history_limit);
        Ok(session)
    }

    /// Replace this session's game with a fresh one for `request`.
    ///
    /// Catalog-derived entities are cloned again, so nothing from the old
    /// game carries over.
    ///
    /// # Errors
    ///
    /// Same as [`Session::new`].
    pub fn restart(&mut self, request: &OnboardRequest) -> Result<(), SessionError> {
        let fresh = Self::new(Arc::clone(&self.catalog), self.config.clone(), request)?;
        *self = fresh;
        info!(player = %self.state.player.name, "session restarted");
        Ok(())
    }

    /// The current state.
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// The engine configuration this session runs with.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn turn(&mut self, channel: Channel) -> Turn<'_> {
        Turn {
            state: &mut self.state,
            rng: &mut self.rng,
            catalog: &self.catalog,
            config: &self.config.simulation,
            calendar: self.calendar,
            channel,
        }
    }

    /// Why an action would be refused right now, if it would.
    pub const fn blocked(&self) -> Option<BlockReason> {
        if self.state.game_over {
            Some(BlockReason::GameOver)
        } else if self.state.active_global_event.is_some() {
            Some(BlockReason::GlobalEventActive)
        } else {
            None
        }
    }

    /// Apply one player action.
    pub async fn submit<N: Narrator>(
        &mut self,
        narrator: &N,
        input: ActionInput,
        channel: Channel,
    ) -> ActionOutcome {
        self.run_action(narrator, input, channel, None).await
    }

    /// Apply one player action, forwarding narrator sections to `sink` as
    /// they are produced.
    pub async fn submit_streaming<N: Narrator>(
        &mut self,
        narrator: &N,
        input: ActionInput,
        channel: Channel,
        sink: UnboundedSender<NarrationSection>,
    ) -> ActionOutcome {
        self.run_action(narrator, input, channel, Some(sink)).await
    }

    /// Clear an active global disruption. Returns whether one was active.
    pub fn acknowledge(&mut self) -> bool {
        events::acknowledge(&mut self.state)
    }

    async fn run_action<N: Narrator>(
        &mut self,
        narrator: &N,
        input: ActionInput,
        channel: Channel,
        sink: Option<UnboundedSender<NarrationSection>>,
    ) -> ActionOutcome {
        if let Some(reason) = self.blocked() {
            debug!(?reason, "action blocked");
            return ActionOutcome::Blocked { reason };
        }

        let mark = self.state.chat_history.len();
        let mut report = match input {
            ActionInput::Text(text) => {
                if self.awaiting_answer() && !text.trim().is_empty() {
                    self.review_answer(narrator, &text, channel).await
                } else {
                    self.free_text(narrator, &text, channel, sink).await
                }
            }
            ActionInput::Command(command) => self.command(&command, channel),
        };
        if self.state.game_over {
            report.ending = self.state.ending;
        }
        report.new_messages = journal::since(&self.state, mark);
        journal::trim(&mut self.state, self.config.simulation.chat_history_limit);
        ActionOutcome::Applied(Box::new(report))
    }

    fn awaiting_answer(&self) -> bool {
        self.state
            .review
            .as_ref()
            .is_some_and(|r| r.status == ReviewStatus::PendingAnswer)
    }

    async fn review_answer<N: Narrator>(
        &mut self,
        narrator: &N,
        text: &str,
        channel: Channel,
    ) -> ActionReport {
        let player = self.state.player.name.clone();
        journal::post(&mut self.state, MessageKind::Player, player, text, &channel);
        let Some(review) = promotion::submit_answer(&mut self.state, text) else {
            return ActionReport::default();
        };

        let jitter = self.rng.random_range(REVIEW_JITTER);
        let request = ReviewRequest::new(&self.state, &review, jitter);
        let deadline = self.config.narration.review_timeout();
        let verdict = match tokio::time::timeout(deadline, narrator.score_review(&request)).await
        {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(error)) => fallback_verdict(&error),
            Err(_elapsed) => fallback_verdict(&NarratorError::Timeout {
                deadline_ms: self.config.narration.review_timeout_ms,
            }),
        };

        let mut turn = self.turn(channel);
        let passed = promotion::apply_score(&mut turn, verdict.score, &verdict.comment);
        let advance = tick::advance(&mut turn, 1, None);
        let narrative = match passed {
            Some(true) => format!("Review passed with {}.", verdict.score),
            Some(false) => format!("Review scored {}, below the bar.", verdict.score),
            None => String::new(),
        };
        ActionReport {
            narrative,
            weeks_advanced: advance.weeks,
            global_event: advance.global_event,
            ending: advance.ending,
            ..ActionReport::default()
        }
    }

    async fn free_text<N: Narrator>(
        &mut self,
        narrator: &N,
        text: &str,
        channel: Channel,
        sink: Option<UnboundedSender<NarrationSection>>,
    ) -> ActionReport {
        let player = self.state.player.name.clone();
        journal::post(&mut self.state, MessageKind::Player, player, text, &channel);

        let mut parts = Vec::new();
        let mut applied = None;
        let classification = intent::classify(text);
        if classification.matched {
            let line = effects::apply(
                &mut self.turn(channel.clone()),
                classification.intent,
                classification.magnitude,
                text,
            );
            parts.push(line);
            applied = Some((classification.intent, classification.magnitude));
        }

        let target = resolve_target(&self.state, &channel, text);
        let mut request = NarrationRequest::new(
            &self.state,
            text,
            target.as_ref().and_then(|id| self.state.npcs.get(id)),
            self.config.narration.recent_messages,
        );
        request.sink = sink;
        let deadline = self.config.narration.timeout();
        let narration = match tokio::time::timeout(deadline, narrator.narrate(&request)).await {
            Ok(Ok(narration)) => Some(narration),
            Ok(Err(error)) => {
                warn!(%error, "narrator failed, settling by rules");
                None
            }
            Err(_elapsed) => {
                warn!(
                    deadline_ms = self.config.narration.timeout_ms,
                    "narrator timed out, settling by rules"
                );
                None
            }
        };

        let mut turn = self.turn(channel);
        if let Some(narration) = narration {
            if applied.is_none() {
                if let Some(intent) = narration.intent {
                    let magnitude = intent::clamp_magnitude(narration.magnitude.unwrap_or(1.0));
                    parts.push(effects::apply(&mut turn, intent, magnitude, text));
                    applied = Some((intent, magnitude));
                }
            }
            if let Some(line) = narration.system_narrative.filter(|l| !l.trim().is_empty()) {
                turn.system(line.clone());
                parts.push(line);
            }
            apply_hints(
                &mut turn,
                target.as_ref(),
                narration.mood_change,
                narration.trust_change,
            );
            if let Some(reply) = narration.npc_reply.filter(|r| !r.trim().is_empty()) {
                let speaker = narration
                    .npc_name
                    .or_else(|| {
                        target
                            .as_ref()
                            .and_then(|id| turn.state.npcs.get(id))
                            .map(|n| n.name.clone())
                    })
                    .unwrap_or_else(|| "Colleague".to_owned());
                turn.npc_says(speaker, reply);
                if let Some(id) = &target {
                    org::mark_known(turn.state, id);
                }
            }
        } else {
            request.emit(NarrationSection::Narrative {
                text: FALLBACK_NARRATIVE.to_owned(),
            });
            turn.system(FALLBACK_NARRATIVE);
            parts.push(FALLBACK_NARRATIVE.to_owned());
        }
        drop(request);

        let (intent, magnitude) = match applied {
            Some(pair) => pair,
            None => {
                let line = effects::apply(&mut turn, Intent::SmallTalk, SMALL_TALK_MAGNITUDE, text);
                parts.push(line);
                (Intent::SmallTalk, SMALL_TALK_MAGNITUDE)
            }
        };

        let chance = turn.config.random_event_chance;
        events::maybe_random(&mut turn, chance);
        let advance = tick::advance(&mut turn, 1, None);
        info!(
            intent = intent.as_str(),
            magnitude,
            week = turn.state.week,
            "free-text action settled"
        );

        ActionReport {
            intent: Some(intent),
            magnitude: Some(magnitude),
            narrative: join_parts(&parts),
            weeks_advanced: advance.weeks,
            global_event: advance.global_event,
            ending: advance.ending,
            ..ActionReport::default()
        }
    }

    fn command(&mut self, command: &Command, channel: Channel) -> ActionReport {
        let workbench = channel == Channel::Workbench;
        let mut turn = self.turn(channel);
        let CommandOutcome { narrative, refused } = commands::run(&mut turn, command);
        debug!(command = command.name(), workbench, refused, "command ran");

        if workbench {
            let limit = turn.config.chat_history_limit;
            let feedback = &mut turn.state.workbench_feedback;
            feedback.push(narrative.clone());
            let excess = feedback.len().saturating_sub(limit);
            feedback.drain(..excess);
            return ActionReport {
                narrative,
                ..ActionReport::default()
            };
        }

        turn.system(narrative.clone());
        if refused || turn.state.game_over {
            return ActionReport {
                narrative,
                ending: turn.state.ending,
                ..ActionReport::default()
            };
        }
        let reply_chance = turn.config.command_reply_chance;
        if turn.chance(reply_chance) {
            remark(&mut turn);
        }
        let override_chance = turn.config.global_events.command_probability;
        let advance = tick::advance(&mut turn, 1, Some(override_chance));
        ActionReport {
            narrative,
            weeks_advanced: advance.weeks,
            global_event: advance.global_event,
            ending: advance.ending,
            ..ActionReport::default()
        }
    }
}

fn fallback_verdict(error: &NarratorError) -> ReviewVerdict {
    warn!(%error, score = FALLBACK_REVIEW_SCORE, "review scorer unavailable, using default score");
    ReviewVerdict {
        score: FALLBACK_REVIEW_SCORE,
        comment: "The scoring service is unavailable. The panel applied a default score."
            .to_owned(),
    }
}

fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The player's manager comments on a command.
fn remark(turn: &mut Turn<'_>) {
    let Some(speaker) = turn
        .state
        .player
        .leader_id
        .as_ref()
        .and_then(|id| turn.state.npcs.get(id))
        .filter(|n| n.is_employed())
        .map(|n| n.name.clone())
    else {
        return;
    };
    if let Some(line) = turn.pick(COMMAND_REMARKS) {
        turn.npc_says(speaker, line);
    }
}

/// Apply narrator hints: mood to the player, trust to the addressed NPC.
///
/// Hints are clamped. Trust gained with an executive also earns political
/// capital.
fn apply_hints(turn: &mut Turn<'_>, target: Option<&NpcId>, mood: i64, trust: i64) {
    let mood = mood.clamp(0_i64.saturating_sub(MOOD_HINT_LIMIT), MOOD_HINT_LIMIT);
    let trust = trust.clamp(0_i64.saturating_sub(TRUST_HINT_LIMIT), TRUST_HINT_LIMIT);
    turn.state.player.mood = pct_add(turn.state.player.mood, mood);

    let Some(npc) = target.and_then(|id| turn.state.npcs.get_mut(id)) else {
        return;
    };
    npc.trust = pct_add(npc.trust, trust);
    if trust > 0 && org::is_executive(npc) {
        let player = &mut turn.state.player;
        player.political_capital = player
            .political_capital
            .saturating_add(trust.saturating_div(2));
    }
    debug!(npc = %npc.id, mood, trust, "narrator hints applied");
}

/// Who the player is talking to.
///
/// In order: the DM partner, an `@id` or name mention, the best keyword
/// match on name, role, traits, or project, then the player's manager.
pub fn resolve_target(state: &GameState, channel: &Channel, text: &str) -> Option<NpcId> {
    let employed = || state.npcs.values().filter(|n| n.is_employed());

    if let Some(id) = channel
        .direct_npc()
        .filter(|id| state.npcs.get(*id).is_some_and(|n| n.is_employed()))
    {
        return Some(id.clone());
    }

    let lowered = text.to_lowercase();
    let mentioned = employed().find(|n| {
        lowered.contains(&format!("@{}", n.id.as_str().to_lowercase()))
            || lowered.contains(&n.name.to_lowercase())
    });
    if let Some(npc) = mentioned {
        return Some(npc.id.clone());
    }

    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .collect();
    let current = &state.player.current_project;
    let best = employed()
        .map(|n| {
            let name = n.name.to_lowercase();
            let profile = format!("{} {} {}", n.role, n.traits, n.project).to_lowercase();
            let score = words.iter().fold(0_u32, |acc, w| {
                let mut acc = acc;
                if name.contains(w) {
                    acc = acc.saturating_add(5);
                }
                if profile.contains(w) {
                    acc = acc.saturating_add(2);
                }
                acc
            });
            (score, &n.project == current, n)
        })
        .filter(|(score, _, _)| *score > 0)
        .max_by_key(|(score, same_project, _)| (*score, *same_project));
    if let Some((_, _, npc)) = best {
        return Some(npc.id.clone());
    }

    state
        .player
        .leader_id
        .as_ref()
        .filter(|id| state.npcs.get(*id).is_some_and(|n| n.is_employed()))
        .cloned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::time::Duration;

    use cubicle_types::{Ending, Level, ProjectId, PromotionReview, Role};

    use super::*;
    use crate::narrator::{HeuristicNarrator, Narration};

    fn session(seed: u64) -> Session {
        let mut config = EngineConfig::default();
        config.simulation.seed = Some(seed);
        config.simulation.init_event_chance = 0.0;
        config.simulation.random_event_chance = 0.0;
        config.simulation.command_reply_chance = 0.0;
        config.simulation.global_events.base_probability = 0.0;
        config.simulation.global_events.command_probability = 0.0;
        config.simulation.global_events.low_mood_bonus = 0.0;
        config.simulation.global_events.low_energy_bonus = 0.0;
        config.simulation.global_events.high_risk_bonus = 0.0;
        config.narration.timeout_ms = 50;
        config.narration.review_timeout_ms = 50;
        let request = OnboardRequest {
            name: "Ada".to_owned(),
            role: Role::Dev,
            project_id: "Genshin".to_owned(),
        };
        Session::new(Arc::new(Catalog::builtin().unwrap()), config, &request).unwrap()
    }

    /// Never answers in time.
    struct SlowNarrator;

    impl Narrator for SlowNarrator {
        fn narrate(
            &self,
            _request: &NarrationRequest,
        ) -> impl Future<Output = Result<Narration, NarratorError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Narration::default())
            }
        }

        fn score_review(
            &self,
            _request: &ReviewRequest,
        ) -> impl Future<Output = Result<ReviewVerdict, NarratorError>> + Send {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(ReviewVerdict {
                    score: 100,
                    comment: String::new(),
                })
            }
        }
    }

    /// Returns a fixed narration.
    struct Scripted(Narration);

    impl Narrator for Scripted {
        fn narrate(
            &self,
            _request: &NarrationRequest,
        ) -> impl Future<Output = Result<Narration, NarratorError>> + Send {
            let narration = self.0.clone();
            async move { Ok(narration) }
        }

        fn score_review(
            &self,
            _request: &ReviewRequest,
        ) -> impl Future<Output = Result<ReviewVerdict, NarratorError>> + Send {
            async {
                Err(NarratorError::Backend {
                    message: "offline".to_owned(),
                })
            }
        }
    }

    fn text(s: &str) -> ActionInput {
        ActionInput::Text(s.to_owned())
    }

    #[tokio::test]
    async fn free_text_work_advances_one_week() {
        let mut s = session(1);
        let kpi = s.state().player.kpi;
        let outcome = s.submit(&HeuristicNarrator, text("I fix the login crash"), Channel::Group).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.intent, Some(Intent::Work));
        assert_eq!(report.weeks_advanced, 1);
        assert_eq!(s.state().week, 2);
        assert!(s.state().player.kpi > kpi);
        assert_eq!(report.new_messages.first().unwrap().kind, MessageKind::Player);
    }

    #[tokio::test]
    async fn narrator_timeout_falls_back_to_rules() {
        let mut s = session(2);
        let outcome = s.submit(&SlowNarrator, text("hello everyone"), Channel::Group).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.intent, Some(Intent::SmallTalk));
        assert!(report.narrative.contains(FALLBACK_NARRATIVE));
        assert_eq!(s.state().week, 2);
    }

    #[tokio::test]
    async fn narrator_intent_applies_when_heuristics_miss() {
        let mut s = session(3);
        let narration = Narration {
            intent: Some(Intent::Learn),
            magnitude: Some(1.0),
            npc_reply: Some("Good plan.".to_owned()),
            trust_change: 50,
            mood_change: -40,
            ..Narration::default()
        };
        let manager = NpcId::from("NPC_0013");
        let trust = s.state().npcs.get(&manager).unwrap().trust;
        let mood = s.state().player.mood;
        let outcome = s
            .submit(&Scripted(narration), text("thinking about shaders"), Channel::Direct(manager.clone()))
            .await;
        assert_eq!(outcome.report().unwrap().intent, Some(Intent::Learn));
        // Hints are clamped to +20 trust and -10 mood.
        assert_eq!(s.state().npcs.get(&manager).unwrap().trust, (trust + 20).min(100));
        assert!(s.state().player.mood >= mood - 10 - 15);
        let reply = s
            .state()
            .chat_history
            .iter()
            .rev()
            .find(|m| m.kind == MessageKind::Npc)
            .unwrap();
        assert_eq!(reply.content, "Good plan.");
    }

    #[tokio::test]
    async fn workbench_commands_do_not_advance_time() {
        let mut s = session(4);
        let outcome = s
            .submit(&HeuristicNarrator, ActionInput::Command(Command::Rest), Channel::Workbench)
            .await;
        assert_eq!(outcome.report().unwrap().weeks_advanced, 0);
        assert_eq!(s.state().week, 1);
        assert_eq!(s.state().workbench_feedback.len(), 1);

        s.submit(&HeuristicNarrator, ActionInput::Command(Command::Rest), Channel::Group)
            .await;
        assert_eq!(s.state().week, 2);
    }

    #[tokio::test]
    async fn refused_commands_leave_the_week_alone() {
        let mut s = session(4);
        let money = s.state().player.money;
        let refused = [
            Command::Shop("yacht".to_owned()),
            Command::Study("astrophysics".to_owned()),
            Command::Transfer(ProjectId::from("NOPE")),
        ];
        for command in refused {
            let outcome = s
                .submit(&HeuristicNarrator, ActionInput::Command(command), Channel::Group)
                .await;
            assert_eq!(outcome.report().unwrap().weeks_advanced, 0);
            assert_eq!(s.state().week, 1);
            assert_eq!(s.state().player.money, money);
        }
        s.state.player.money = 100;
        let outcome = s
            .submit(
                &HeuristicNarrator,
                ActionInput::Command(Command::Shop("gpu".to_owned())),
                Channel::Group,
            )
            .await;
        assert!(outcome.report().unwrap().narrative.starts_with("Not enough money"));
        assert_eq!(s.state().week, 1);
        assert_eq!(s.state().player.money, 100);

        s.submit(
            &HeuristicNarrator,
            ActionInput::Command(Command::Eat("standard".to_owned())),
            Channel::Group,
        )
        .await;
        assert_eq!(s.state().week, 2);
    }

    #[tokio::test]
    async fn global_event_gates_until_acknowledged() {
        let mut s = session(5);
        s.state.active_global_event = Some(cubicle_types::ActiveGlobalEvent {
            id: "gl_test".to_owned(),
            title: "Test".to_owned(),
            description: String::new(),
            effect: None,
            week: 1,
        });
        let before = s.state().clone();
        let outcome = s.submit(&HeuristicNarrator, text("work"), Channel::Group).await;
        assert_eq!(
            outcome,
            ActionOutcome::Blocked {
                reason: BlockReason::GlobalEventActive
            }
        );
        assert_eq!(s.state(), &before);
        assert!(s.acknowledge());
        assert!(!s.acknowledge());
        assert!(!s.submit(&HeuristicNarrator, text("work"), Channel::Group).await.is_blocked());
    }

    #[tokio::test]
    async fn resign_blocks_further_actions() {
        let mut s = session(6);
        let outcome = s
            .submit(&HeuristicNarrator, ActionInput::Command(Command::Resign), Channel::Group)
            .await;
        assert_eq!(outcome.report().unwrap().ending, Some(Ending::Resignation));
        assert_eq!(s.state().week, 1);
        let again = s.submit(&HeuristicNarrator, text("hello"), Channel::Group).await;
        assert_eq!(
            again,
            ActionOutcome::Blocked {
                reason: BlockReason::GameOver
            }
        );
    }

    #[tokio::test]
    async fn review_answer_is_scored_with_fallback() {
        let mut s = session(7);
        s.state.review = Some(PromotionReview {
            status: ReviewStatus::PendingAnswer,
            target_level: Level::P6,
            question: "Why P6?".to_owned(),
            answer: None,
            score: None,
            passed: None,
            comment: None,
            week: 1,
        });
        let outcome = s
            .submit(&Scripted(Narration::default()), text("I stabilized the build"), Channel::Group)
            .await;
        let review = s.state().review.as_ref().unwrap();
        assert_eq!(review.status, ReviewStatus::Finished);
        assert_eq!(review.score, Some(FALLBACK_REVIEW_SCORE));
        assert_eq!(s.state().player.level, Level::P6);
        assert_eq!(outcome.report().unwrap().weeks_advanced, 1);
    }

    #[tokio::test]
    async fn seeded_sessions_score_reviews_alike() {
        let mut scores = Vec::new();
        for _ in 0..2 {
            let mut s = session(21);
            s.state.review = Some(PromotionReview {
                status: ReviewStatus::PendingAnswer,
                target_level: Level::P7,
                question: "Why P7?".to_owned(),
                answer: None,
                score: None,
                passed: None,
                comment: None,
                week: 1,
            });
            s.submit(&HeuristicNarrator, text("I led the migration"), Channel::Group)
                .await;
            scores.push(s.state().review.as_ref().unwrap().score.unwrap());
        }
        assert_eq!(scores.first(), scores.last());
        assert!(scores.iter().all(|score| (70..=90).contains(score)));
    }

    #[tokio::test]
    async fn review_scoring_timeout_uses_default() {
        let mut s = session(8);
        s.state.review = Some(PromotionReview {
            status: ReviewStatus::PendingAnswer,
            target_level: Level::P7,
            question: "Why P7?".to_owned(),
            answer: None,
            score: None,
            passed: None,
            comment: None,
            week: 1,
        });
        s.submit(&SlowNarrator, text("I led the migration"), Channel::Group).await;
        let review = s.state().review.as_ref().unwrap();
        assert_eq!(review.score, Some(FALLBACK_REVIEW_SCORE));
        assert_eq!(review.passed, Some(true));
    }

    #[tokio::test]
    async fn streaming_forwards_sections() {
        let mut s = session(9);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        s.submit_streaming(
            &HeuristicNarrator,
            text("let's fix the crash together"),
            Channel::Group,
            tx,
        )
        .await;
        let mut count = 0;
        while let Some(_section) = rx.recv().await {
            count += 1;
        }
        assert!(count >= 2);
    }

    #[test]
    fn targets_resolve_in_priority_order() {
        let s = session(10);
        let state = s.state();
        let dm = NpcId::from("NPC_0012");
        assert_eq!(
            resolve_target(state, &Channel::Direct(dm.clone()), "@NPC_0001 hi"),
            Some(dm)
        );
        assert_eq!(
            resolve_target(state, &Channel::Group, "@npc_0001 quick question"),
            Some(NpcId::from("NPC_0001"))
        );
        assert_eq!(
            resolve_target(state, &Channel::Group, "recruiter?"),
            state
                .npcs
                .values()
                .find(|n| n.role == "Recruiter")
                .map(|n| n.id.clone())
        );
        assert_eq!(
            resolve_target(state, &Channel::Group, "hm"),
            state.player.leader_id.clone()
        );
    }

    #[test]
    fn restart_resets_catalog_entities() {
        let mut s = session(11);
        s.state.projects.values_mut().for_each(|p| p.risk = 99);
        s.state.player.money = -5;
        let request = OnboardRequest {
            name: "Bo".to_owned(),
            role: Role::Ops,
            project_id: "HSR".to_owned(),
        };
        s.restart(&request).unwrap();
        assert_eq!(s.state().player.money, 8000);
        assert_eq!(s.state().player.current_project, ProjectId::from("HSR"));
        assert_eq!(
            s.state().projects.get(&ProjectId::from("Genshin")).unwrap().risk,
            25
        );
    }

    #[test]
    fn unknown_project_is_an_error() {
        let request = OnboardRequest {
            name: "Ada".to_owned(),
            role: Role::Dev,
            project_id: "Nope".to_owned(),
        };
        let err = Session::new(
            Arc::new(Catalog::builtin().unwrap()),
            EngineConfig::default(),
            &request,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::UnknownProject { .. }));
    }
}
