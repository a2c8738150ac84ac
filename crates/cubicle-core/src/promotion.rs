//! Promotion candidacy and the free-text review sub-flow.
//!
//! At most one review is live at a time:
//! `PendingAnswer -> PendingScore -> Finished`. A finished review is kept
//! for display until the next one replaces it.

use cubicle_types::{GameState, Level, ProjectStatus, PromotionReview, ReviewStatus};
use tracing::info;

use crate::turn::Turn;

const EVALUATION_WEEKS: [u32; 9] = [12, 24, 36, 48, 52, 60, 72, 80, 96];

/// Minimum review score needed to reach `level`.
pub const fn pass_threshold(level: Level) -> u8 {
    match level.number() {
        5 | 6 => 55,
        7 => 60,
        8 => 65,
        9 => 70,
        10 => 72,
        // Out of range for `Level`; such a review can never pass.
        _ => u8::MAX,
    }
}

/// Whether `week` falls on the evaluation cadence.
pub fn is_evaluation_week(week: u32) -> bool {
    week >= 12 && (EVALUATION_WEEKS.contains(&week) || week.checked_rem(12) == Some(0))
}

/// Snapshot of the numbers the thresholds look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Standing {
    week: u32,
    kpi: i64,
    political_capital: i64,
    revenue: i64,
    accidents: u32,
    participated: usize,
    on_rnd: bool,
}

impl Standing {
    fn of(state: &GameState) -> Self {
        let player = &state.player;
        Self {
            week: state.week,
            kpi: player.kpi,
            political_capital: player.political_capital,
            revenue: state.total_revenue(),
            accidents: player.major_accidents,
            participated: player.participated_live_projects.len(),
            on_rnd: state
                .current_project()
                .is_some_and(|p| p.status == ProjectStatus::RnD),
        }
    }

    /// Unmet criteria for `target`. Empty means the player qualifies.
    fn gaps(&self, target: Level) -> Vec<&'static str> {
        let mut gaps = Vec::new();
        let mut need = |ok: bool, hint: &'static str| {
            if !ok {
                gaps.push(hint);
            }
        };
        match target.number() {
            5 | 6 => {
                need(self.week >= 12, "stay on the team for at least 12 weeks");
                need(
                    self.participated >= 1 || self.on_rnd,
                    "ship with a live project or keep contributing to an R&D one",
                );
                need(self.accidents == 0, "avoid major incidents");
                need(self.kpi >= 400, "build up more KPI");
            }
            7 => {
                need(self.week >= 24, "put in at least 24 weeks");
                need(self.kpi >= 1300, "raise your KPI contribution");
                need(
                    self.political_capital >= 8,
                    "earn political capital with key leaders",
                );
                need(self.revenue >= 0, "keep company revenue positive");
            }
            8 => {
                need(self.week >= 36, "put in at least 36 weeks");
                need(self.kpi >= 3000, "own larger core tasks");
                need(
                    self.political_capital >= 25,
                    "build a stronger voice in cross-team work",
                );
                need(
                    self.revenue >= 20_000,
                    "help a project reach meaningful revenue",
                );
                need(self.accidents <= 1, "cut down on major incidents");
            }
            9 => {
                need(self.week >= 52, "put in at least 52 weeks");
                need(self.kpi >= 5000, "deliver steadily across key projects");
                need(
                    self.political_capital >= 40,
                    "earn lasting trust from leadership",
                );
                need(self.revenue >= 50_000, "drive higher business revenue");
            }
            10 => {
                need(self.week >= 80, "put in at least 80 weeks");
                need(
                    self.political_capital >= 80,
                    "become a decisive voice company-wide",
                );
                need(
                    self.revenue >= 200_000,
                    "land a flagship success for the company",
                );
            }
            _ => need(false, "there is no promotion track to this level"),
        }
        gaps
    }
}

/// Levels above the player's whose thresholds are all met, ascending.
pub fn eligible_levels(state: &GameState) -> Vec<Level> {
    let standing = Standing::of(state);
    let mut levels = Vec::new();
    let mut next = state.player.level.next();
    while let Some(level) = next {
        if standing.gaps(level).is_empty() {
            levels.push(level);
        }
        next = level.next();
    }
    levels
}

/// Review prompt for `target`.
pub fn question(target: Level, project_name: &str) -> String {
    format!(
        "Drawing on your concrete work on {project_name}, explain in one paragraph the key value you bring to the team and project and why you are ready for {target}."
    )
}

/// Weekly candidacy check. Opens a review for the highest qualifying level,
/// or posts an advisory on evaluation weeks.
///
/// Returns the level a review was opened for.
pub fn check(turn: &mut Turn<'_>) -> Option<Level> {
    if turn.state.review_pending() || turn.state.player.level.is_top() {
        return None;
    }
    if let Some(target) = eligible_levels(turn.state).last().copied() {
        open_review(turn, target);
        return Some(target);
    }
    if is_evaluation_week(turn.state.week) {
        advise(turn);
    }
    None
}

fn open_review(turn: &mut Turn<'_>, target: Level) {
    let project_name = turn
        .state
        .current_project()
        .map_or_else(|| "your current project".to_owned(), |p| p.name.clone());
    let prompt = question(target, &project_name);
    let week = turn.state.week;
    turn.state.review = Some(PromotionReview {
        status: ReviewStatus::PendingAnswer,
        target_level: target,
        question: prompt.clone(),
        answer: None,
        score: None,
        passed: None,
        comment: None,
        week,
    });
    info!(target = %target, week, "promotion review opened");
    turn.system(format!(
        "You meet the baseline for {target}. Answer the review question: {prompt}"
    ));
}

fn advise(turn: &mut Turn<'_>) {
    let Some(target) = turn.state.player.level.next() else {
        return;
    };
    let gaps = Standing::of(turn.state).gaps(target);
    if gaps.is_empty() {
        return;
    }
    turn.system(format!(
        "No promotion this cycle. Next target: {target}. Suggestions: {}.",
        gaps.join("; ")
    ));
}

/// Record the player's answer and move the review to scoring.
///
/// Returns the review as it stands for the scorer, or `None` when no
/// answer was expected or the text is blank.
pub fn submit_answer(state: &mut GameState, answer: &str) -> Option<PromotionReview> {
    let answer = answer.trim();
    let review = state.review.as_mut()?;
    if review.status != ReviewStatus::PendingAnswer || answer.is_empty() {
        return None;
    }
    review.answer = Some(answer.to_owned());
    review.status = ReviewStatus::PendingScore;
    Some(review.clone())
}

/// Apply a score to the pending review, promoting on a pass.
///
/// Returns whether the player passed. `None` when no review awaited a score.
pub fn apply_score(turn: &mut Turn<'_>, score: u8, comment: &str) -> Option<bool> {
    let review = turn.state.review.as_mut()?;
    if review.status != ReviewStatus::PendingScore {
        return None;
    }
    let score = score.min(100);
    let target = review.target_level;
    let threshold = pass_threshold(target);
    let passed = score >= threshold;
    review.score = Some(score);
    review.passed = Some(passed);
    review.comment = Some(comment.trim().to_owned()).filter(|c| !c.is_empty());
    review.status = ReviewStatus::Finished;

    info!(target = %target, score, threshold, passed, "promotion review scored");
    turn.system(format!("Review score: {score} (pass mark {threshold})."));
    if !comment.trim().is_empty() {
        turn.system(comment.trim().to_owned());
    }
    if passed && target > turn.state.player.level {
        turn.state.player.level = target;
        turn.remember(format!("Promoted to {target}"));
        turn.system(format!("Congratulations! You passed the review and are now {target}."));
    } else {
        turn.system("This review fell short of the bar. There will be another chance next cycle.");
    }
    Some(passed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testkit::Fixture;

    fn qualify_for_p6(state: &mut GameState) {
        state.week = 12;
        state.player.kpi = 500;
        state.player.major_accidents = 0;
        let current = state.player.current_project.clone();
        state.player.participated_live_projects.insert(current);
    }

    #[test]
    fn thresholds_rise_with_level() {
        assert_eq!(pass_threshold(Level::P6), 55);
        assert_eq!(pass_threshold(Level::P8), 65);
        assert_eq!(pass_threshold(Level::P10), 72);
        assert_eq!(pass_threshold(Level::P5), pass_threshold(Level::P6));
    }

    #[test]
    fn top_level_has_its_own_bar() {
        let veteran = Standing {
            week: 80,
            kpi: 0,
            political_capital: 80,
            revenue: 200_000,
            accidents: 3,
            participated: 0,
            on_rnd: false,
        };
        assert!(veteran.gaps(Level::P10).is_empty());
        assert!(!veteran.gaps(Level::P9).is_empty());

        let rookie = Standing { week: 12, political_capital: 0, revenue: 0, ..veteran };
        assert_eq!(rookie.gaps(Level::P10).len(), 3);
    }

    #[test]
    fn evaluation_cadence() {
        assert!(!is_evaluation_week(11));
        assert!(is_evaluation_week(12));
        assert!(is_evaluation_week(52));
        assert!(!is_evaluation_week(53));
        assert!(is_evaluation_week(108));
    }

    #[test]
    fn qualifying_player_gets_a_review() {
        let mut fx = Fixture::seeded(1);
        qualify_for_p6(&mut fx.state);
        assert_eq!(check(&mut fx.turn()), Some(Level::P6));
        let review = fx.state.review.as_ref().unwrap();
        assert_eq!(review.status, ReviewStatus::PendingAnswer);
        assert!(review.question.contains("P6"));
    }

    #[test]
    fn pending_review_blocks_a_second_one() {
        let mut fx = Fixture::seeded(1);
        qualify_for_p6(&mut fx.state);
        check(&mut fx.turn());
        let first = fx.state.review.clone();
        fx.state.week = 24;
        assert_eq!(check(&mut fx.turn()), None);
        assert_eq!(fx.state.review, first);

        submit_answer(&mut fx.state, "I shipped the login flow").unwrap();
        assert_eq!(check(&mut fx.turn()), None);
        apply_score(&mut fx.turn(), 50, "Needs more depth").unwrap();
        assert_eq!(fx.state.review.as_ref().unwrap().status, ReviewStatus::Finished);
        assert_eq!(check(&mut fx.turn()), Some(Level::P6));
    }

    #[test]
    fn passing_score_promotes() {
        let mut fx = Fixture::seeded(1);
        qualify_for_p6(&mut fx.state);
        check(&mut fx.turn());
        assert!(submit_answer(&mut fx.state, "   ").is_none());
        submit_answer(&mut fx.state, "I own the build pipeline").unwrap();
        assert_eq!(apply_score(&mut fx.turn(), 80, "Solid"), Some(true));
        assert_eq!(fx.state.player.level, Level::P6);
        assert!(fx.state.memory_facts.contains(&"Promoted to P6".to_owned()));
        assert_eq!(apply_score(&mut fx.turn(), 80, ""), None);
    }

    #[test]
    fn failing_score_keeps_level() {
        let mut fx = Fixture::seeded(1);
        qualify_for_p6(&mut fx.state);
        check(&mut fx.turn());
        submit_answer(&mut fx.state, "I attend meetings").unwrap();
        assert_eq!(apply_score(&mut fx.turn(), 54, ""), Some(false));
        assert_eq!(fx.state.player.level, Level::P5);
        assert_eq!(fx.state.review.as_ref().unwrap().passed, Some(false));
    }

    #[test]
    fn advisory_lists_gaps_on_evaluation_weeks() {
        let mut fx = Fixture::seeded(1);
        fx.state.week = 24;
        fx.state.player.kpi = 0;
        let before = fx.state.chat_history.len();
        assert_eq!(check(&mut fx.turn()), None);
        let last = fx.state.chat_history.last().unwrap();
        assert_eq!(fx.state.chat_history.len(), before + 1);
        assert!(last.content.starts_with("No promotion this cycle. Next target: P6."));
        assert!(last.content.contains("build up more KPI"));
    }

    #[test]
    fn highest_qualifying_level_wins() {
        let mut fx = Fixture::seeded(1);
        fx.state.week = 40;
        fx.state.player.kpi = 3500;
        fx.state.player.political_capital = 30;
        fx.state.projects.values_mut().next().unwrap().revenue = 25_000;
        assert_eq!(eligible_levels(&fx.state).last(), Some(&Level::P8));
    }
}
