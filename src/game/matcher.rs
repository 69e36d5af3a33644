//! Match evaluation and the feedback window.
//!
//! An attempt compares the participant's card against every uncovered
//! opponent. Only the card number matters. After every evaluated attempt a
//! feedback window opens; attempts are ignored until it expires.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::game::card::parse_token;
use crate::game::engine::EngineState;
use crate::game::rounds::{PLAYERS, SELF_PLAYER};
use crate::game::scheduler::AttemptPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Success,
    Fail,
}

/// Outcome on display plus the seats it highlights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackWindow {
    pub outcome: MatchOutcome,
    /// Player 1 followed by every matched opponent.
    pub highlighted: Vec<u8>,
    pub closes_at: DateTime<Utc>,
}

impl FeedbackWindow {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now < self.closes_at
    }

    /// Milliseconds until the window closes, 0 once it has.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.closes_at - now).num_milliseconds().max(0)
    }
}

/// An evaluated attempt. Becomes exactly one result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub outcome: MatchOutcome,
    pub round: usize,
    pub simulation: u8,
    /// Opponents that matched, in seat order.
    pub matches: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Evaluated(AttemptReport),
    /// No parseable card in the participant's seat. Nothing is recorded.
    NoSelfCard,
    /// Feedback window still open, or no attempt is running.
    Ignored,
}

/// Evaluate an attempt at `now`, opening a feedback window of
/// `window_ms` if it is evaluated.
pub fn attempt(engine: &mut EngineState, now: DateTime<Utc>, window_ms: u32) -> AttemptResult {
    expire_feedback(engine, now);
    if engine.feedback.is_some() || engine.phase() != AttemptPhase::Running {
        return AttemptResult::Ignored;
    }

    let Some(self_card) = engine.board_token(SELF_PLAYER).and_then(parse_token) else {
        return AttemptResult::NoSelfCard;
    };

    let matches: Vec<u8> = (SELF_PLAYER + 1..=PLAYERS as u8)
        .filter(|&p| !engine.is_covered(p))
        .filter(|&p| {
            engine
                .board_token(p)
                .and_then(parse_token)
                .is_some_and(|card| card.matches(&self_card))
        })
        .collect();

    let outcome = if matches.is_empty() {
        MatchOutcome::Fail
    } else {
        MatchOutcome::Success
    };
    for &player in &matches {
        engine.cover(player);
    }

    let mut highlighted = Vec::with_capacity(matches.len() + 1);
    highlighted.push(SELF_PLAYER);
    highlighted.extend_from_slice(&matches);
    engine.feedback = Some(FeedbackWindow {
        outcome,
        highlighted,
        closes_at: now + Duration::milliseconds(i64::from(window_ms)),
    });

    AttemptResult::Evaluated(AttemptReport {
        outcome,
        round: engine.round_index(),
        simulation: engine.simulation(),
        matches,
    })
}

/// Close the feedback window if it is due. Returns true if it closed.
pub fn expire_feedback(engine: &mut EngineState, now: DateTime<Utc>) -> bool {
    let due = engine.feedback.as_ref().is_some_and(|w| !w.is_open(now));
    if due {
        engine.feedback = None;
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rounds::{Round, RoundSequence};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn engine(rows: &[&[&str]]) -> EngineState {
        let rounds = rows.iter().map(|r| Round::from_fields(r.iter())).collect();
        EngineState::start(RoundSequence::new(1, rounds))
    }

    fn evaluated(result: AttemptResult) -> AttemptReport {
        match result {
            AttemptResult::Evaluated(report) => report,
            other => panic!("expected an evaluated attempt, got {:?}", other),
        }
    }

    #[test]
    fn number_match_ignores_colour_and_orientation() {
        let mut e = engine(&[&["_", "1.1.1", "1.2.1", "2.3.2", "", "", "", "", ""]]);
        let report = evaluated(attempt(&mut e, t0(), 750));
        assert_eq!(report.outcome, MatchOutcome::Success);
        assert_eq!(report.matches, vec![2]);
        assert_eq!(report.round, 1);
        assert_eq!(e.feedback().unwrap().highlighted, vec![1, 2]);
        assert!(e.is_covered(2));
        assert!(!e.is_covered(3));
    }

    #[test]
    fn literal_sample_row_matches_player_three() {
        let mut e = engine(&[&["_", "1.1.1", "2.2.1", "1.3.2", "", "", "", "", ""]]);
        let report = evaluated(attempt(&mut e, t0(), 750));
        assert_eq!(report.outcome, MatchOutcome::Success);
        assert_eq!(report.matches, vec![3]);
        assert_eq!(e.covered().get(&3).map(String::as_str), Some("1.3.2"));
    }

    #[test]
    fn no_match_is_a_fail_highlighting_self() {
        let mut e = engine(&[&["_", "4.1.1", "1.2.1", "2.3.2"]]);
        let report = evaluated(attempt(&mut e, t0(), 750));
        assert_eq!(report.outcome, MatchOutcome::Fail);
        assert!(report.matches.is_empty());
        assert_eq!(e.feedback().unwrap().highlighted, vec![1]);
        assert!(e.covered().is_empty());
    }

    #[test]
    fn covered_opponents_do_not_match() {
        let mut e = engine(&[&["_", "1.1.1", "1.2.1"]]);
        evaluated(attempt(&mut e, t0(), 750));
        let report = evaluated(attempt(&mut e, t0() + ms(800), 750));
        assert_eq!(report.outcome, MatchOutcome::Fail);
    }

    #[test]
    fn multiple_matches_are_all_covered() {
        let mut e = engine(&[&["_", "*3.1.1*", "3.2.2", "", "3.4.4", "7.1.1", "", "", "3.1.3"]]);
        let report = evaluated(attempt(&mut e, t0(), 750));
        assert_eq!(report.matches, vec![2, 4, 8]);
        assert_eq!(e.covered().len(), 3);
        assert!(!e.is_covered(SELF_PLAYER));
    }

    #[test]
    fn attempts_inside_window_are_ignored() {
        let mut e = engine(&[&["_", "1.1.1", "1.2.1", "1.3.1"]]);
        evaluated(attempt(&mut e, t0(), 750));
        assert_eq!(attempt(&mut e, t0() + ms(749), 750), AttemptResult::Ignored);
        assert!(e.feedback().is_some());

        let report = evaluated(attempt(&mut e, t0() + ms(750), 750));
        assert_eq!(report.outcome, MatchOutcome::Fail);
    }

    #[test]
    fn feedback_expires_on_schedule() {
        let mut e = engine(&[&["_", "1.1.1", "1.2.1"]]);
        evaluated(attempt(&mut e, t0(), 750));
        let window = e.feedback().unwrap().clone();
        assert_eq!(window.remaining_ms(t0() + ms(500)), 250);
        assert!(!expire_feedback(&mut e, t0() + ms(700)));
        assert!(expire_feedback(&mut e, t0() + ms(750)));
        assert!(e.feedback().is_none());
        assert!(!expire_feedback(&mut e, t0() + ms(900)));
        assert_eq!(window.remaining_ms(t0() + ms(2000)), 0);
    }

    #[test]
    fn missing_or_malformed_self_card_is_a_noop() {
        let mut e = engine(&[&["_", "", "1.2.1"]]);
        assert_eq!(attempt(&mut e, t0(), 750), AttemptResult::NoSelfCard);
        assert!(e.feedback().is_none());

        let mut e = engine(&[&["_", "1.2", "1.2.1"]]);
        assert_eq!(attempt(&mut e, t0(), 750), AttemptResult::NoSelfCard);
        assert!(e.covered().is_empty());
    }

    #[test]
    fn ended_attempt_ignores_input() {
        let mut e = engine(&[&["_", "1.1.1", "1.2.1"]]);
        e.tick();
        assert_eq!(e.phase(), AttemptPhase::Ended);
        assert_eq!(attempt(&mut e, t0(), 750), AttemptResult::Ignored);
    }

    #[test]
    fn matched_player_uncovers_when_their_card_changes() {
        let mut e = engine(&[
            &["1", "1.1.1", "1.2.1"],
            &["2", "", "1.2.1"],
            &["3", "", "1.4.2"],
        ]);
        evaluated(attempt(&mut e, t0(), 750));
        e.tick();
        assert!(e.is_covered(2));
        e.tick();
        assert!(!e.is_covered(2));

        let report = evaluated(attempt(&mut e, t0() + ms(1000), 750));
        assert_eq!(report.outcome, MatchOutcome::Success);
        assert_eq!(report.round, 3);
    }
}
