//! Engine state: the one aggregate shared by round playback and match
//! evaluation.
//!
//! The board is a fold over the rounds played so far, but the covered map
//! also depends on which attempts succeeded. Both the accumulator
//! ([`EngineState::apply_round`]) and the evaluator
//! ([`crate::game::matcher::attempt`]) therefore take `&mut EngineState`
//! rather than owning separate pieces of it.

use std::collections::BTreeMap;

use crate::game::card::normalize;
use crate::game::matcher::FeedbackWindow;
use crate::game::rounds::{PLAYERS, Round, RoundSequence, SELF_PLAYER};
use crate::game::scheduler::{AttemptPhase, TickOutcome};

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    rounds: RoundSequence,
    /// Last seen raw token per seat, index 0 = player 1.
    board: [Option<String>; PLAYERS],
    /// Player -> normalized token that was showing when they were matched.
    covered: BTreeMap<u8, String>,
    /// 1-based index of the visible round, 0 before anything is loaded.
    round_index: usize,
    phase: AttemptPhase,
    pub(crate) feedback: Option<FeedbackWindow>,
}

impl EngineState {
    /// Fresh engine showing round 1 of `rounds`.
    pub fn start(rounds: RoundSequence) -> Self {
        let mut engine = EngineState {
            rounds,
            ..EngineState::default()
        };
        if let Some(first) = engine.rounds.round(1).cloned() {
            engine.round_index = 1;
            engine.apply_round(&first);
            engine.phase = AttemptPhase::Running;
        }
        engine
    }

    /// Fold one round into the board.
    ///
    /// Covered players whose token changed are uncovered first, then every
    /// non-empty token overwrites its seat. Empty cells leave the seat as is.
    pub fn apply_round(&mut self, round: &Round) {
        self.covered.retain(|&player, covered_token| match round.token(player) {
            Some(token) => normalize(token) == *covered_token,
            None => true,
        });

        for (idx, seat) in self.board.iter_mut().enumerate() {
            if let Some(token) = round.token(idx as u8 + 1) {
                *seat = Some(token.to_string());
            }
        }
    }

    /// Advance one round, or end the attempt when the last round has been
    /// shown. Ending happens once; later ticks are ignored.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != AttemptPhase::Running {
            return TickOutcome::Ignored;
        }
        if self.round_index < self.rounds.len() {
            self.round_index += 1;
            if let Some(round) = self.rounds.round(self.round_index).cloned() {
                self.apply_round(&round);
            }
            TickOutcome::Advanced(self.round_index)
        } else {
            self.phase = AttemptPhase::Ended;
            TickOutcome::Ended
        }
    }

    /// Hide a matched opponent behind the token they are showing now.
    /// The participant's own seat is never covered.
    pub(crate) fn cover(&mut self, player: u8) {
        if player == SELF_PLAYER {
            return;
        }
        let token = self.board_token(player).map(normalize).unwrap_or_default();
        self.covered.insert(player, token);
    }

    /// Raw token showing at a 1-based seat.
    pub fn board_token(&self, player: u8) -> Option<&str> {
        let idx = usize::from(player).checked_sub(1)?;
        self.board.get(idx)?.as_deref()
    }

    pub fn is_covered(&self, player: u8) -> bool {
        self.covered.contains_key(&player)
    }

    pub fn covered(&self) -> &BTreeMap<u8, String> {
        &self.covered
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn simulation(&self) -> u8 {
        self.rounds.simulation
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn feedback(&self) -> Option<&FeedbackWindow> {
        self.feedback.as_ref()
    }
}
