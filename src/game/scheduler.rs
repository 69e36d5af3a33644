//! Playback timing: cadence schedule, timer handles and the highlight
//! rotation.
//!
//! The host owns the real timer (an HTMX `load delay:` trigger). Every
//! trigger carries the generation id of the handle that scheduled it, and the
//! scheduler only accepts the live generation. Cancelling or restarting
//! therefore disarms every trigger that is still in flight.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::game::rounds::PLAYERS;

/// Lifecycle of one attempt's playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttemptPhase {
    #[default]
    Idle,
    Running,
    Ended,
}

/// What follows an attempt that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptEnd {
    /// Show the transition screen, then start attempt `next_attempt`.
    NextAttempt { next_attempt: usize },
    SessionComplete,
}

/// Result of handling one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick came from a cancelled or superseded timer.
    Stale,
    /// Round index moved to this 1-based round.
    Advanced(usize),
    /// The attempt ended on this tick. Reported exactly once per attempt.
    Ended,
    /// The attempt is not running. Nothing changed.
    Ignored,
}

/// Tick interval for a 0-based attempt index. Later attempts reuse the last
/// configured cadence.
pub fn cadence_for_attempt(config: &GameConfig, attempt: usize) -> u32 {
    config
        .cadences_ms
        .get(attempt)
        .or_else(|| config.cadences_ms.last())
        .copied()
        .unwrap_or(250)
}

/// Decide what comes after `attempt` (0-based) ends.
pub fn after_attempt(config: &GameConfig, attempt: usize) -> AttemptEnd {
    if attempt + 1 < config.attempts_per_session {
        AttemptEnd::NextAttempt {
            next_attempt: attempt + 1,
        }
    } else {
        AttemptEnd::SessionComplete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerHandle {
    pub generation: u32,
    pub cadence_ms: u32,
}

/// Keeps at most one live timer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackScheduler {
    active: Option<TimerHandle>,
    next_generation: u32,
}

impl PlaybackScheduler {
    /// Start a timer, cancelling any active one.
    pub fn start(&mut self, cadence_ms: u32) -> TimerHandle {
        self.cancel();
        self.next_generation = self.next_generation.wrapping_add(1);
        let handle = TimerHandle {
            generation: self.next_generation,
            cadence_ms,
        };
        self.active = Some(handle);
        handle
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.active.take() {
            log::debug!("cancelled timer generation {}", handle.generation);
        }
    }

    pub fn active(&self) -> Option<TimerHandle> {
        self.active
    }

    /// Whether a tick from `generation` should be processed.
    pub fn accepts(&self, generation: u32) -> bool {
        self.active.is_some_and(|h| h.generation == generation)
    }
}

/// Player whose seat carries the "active" highlight in a round.
///
/// Rotates one seat per round. During the last three rounds it holds at
/// `((total - 4) mod 8) + 1`. The remainder keeps the sign of the dividend,
/// so very short sequences can yield a value outside `1..=8`, which means no
/// seat is highlighted.
pub fn highlighted_player(round: usize, total: usize) -> Option<u8> {
    let round = round as i64;
    let total = total as i64;
    let seats = PLAYERS as i64;
    let player = if round > total - 3 {
        ((total - 4) % seats) + 1
    } else {
        ((round - 1) % seats) + 1
    };
    u8::try_from(player).ok().filter(|p| (1..=PLAYERS as u8).contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_decreases_per_attempt() {
        let config = GameConfig::default();
        assert_eq!(cadence_for_attempt(&config, 0), 750);
        assert_eq!(cadence_for_attempt(&config, 1), 500);
        assert_eq!(cadence_for_attempt(&config, 2), 250);
        assert_eq!(cadence_for_attempt(&config, 7), 250);
    }

    #[test]
    fn after_attempt_signals_transition_then_completion() {
        let config = GameConfig::default();
        assert_eq!(
            after_attempt(&config, 0),
            AttemptEnd::NextAttempt { next_attempt: 1 }
        );
        assert_eq!(
            after_attempt(&config, 1),
            AttemptEnd::NextAttempt { next_attempt: 2 }
        );
        assert_eq!(after_attempt(&config, 2), AttemptEnd::SessionComplete);
    }

    #[test]
    fn restart_invalidates_previous_generation() {
        let mut scheduler = PlaybackScheduler::default();
        let first = scheduler.start(750);
        assert!(scheduler.accepts(first.generation));

        let second = scheduler.start(500);
        assert!(!scheduler.accepts(first.generation));
        assert!(scheduler.accepts(second.generation));
        assert_eq!(scheduler.active().unwrap().cadence_ms, 500);
    }

    #[test]
    fn cancel_rejects_every_generation() {
        let mut scheduler = PlaybackScheduler::default();
        let handle = scheduler.start(250);
        scheduler.cancel();
        assert!(!scheduler.accepts(handle.generation));
        assert!(scheduler.active().is_none());
        scheduler.cancel();
    }

    #[test]
    fn highlight_rotates_through_seats() {
        let total = 20;
        assert_eq!(highlighted_player(1, total), Some(1));
        assert_eq!(highlighted_player(2, total), Some(2));
        assert_eq!(highlighted_player(8, total), Some(8));
        assert_eq!(highlighted_player(9, total), Some(1));
        assert_eq!(highlighted_player(17, total), Some(1));
    }

    #[test]
    fn highlight_freezes_for_last_three_rounds() {
        let total = 20;
        // round 17 is the last rotating round; 18..20 hold at ((20-4) % 8) + 1
        assert_eq!(highlighted_player(17, total), Some(1));
        assert_eq!(highlighted_player(18, total), Some(1));
        assert_eq!(highlighted_player(19, total), Some(1));
        assert_eq!(highlighted_player(20, total), Some(1));

        let total = 13;
        assert_eq!(highlighted_player(10, total), Some(2));
        assert_eq!(highlighted_player(11, total), Some(2));
        assert_eq!(highlighted_player(13, total), Some(2));
    }

    #[test]
    fn highlight_for_tiny_sequences() {
        assert_eq!(highlighted_player(1, 4), Some(1));
        // (3 - 4) % 8 + 1 == 0: nobody highlighted
        assert_eq!(highlighted_player(1, 3), None);
        assert_eq!(highlighted_player(1, 1), None);
    }
}
