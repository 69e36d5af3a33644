//! `GET /api/screen`: renders whichever screen the session is on.
//!
//! Every handler that moves the session forward answers with this, so a
//! request from the wrong screen simply shows the right one again.

use chrono::{DateTime, Utc};

use crate::game::session::{Screen, Session};
use crate::game::state::with_session;
use crate::routes::{onboarding, play, results};

/// Handle GET /api/screen
pub fn handle_get(_query: &str) -> String {
    with_session(render_screen_now)
}

pub fn render_screen(session: &Session, now: DateTime<Utc>) -> String {
    match session.screen() {
        Screen::Language => onboarding::render_language(),
        Screen::Demographic => onboarding::render_demographic(session),
        Screen::Explanation => onboarding::render_explanation(session),
        Screen::Playing { simulation, .. } => play::render_playing(session, *simulation, now),
        Screen::Transition {
            completed_attempt,
            tally,
        } => results::render_transition(session, *completed_attempt, *tally),
        Screen::Completed => results::render_completed(session),
    }
}

pub fn render_screen_now(session: &Session) -> String {
    render_screen(session, Utc::now())
}
