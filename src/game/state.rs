//! Global session container.
//!
//! Uses `thread_local!` + `RefCell` for safe mutable access in single-threaded
//! WASM. The page keeps the module alive, so the session persists across
//! `handle_request` calls until the tab is closed.

use std::cell::RefCell;

use crate::config;
use crate::game::session::Session;
use crate::game::storage::default_storage;

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

fn open_default() -> Session {
    Session::open(config::current(), default_storage())
}

/// Execute a closure with read access to the session, opening it on first
/// use.
pub fn with_session<F, R>(f: F) -> R
where
    F: FnOnce(&Session) -> R,
{
    SESSION.with(|s| {
        let mut slot = s.borrow_mut();
        f(slot.get_or_insert_with(open_default))
    })
}

/// Execute a closure with mutable access to the session.
pub fn with_session_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut Session) -> R,
{
    SESSION.with(|s| {
        let mut slot = s.borrow_mut();
        f(slot.get_or_insert_with(open_default))
    })
}

/// Replace the whole session (init and tests).
pub fn replace_session(session: Session) {
    SESSION.with(|s| {
        *s.borrow_mut() = Some(session);
    });
}

/// Start over with a freshly opened session using the active config.
pub fn reset_session() {
    replace_session(open_default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::{Language, Screen};

    #[test]
    fn session_opens_lazily_on_language_screen() {
        reset_session();
        with_session(|s| assert_eq!(s.screen(), &Screen::Language));
    }

    #[test]
    fn mutations_persist_between_calls() {
        reset_session();
        with_session_mut(|s| s.choose_language(Language::En)).unwrap();
        with_session(|s| {
            assert_eq!(s.screen(), &Screen::Demographic);
            assert_eq!(s.language(), Language::En);
        });
        reset_session();
        with_session(|s| assert_eq!(s.screen(), &Screen::Language));
    }

    #[test]
    fn session_has_participant_id() {
        reset_session();
        let id = with_session(|s| s.user_id().to_string());
        assert!(!id.is_empty());
    }
}
