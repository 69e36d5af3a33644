//! Jungle Speed experiment engine as an in-browser WASM server.
//!
//! Exports `handle_request(method, path, query, body)` for the page's HTMX
//! bridge to call. Uses `matchit` for URL routing, the same router engine
//! that powers Axum. Session state lives in WASM memory for the lifetime of
//! the page; participant id and results are written through to
//! localStorage.

use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod routes;

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript via wasm-bindgen.
///
/// # Arguments
/// * `method`: HTTP method (e.g., "GET", "POST")
/// * `path`: URL path (e.g., "/api/play/tick")
/// * `query`: Query string, may be empty
/// * `body`: Request body (e.g., POST form data). Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    let mut router = matchit::Router::new();

    router.insert("/api/screen", "screen").ok();

    // Onboarding and attempt sequencing
    router.insert("/api/session/language", "session_language").ok();
    router.insert("/api/session/demographics", "session_demographics").ok();
    router.insert("/api/session/start", "session_start").ok();
    router.insert("/api/session/next", "session_next").ok();

    // Playback
    router.insert("/api/play/load", "play_load").ok();
    router.insert("/api/play/retry", "play_retry").ok();
    router.insert("/api/play/tick", "play_tick").ok();
    router.insert("/api/play/attempt", "play_attempt").ok();
    router.insert("/api/play/feedback", "play_feedback").ok();

    // Result log
    router.insert("/api/results/export", "results_export").ok();
    router.insert("/api/results/state", "results_state").ok();
    router.insert("/api/results/import", "results_import").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("screen", "GET") => routes::screen::handle_get(query),

            ("session_language", "POST") => routes::onboarding::handle_language_post(body),
            ("session_demographics", "POST") => routes::onboarding::handle_demographics_post(body),
            ("session_start", "POST") => routes::onboarding::handle_start_post(body),
            ("session_next", "POST") => routes::results::handle_next_post(body),

            ("play_load", "POST") => routes::play::handle_load_post(body),
            ("play_retry", "POST") => routes::play::handle_retry_post(body),
            ("play_tick", "POST") => routes::play::handle_tick_post(body),
            ("play_attempt", "POST") => routes::play::handle_attempt_post(body),
            ("play_feedback", "POST") => routes::play::handle_feedback_post(body),

            ("results_export", "GET") => routes::results::handle_export_get(query),
            ("results_state", "GET") => routes::results::handle_state_get(query),
            ("results_import", "POST") => routes::results::handle_import_post(body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

/// Apply a JSON config and start a fresh session with it.
///
/// Returns `"ok"` or `"error: <reason>"`; an invalid config leaves the
/// previous one active.
#[wasm_bindgen]
pub fn configure(json: &str) -> String {
    match config::GameConfig::from_json(json) {
        Ok(config) => {
            logging::init(config.level_filter());
            log::info!(
                "configured: {} attempts, pool {:?}",
                config.attempts_per_session,
                config.simulation_pool
            );
            config::replace_config(config);
            game::state::reset_session();
            "ok".to_string()
        }
        Err(e) => {
            log::error!("{}", e);
            format!("error: {}", e)
        }
    }
}

/// Install the console logger at `level` (`error` … `trace`). Unknown
/// levels fall back to `info`.
#[wasm_bindgen]
pub fn init_logging(level: &str) {
    logging::init(level.parse().unwrap_or(log::LevelFilter::Info));
}

fn not_found() -> String {
    r#"<span class="text-red-600">404: route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-red-600">405: method not allowed</span>"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{reset_session, with_session};

    #[test]
    fn routes_screen() {
        reset_session();
        let html = handle_request("GET", "/api/screen", "", "");
        assert!(html.contains("Elige tu idioma"));
        reset_session();
    }

    #[test]
    fn returns_404_for_unknown_route() {
        let html = handle_request("GET", "/api/nonexistent", "", "");
        assert!(html.contains("404"));
    }

    #[test]
    fn returns_405_for_wrong_method() {
        let html = handle_request("GET", "/api/play/tick", "", "");
        assert!(html.contains("405"));
        let html = handle_request("POST", "/api/results/export", "", "");
        assert!(html.contains("405"));
    }

    #[test]
    fn routes_onboarding_to_loading() {
        reset_session();
        handle_request("POST", "/api/session/language", "", "lang=en");
        handle_request("POST", "/api/session/demographics", "", "gender=Female&age=40-49");
        let html = handle_request("POST", "/api/session/demographics", "", "action=continue");
        assert!(html.contains("How to play Jungle Speed?"));
        let html = handle_request("POST", "/api/session/start", "", "");
        assert!(html.contains("Loading..."));
        reset_session();
    }

    #[test]
    fn routes_full_attempt() {
        reset_session();
        handle_request("POST", "/api/session/language", "", "lang=es");
        handle_request("POST", "/api/session/demographics", "", "gender=Otro&age=10-19");
        handle_request("POST", "/api/session/demographics", "", "action=continue");
        handle_request("POST", "/api/session/start", "", "");
        let sim = with_session(|s| match s.screen() {
            game::session::Screen::Playing { simulation, .. } => *simulation,
            other => panic!("not playing: {:?}", other),
        });

        let data = "ronda;j1;j2;j3;j4;j5;j6;j7;j8%0A1;2.1.1;2.3.2;;;;;;%0A2;2.1.1;;;;;;;%0A";
        let html = handle_request("POST", "/api/play/load", "", &format!("simulation={}&data={}", sim, data));
        assert!(html.contains("Ronda 1"));

        let html = handle_request("POST", "/api/play/attempt", "", "");
        assert!(html.contains("¡Correcto!"));

        let generation = with_session(|s| s.active_timer().unwrap().generation);
        handle_request("POST", "/api/play/tick", "", &format!("timer={}", generation));
        let html = handle_request("POST", "/api/play/tick", "", &format!("timer={}", generation));
        assert!(html.contains("Primera simulación completada"));
        assert!(html.contains("Has acertado 1 veces"));

        let json = handle_request("GET", "/api/results/state", "", "");
        assert!(json.contains(r#""result":"success""#));
        let script = handle_request("GET", "/api/results/export", "", "");
        assert!(script.contains("success,1,0"));

        let html = handle_request("POST", "/api/session/next", "", "");
        assert!(html.contains("Cargando..."));
        reset_session();
    }

    #[test]
    fn routes_results_import() {
        reset_session();
        let html = handle_request("POST", "/api/results/import", "", "[]");
        assert!(html.contains("0 results imported successfully"));
        reset_session();
    }

    #[test]
    fn configure_rejects_invalid_config() {
        let out = configure(r#"{"cadences_ms":[]}"#);
        assert!(out.starts_with("error:"));
        assert_eq!(config::current().cadences_ms, vec![750, 500, 250]);
    }

    #[test]
    fn configure_applies_and_resets_session() {
        let out = configure(r#"{"cadences_ms":[400],"attempt_key":"KeyJ"}"#);
        assert_eq!(out, "ok");
        with_session(|s| {
            assert_eq!(s.config().attempt_key, "KeyJ");
            assert_eq!(s.config().cadences_ms, vec![400]);
        });
        assert_eq!(configure(""), "ok");
        reset_session();
    }
}
