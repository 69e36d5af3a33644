//! `/api/play/*` routes: data loading, the playback timer, attempts and the
//! feedback window.
//!
//! Two `load delay:<ms>` triggers drive time. `#ticker` sits outside
//! `#board` and swaps the whole `#app`, so only one ever exists. Attempt and
//! feedback responses swap `#board` alone and leave the ticker's delay
//! running.

use chrono::{DateTime, Utc};

use crate::game::card::parse_token;
use crate::game::matcher::{AttemptResult, MatchOutcome};
use crate::game::rounds::data_url;
use crate::game::scheduler::{AttemptPhase, highlighted_player};
use crate::game::session::{Language, Screen, Session};
use crate::game::state::with_session_mut;
use crate::routes::screen::render_screen;
use crate::routes::util::{escape_html, get_param, hx_vals, parse_form_body};

const CARD_BACK: &str = "/JungleSVG/Reverso_Jungle_Speed.svg";

/// Seat layout on the 3x3 table as (row, col, player). Player 1 is the
/// participant at bottom centre.
const GRID_MAP: [(usize, usize, u8); 8] = [
    (2, 1, 1),
    (2, 0, 2),
    (1, 0, 3),
    (0, 0, 4),
    (0, 1, 5),
    (0, 2, 6),
    (1, 2, 7),
    (2, 2, 8),
];

// ── POST /api/play/load ────────────────────────────────────────────

/// Handle POST /api/play/load
/// Body params:
///   - simulation={id}&data={csv}    → install fetched round data
///   - simulation={id}&error={msg}   → the fetch failed
///
/// Posted by the script in [`render_loading`].
pub fn handle_load_post(body: &str) -> String {
    let params = parse_form_body(body);
    let simulation = get_param(&params, "simulation").and_then(|s| s.trim().parse::<u8>().ok());
    let now = Utc::now();
    with_session_mut(|s| {
        let Some(simulation) = simulation else {
            log::warn!("load posted without a simulation id");
            return render_screen(s, now);
        };
        if let Some(reason) = get_param(&params, "error") {
            if matches!(s.screen(), Screen::Playing { simulation: current, .. } if *current == simulation) {
                s.load_failed(simulation, reason);
            }
            return render_screen(s, now);
        }
        let data = get_param(&params, "data").unwrap_or("");
        if let Err(e) = s.load_simulation(simulation, data) {
            if !e.is_load_failure() {
                log::warn!("{}", e);
            }
        }
        render_screen(s, now)
    })
}

// ── POST /api/play/retry ───────────────────────────────────────────

/// Handle POST /api/play/retry
/// Clears a load failure and renders the loading fragment again.
pub fn handle_retry_post(_body: &str) -> String {
    let now = Utc::now();
    with_session_mut(|s| {
        if let Err(e) = s.retry_load() {
            log::warn!("{}", e);
        }
        render_screen(s, now)
    })
}

// ── POST /api/play/tick ────────────────────────────────────────────

/// Handle POST /api/play/tick
/// Body: timer={generation}
pub fn handle_tick_post(body: &str) -> String {
    let params = parse_form_body(body);
    let now = Utc::now();
    with_session_mut(|s| {
        match get_param(&params, "timer").and_then(|t| t.parse::<u32>().ok()) {
            Some(generation) => {
                let outcome = s.tick(generation, now);
                log::debug!("tick {} -> {:?}", generation, outcome);
            }
            None => log::warn!("tick posted without a timer generation"),
        }
        render_screen(s, now)
    })
}

// ── POST /api/play/attempt ─────────────────────────────────────────

/// Handle POST /api/play/attempt
/// Returns the inner HTML of `#board`.
pub fn handle_attempt_post(_body: &str) -> String {
    let now = Utc::now();
    with_session_mut(|s| {
        match s.attempt(now) {
            AttemptResult::Evaluated(report) => log::info!(
                "round {} of simulation {}: {:?} (matches {:?})",
                report.round,
                report.simulation,
                report.outcome,
                report.matches
            ),
            AttemptResult::NoSelfCard => log::debug!("attempt without a card in seat 1"),
            AttemptResult::Ignored => {}
        }
        render_board(s, now)
    })
}

// ── POST /api/play/feedback ────────────────────────────────────────

/// Handle POST /api/play/feedback
/// Fired when the feedback window should have closed.
pub fn handle_feedback_post(_body: &str) -> String {
    let now = Utc::now();
    with_session_mut(|s| {
        s.expire_feedback(now);
        render_board(s, now)
    })
}

// ── Rendering ──────────────────────────────────────────────────────

/// Playing screen: loading, load failure or the running table.
pub fn render_playing(session: &Session, simulation: u8, now: DateTime<Utc>) -> String {
    if let Some(error) = session.load_error() {
        return render_load_error(session, error);
    }
    let Some(timer) = session.active_timer() else {
        return render_loading(session, simulation);
    };

    let download = match session.language() {
        Language::Es => "Descargar resultados CSV",
        Language::En => "Download results CSV",
    };
    let key = escape_html(&session.config().attempt_key);

    let mut html = String::with_capacity(4096);
    html.push_str(r#"<div class="min-h-screen flex flex-col items-center justify-center bg-white relative">"#);
    html.push_str(&format!(
        r##"<button class="absolute top-4 right-4 px-4 py-2 bg-blue-600 text-white rounded shadow hover:bg-blue-700 z-30" hx-get="/api/results/export" hx-target="#download" hx-swap="innerHTML">{}</button>"##,
        download
    ));
    html.push_str(r#"<h1 class="text-5xl font-bold mb-8 mt-8">Jungle Speed</h1>"#);
    html.push_str(r#"<div id="board" class="relative">"#);
    html.push_str(&render_board(session, now));
    html.push_str("</div>");
    html.push_str(r#"<div id="download" class="hidden"></div>"#);
    html.push_str(&format!(
        r##"<div id="ticker" hx-post="/api/play/tick" hx-vals="{}" hx-trigger="load delay:{}ms" hx-target="#app" hx-swap="innerHTML"></div>"##,
        hx_vals("timer", &timer.generation.to_string()),
        timer.cadence_ms
    ));
    html.push_str(&format!(
        r##"<div id="attempt-key" hx-post="/api/play/attempt" hx-trigger="keydown[code=='{}'] from:body" hx-target="#board" hx-swap="innerHTML"></div>"##,
        key
    ));
    html.push_str("</div>");
    html
}

/// Inner HTML of `#board`: the 3x3 table, the outcome banner and, while
/// the feedback window is open, its expiry trigger.
pub fn render_board(session: &Session, now: DateTime<Utc>) -> String {
    let engine = session.engine();
    if engine.phase() != AttemptPhase::Running {
        return String::new();
    }
    let round = engine.round_index();
    let active_seat = highlighted_player(round, engine.total_rounds());
    let feedback = engine.feedback().filter(|f| f.is_open(now));
    let language = session.language();

    let mut cells: [[String; 3]; 3] = Default::default();
    for &(row, col, player) in GRID_MAP.iter() {
        let mut border = String::new();
        if let Some(f) = feedback {
            if f.highlighted.contains(&player) {
                border.push_str(match f.outcome {
                    MatchOutcome::Success => "border-4 border-green-500",
                    MatchOutcome::Fail => "border-4 border-red-500",
                });
            }
        }
        if active_seat == Some(player) {
            border.push_str(" border-4 border-gray-400");
        }
        let class = if border.trim().is_empty() {
            "flex items-center justify-center w-48 h-48".to_string()
        } else {
            format!(
                "flex items-center justify-center w-48 h-48 bg-white {}",
                border.trim()
            )
        };

        cells[row][col] = if engine.is_covered(player) {
            format!(
                r#"<div class="{}" data-player="{}"><img src="{}" alt="Reverso" class="max-w-full max-h-full"></div>"#,
                class, player, CARD_BACK
            )
        } else if let Some(card) = engine.board_token(player).and_then(parse_token) {
            let asset = card.asset_path();
            format!(
                r#"<div class="{}" data-player="{}" style="transform: rotate({}deg)"><img src="{}" alt="{}" class="max-w-full max-h-full"></div>"#,
                class,
                player,
                card.orientation.degrees(),
                escape_html(&asset),
                escape_html(asset.trim_start_matches("/JungleSVG/"))
            )
        } else {
            format!(r#"<div class="{}" data-player="{}"></div>"#, class, player)
        };
    }
    let label = match language {
        Language::Es => "Ronda",
        Language::En => "Round",
    };
    cells[1][1] = format!(
        r#"<div class="w-48 h-48 flex items-center justify-center text-gray-600 text-lg font-semibold select-none">{} {}</div>"#,
        label, round
    );

    let mut html = String::with_capacity(3072);
    if let Some(f) = feedback {
        let (color, text) = match (f.outcome, language) {
            (MatchOutcome::Success, Language::Es) => ("text-green-700", "¡Correcto!"),
            (MatchOutcome::Success, Language::En) => ("text-green-700", "Correct!"),
            (MatchOutcome::Fail, Language::Es) => ("text-red-700", "¡Incorrecto!"),
            (MatchOutcome::Fail, Language::En) => ("text-red-700", "Incorrect!"),
        };
        html.push_str(&format!(
            r#"<div class="absolute left-1/2 -translate-x-1/2 z-30" style="top: calc(100% - 200px)"><span class="text-3xl font-bold {}">{}</span></div>"#,
            color, text
        ));
        html.push_str(&format!(
            r##"<div hx-post="/api/play/feedback" hx-trigger="load delay:{}ms" hx-target="#board" hx-swap="innerHTML"></div>"##,
            f.remaining_ms(now)
        ));
    }
    html.push_str(r#"<div class="grid grid-cols-3 gap-x-12 gap-y-12">"#);
    for row in cells.iter() {
        for cell in row.iter() {
            html.push_str(cell);
        }
    }
    html.push_str("</div>");
    html
}

/// Loading fragment. Its script fetches the round file and posts the text
/// (or the failure) back to `/api/play/load`.
pub fn render_loading(session: &Session, simulation: u8) -> String {
    let url = serde_json::Value::from(data_url(session.config(), simulation))
        .to_string()
        .replace("</", "<\\/");
    let text = match session.language() {
        Language::Es => "Cargando...",
        Language::En => "Loading...",
    };
    format!(
        r#"<div class="p-8 text-center">{text}</div>
<script>
(function() {{
  var post = function(values) {{
    values.simulation = '{simulation}';
    htmx.ajax('POST', '/api/play/load', {{target: '#app', swap: 'innerHTML', values: values}});
  }};
  fetch({url})
    .then(function(r) {{
      if (!r.ok) throw new Error(r.status + ' ' + r.statusText);
      return r.text();
    }})
    .then(function(data) {{ post({{data: data}}); }})
    .catch(function(e) {{
      console.error('[jungle-speed] simulation {simulation} fetch failed', e);
      post({{error: String(e && e.message || e)}});
    }});
}})();
</script>"#,
        text = text,
        simulation = simulation,
        url = url
    )
}

fn render_load_error(session: &Session, error: &str) -> String {
    let (title, retry) = match session.language() {
        Language::Es => ("No se pudieron cargar los datos", "Reintentar"),
        Language::En => ("The game data could not be loaded", "Retry"),
    };
    format!(
        r##"<div class="p-8 text-center"><h2 class="text-xl font-bold mb-4">{}</h2><p class="text-red-600 mb-6">{}</p><button class="px-6 py-3 rounded-lg font-semibold bg-blue-600 text-white hover:bg-blue-700" hx-post="/api/play/retry" hx-target="#app" hx-swap="innerHTML">{}</button></div>"##,
        title,
        escape_html(error),
        retry
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{reset_session, with_session};
    use chrono::Duration;

    /// Participant holds a 1; player 2 shows a 1 on odd rounds.
    fn sim_data(rounds: usize) -> String {
        let mut text = String::from("ronda;j1;j2;j3;j4;j5;j6;j7;j8\n");
        for r in 1..=rounds {
            let p2 = if r % 2 == 1 { "1.2.2" } else { "5.1.1" };
            text.push_str(&format!("{};1.1.1;{};3.3.3;;;;;\n", r, p2));
        }
        text
    }

    /// Onboard and start the game, returning the picked simulation.
    fn start_playing() -> u8 {
        with_session_mut(|s| {
            s.choose_language(Language::En).unwrap();
            s.select_gender("Other").unwrap();
            s.select_age_range("20-29").unwrap();
            s.confirm_demographics().unwrap();
            s.start_game().unwrap()
        })
    }

    fn current_generation() -> u32 {
        with_session(|s| s.active_timer().unwrap().generation)
    }

    #[test]
    fn loading_fragment_fetches_round_file() {
        reset_session();
        let sim = start_playing();
        let html = with_session(|s| render_screen(s, Utc::now()));
        assert!(html.contains(&format!("\"/jungle_speed_simulacion_{}.csv\"", sim)));
        assert!(html.contains("/api/play/load"));
        assert!(html.contains("Loading..."));
        reset_session();
    }

    #[test]
    fn load_starts_board_and_ticker() {
        reset_session();
        let sim = start_playing();
        let body = format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A"));
        let html = handle_load_post(&body);
        assert!(html.contains(r#"id="board""#));
        assert!(html.contains("load delay:750ms"));
        assert!(html.contains("/JungleSVG/1 naranja.svg"));
        assert!(html.contains("/JungleSVG/1 amarillo.svg"));
        assert!(html.contains("rotate(90deg)"));
        assert!(html.contains("Round 1"));
        assert!(html.contains("keydown[code=='Space'] from:body"));
        reset_session();
    }

    #[test]
    fn load_error_offers_retry() {
        reset_session();
        let sim = start_playing();
        let html = handle_load_post(&format!("simulation={}&error=404+Not+Found", sim));
        assert!(html.contains("404 Not Found"));
        assert!(html.contains("/api/play/retry"));
        assert!(!html.contains("hx-post=\"/api/play/tick\""));

        let html = handle_retry_post("");
        assert!(html.contains("Loading..."));
        with_session(|s| assert!(s.load_error().is_none()));
        reset_session();
    }

    #[test]
    fn empty_data_is_a_load_error() {
        reset_session();
        let sim = start_playing();
        let html = handle_load_post(&format!("simulation={}&data=ronda%3Bj1%0A", sim));
        assert!(html.contains("has no rounds"));
        assert!(html.contains("Retry"));
        reset_session();
    }

    #[test]
    fn tick_advances_round() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A")));
        let generation = current_generation();
        let html = handle_tick_post(&format!("timer={}", generation));
        assert!(html.contains("Round 2"));
        assert!(html.contains("/JungleSVG/5 naranja.svg"));
        reset_session();
    }

    #[test]
    fn stale_tick_does_not_advance() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A")));
        let generation = current_generation();
        let html = handle_tick_post(&format!("timer={}", generation.wrapping_add(9)));
        assert!(html.contains("Round 1"));
        with_session(|s| assert_eq!(s.engine().round_index(), 1));
        reset_session();
    }

    #[test]
    fn ticks_past_the_end_show_transition() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(2).replace('\n', "%0A")));
        let generation = current_generation();
        handle_tick_post(&format!("timer={}", generation));
        let html = handle_tick_post(&format!("timer={}", generation));
        assert!(html.contains("First simulation completed"));
        assert!(html.contains("/api/session/next"));
        reset_session();
    }

    #[test]
    fn successful_attempt_shows_green_feedback() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A")));
        let html = handle_attempt_post("");
        assert!(html.contains("Correct!"));
        assert!(html.contains("border-green-500"));
        assert!(html.contains("/api/play/feedback"));
        assert!(!html.contains("/api/play/tick"));
        with_session(|s| {
            assert!(s.engine().is_covered(2));
            assert_eq!(s.results().len(), 1);
        });

        // window still open: second press is ignored
        handle_attempt_post("");
        with_session(|s| assert_eq!(s.results().len(), 1));
        reset_session();
    }

    #[test]
    fn wrong_attempt_shows_red_feedback() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A")));
        handle_tick_post(&format!("timer={}", current_generation()));
        let html = handle_attempt_post("");
        assert!(html.contains("Incorrect!"));
        assert!(html.contains("border-red-500"));
        reset_session();
    }

    #[test]
    fn board_after_window_closes_has_no_feedback() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(4).replace('\n', "%0A")));
        handle_attempt_post("");
        let later = Utc::now() + Duration::milliseconds(2000);
        let html = with_session_mut(|s| {
            s.expire_feedback(later);
            render_board(s, later)
        });
        assert!(!html.contains("Correct!"));
        assert!(html.contains("Reverso"));
        reset_session();
    }

    #[test]
    fn highlighted_seat_is_gray() {
        reset_session();
        let sim = start_playing();
        handle_load_post(&format!("simulation={}&data={}", sim, sim_data(8).replace('\n', "%0A")));
        let html = with_session(|s| render_board(s, Utc::now()));
        assert!(html.contains(r#"border-gray-400" data-player="1""#));
        reset_session();
    }

    #[test]
    fn attempt_outside_play_renders_nothing() {
        reset_session();
        assert_eq!(handle_attempt_post(""), "");
        reset_session();
    }
}
