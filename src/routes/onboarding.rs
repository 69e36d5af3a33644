//! `/api/session/*` onboarding routes: language, demographics and the
//! explanation screen.

use crate::game::session::{Language, Session};
use crate::game::state::with_session_mut;
use crate::routes::screen::render_screen_now;
use crate::routes::util::{error_fragment, escape_html, get_param, hx_vals, parse_form_body};

const PANEL_OPEN: &str = r#"<div class="fixed inset-0 bg-white flex items-center justify-center z-50"><div class="bg-[#FF746C] rounded-lg p-8 max-w-md w-full mx-4 text-center text-black">"#;
const PANEL_CLOSE: &str = "</div></div>";

// ── POST /api/session/language ─────────────────────────────────────

/// Handle POST /api/session/language
/// Body: lang=es|en
pub fn handle_language_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(language) = get_param(&params, "lang").and_then(Language::from_code) else {
        return error_fragment("Missing or unknown lang parameter");
    };
    with_session_mut(|s| {
        if let Err(e) = s.choose_language(language) {
            log::warn!("{}", e);
        }
        render_screen_now(s)
    })
}

// ── POST /api/session/demographics ─────────────────────────────────

/// Handle POST /api/session/demographics
/// Body params:
///   - gender={label}     → select a gender option
///   - age={label}        → select an age range option
///   - action=continue    → proceed to the explanation (both required)
pub fn handle_demographics_post(body: &str) -> String {
    let params = parse_form_body(body);
    with_session_mut(|s| {
        let mut notice = String::new();
        let result = match get_param(&params, "action") {
            Some("continue") => s.confirm_demographics(),
            _ => {
                let mut r = Ok(());
                if let Some(gender) = get_param(&params, "gender") {
                    r = r.and_then(|_| s.select_gender(gender));
                }
                if let Some(age) = get_param(&params, "age") {
                    r = r.and_then(|_| s.select_age_range(age));
                }
                r
            }
        };
        if let Err(e) = result {
            log::warn!("{}", e);
            notice = error_fragment(&e.to_string());
        }
        let mut html = render_screen_now(s);
        html.push_str(&notice);
        html
    })
}

// ── POST /api/session/start ────────────────────────────────────────

/// Handle POST /api/session/start
/// Leaves the explanation; the response is the loading fragment for the
/// first simulation.
pub fn handle_start_post(_body: &str) -> String {
    with_session_mut(|s| {
        match s.start_game() {
            Ok(simulation) => log::info!("game started with simulation {}", simulation),
            Err(e) => log::warn!("{}", e),
        }
        render_screen_now(s)
    })
}

// ── Rendering ──────────────────────────────────────────────────────

pub fn render_language() -> String {
    let mut html = String::with_capacity(1024);
    html.push_str(PANEL_OPEN);
    html.push_str(r#"<h2 class="text-2xl font-bold mb-6">Elige tu idioma</h2>"#);
    html.push_str(r#"<div class="flex justify-center space-x-8 mb-6">"#);
    for (code, flag, alt, label) in [
        ("es", "/esp.png", "Bandera de España", "Español"),
        ("en", "/ing.svg", "Bandera del Reino Unido", "English"),
    ] {
        html.push_str(&format!(
            r##"<button class="flex flex-col items-center p-4 rounded-lg hover:bg-gray-100" hx-post="/api/session/language" hx-vals="{}" hx-target="#app" hx-swap="innerHTML"><img src="{}" alt="{}" class="w-20 h-14 mb-2 object-cover rounded shadow-md"><span class="text-sm font-medium">{}</span></button>"##,
            hx_vals("lang", code),
            flag,
            alt,
            label
        ));
    }
    html.push_str("</div>");
    html.push_str(r#"<p class="text-lg font-semibold">Choose your language</p>"#);
    html.push_str(PANEL_CLOSE);
    html
}

pub fn render_demographic(session: &Session) -> String {
    let language = session.language();
    let chosen = session.demographics();
    let (title, gender_label, age_label, continue_label) = match language {
        Language::Es => ("Información demográfica", "Género", "Rango de edad", "Continuar"),
        Language::En => ("Demographic information", "Gender", "Age range", "Continue"),
    };

    let mut html = String::with_capacity(3072);
    html.push_str(PANEL_OPEN);
    html.push_str(&format!(r#"<h2 class="text-2xl font-bold mb-6">{}</h2>"#, title));

    for (heading, key, options, selected) in [
        (gender_label, "gender", language.gender_options(), chosen.gender.as_deref()),
        (age_label, "age", language.age_options(), chosen.age_range.as_deref()),
    ] {
        html.push_str(&format!(
            r#"<div class="mb-6"><h3 class="text-lg font-semibold mb-3">{}</h3><div class="grid grid-cols-2 gap-3">"#,
            heading
        ));
        for &option in options {
            let style = if selected == Some(option) {
                "border-blue-500 bg-blue-50 text-blue-700"
            } else {
                "border-gray-300 hover:border-gray-400"
            };
            html.push_str(&format!(
                r##"<button class="p-3 rounded-lg border-2 {}" hx-post="/api/session/demographics" hx-vals="{}" hx-target="#app" hx-swap="innerHTML">{}</button>"##,
                style,
                hx_vals(key, option),
                escape_html(option)
            ));
        }
        html.push_str("</div></div>");
    }

    if chosen.is_complete() {
        html.push_str(&format!(
            r##"<button class="px-6 py-3 rounded-lg font-semibold bg-blue-600 text-white hover:bg-blue-700" hx-post="/api/session/demographics" hx-vals="{}" hx-target="#app" hx-swap="innerHTML">{}</button>"##,
            hx_vals("action", "continue"),
            continue_label
        ));
    } else {
        html.push_str(&format!(
            r#"<button class="px-6 py-3 rounded-lg font-semibold bg-gray-300 text-gray-500 cursor-not-allowed" disabled>{}</button>"#,
            continue_label
        ));
    }
    html.push_str(PANEL_CLOSE);
    html
}

pub fn render_explanation(session: &Session) -> String {
    let key = escape_html(&session.config().attempt_key);
    let attempts = session.config().attempts_per_session;
    let (title, steps, start): (&str, Vec<String>, &str) = match session.language() {
        Language::Es => (
            "¿Cómo jugar a Jungle Speed?",
            vec![
                format!("Vas a jugar {} simulaciones rápidas contra 7 oponentes virtuales.", attempts),
                "Tu carta es la de abajo en el centro.".to_string(),
                format!("Pulsa <b>{}</b> solo cuando el número de tu carta coincida con el de otro jugador. El color no importa.", key),
                "Si aciertas, sumas un punto. Si te equivocas o te adelantas, no sumas.".to_string(),
                "La velocidad aumentará en cada simulación. ¡Estate atento!".to_string(),
            ],
            "Empezar",
        ),
        Language::En => (
            "How to play Jungle Speed?",
            vec![
                format!("You will play {} quick simulations against 7 virtual opponents.", attempts),
                "Your card is the one at the bottom center.".to_string(),
                format!("Press <b>{}</b> only when your card's number matches another player's card. Color does not matter.", key),
                "If you are correct, you score a point. If you make a mistake or are too early, you do not score.".to_string(),
                "The speed will increase in each simulation. Stay alert!".to_string(),
            ],
            "Start",
        ),
    };

    let mut html = String::with_capacity(2048);
    html.push_str(PANEL_OPEN);
    html.push_str(&format!(r#"<h2 class="text-2xl font-bold mb-8">{}</h2>"#, title));
    html.push_str(r#"<ol class="text-left list-decimal list-inside mb-4">"#);
    for step in steps {
        html.push_str(&format!("<li>{}</li>", step));
    }
    html.push_str("</ol>");
    html.push_str(&format!(
        r##"<button class="w-full py-4 mt-8 text-2xl rounded-lg font-bold bg-blue-600 text-white hover:bg-blue-700" hx-post="/api/session/start" hx-target="#app" hx-swap="innerHTML">{}</button>"##,
        start
    ));
    html.push_str(PANEL_CLOSE);
    html
}

/// Shared panel wrapper for the transition and completion screens.
pub fn panel(inner: &str) -> String {
    format!("{}{}{}", PANEL_OPEN, inner, PANEL_CLOSE)
}
