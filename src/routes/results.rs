//! `/api/results/*` routes plus the screens between and after attempts.

use crate::game::results::{EXPORT_FILE_NAME, ResultLog, Tally};
use crate::game::session::{Language, Session};
use crate::game::state::{with_session, with_session_mut};
use crate::routes::onboarding::panel;
use crate::routes::screen::render_screen_now;
use crate::routes::util::{error_fragment, get_param, parse_form_body};

// ── GET /api/results/export ────────────────────────────────────────

/// Handle GET /api/results/export
/// Returns a <script> tag that downloads the result log as CSV.
pub fn handle_export_get(_query: &str) -> String {
    with_session(|s| match s.export_csv() {
        Ok(csv) => download_script(&csv),
        Err(e) => {
            log::error!("export failed: {}", e);
            error_fragment(&format!("Export failed: {}", e))
        }
    })
}

fn download_script(csv: &str) -> String {
    // JSON string literal is valid JS; `</` is split so it cannot close the tag.
    let literal = serde_json::Value::from(csv).to_string().replace("</", "<\\/");
    format!(
        r#"<script>
(function() {{
  var b = new Blob([{literal}], {{type: 'text/csv'}});
  var a = document.createElement('a');
  a.href = URL.createObjectURL(b);
  a.download = '{file}';
  a.click();
  URL.revokeObjectURL(a.href);
  console.log('[jungle-speed] Results exported');
}})();
</script>"#,
        literal = literal,
        file = EXPORT_FILE_NAME
    )
}

// ── GET /api/results/state ─────────────────────────────────────────

/// Handle GET /api/results/state
/// Returns the result log as a JSON array.
pub fn handle_state_get(_query: &str) -> String {
    with_session(|s| match s.results().to_json() {
        Ok(json) => json,
        Err(e) => {
            log::error!("result log not serialized: {}", e);
            "[]".to_string()
        }
    })
}

// ── POST /api/results/import ───────────────────────────────────────

/// Handle POST /api/results/import
/// Accepts a JSON array, raw or as `state=` form field, and replaces the
/// stored result log with it.
pub fn handle_import_post(body: &str) -> String {
    let params = parse_form_body(body);
    let json = match get_param(&params, "state") {
        Some(state) => state.to_string(),
        None => body.trim().to_string(),
    };
    let imported = match ResultLog::from_json(&json) {
        Ok(imported) => imported,
        Err(e) => return error_fragment(&format!("Import failed: {}", e)),
    };
    let count = imported.len();
    with_session_mut(|s| match s.replace_results(imported) {
        Ok(()) => {
            log::info!("imported {} results", count);
            format!(
                r#"<span class="text-emerald-600">{} results imported successfully</span>"#,
                count
            )
        }
        Err(e) => error_fragment(&format!("Import failed: {}", e)),
    })
}

// ── POST /api/session/next ─────────────────────────────────────────

/// Handle POST /api/session/next
/// Leaves the transition screen and starts loading the next simulation.
pub fn handle_next_post(_body: &str) -> String {
    with_session_mut(|s| {
        if let Err(e) = s.next_attempt() {
            log::warn!("{}", e);
        }
        render_screen_now(s)
    })
}

// ── Rendering ──────────────────────────────────────────────────────

fn ordinal(language: Language, attempt: usize) -> String {
    const ES: [&str; 5] = ["primera", "segunda", "tercera", "cuarta", "quinta"];
    const EN: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];
    let words: &[&str; 5] = match language {
        Language::Es => &ES,
        Language::En => &EN,
    };
    match words.get(attempt) {
        Some(word) => word.to_string(),
        None => format!("#{}", attempt + 1),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Between attempts: the tally of the attempt that just finished.
pub fn render_transition(session: &Session, completed_attempt: usize, tally: Tally) -> String {
    let language = session.language();
    let done = capitalize(&ordinal(language, completed_attempt));
    let next = ordinal(language, completed_attempt + 1);
    let (title, message, button) = match language {
        Language::Es => (
            format!("{} simulación completada", done),
            format!(
                "¡Bien hecho! Has acertado {} veces y te has equivocado {} veces.<br>Ahora vamos con la {} simulación.",
                tally.correct, tally.wrong, next
            ),
            "Continuar",
        ),
        Language::En => (
            format!("{} simulation completed", done),
            format!(
                "Well done! You got {} correct and made {} mistakes.<br>Now let's go with the {} simulation.",
                tally.correct, tally.wrong, next
            ),
            "Continue",
        ),
    };
    panel(&format!(
        r##"<h2 class="text-2xl font-bold mb-4">{}</h2><p class="text-lg mb-6">{}</p><button class="w-full py-4 text-xl rounded-lg font-bold bg-blue-600 text-white hover:bg-blue-700" hx-post="/api/session/next" hx-target="#app" hx-swap="innerHTML">{}</button>"##,
        title, message, button
    ))
}

/// After the last attempt.
pub fn render_completed(session: &Session) -> String {
    let (thanks, download) = match session.language() {
        Language::Es => ("¡Gracias por jugar!", "Descargar resultados CSV"),
        Language::En => ("Thank you for playing!", "Download results CSV"),
    };
    format!(
        r##"<div class="fixed inset-0 flex items-center justify-center z-50"><div class="bg-white bg-opacity-80 absolute inset-0"></div><button class="absolute top-4 right-4 px-4 py-2 bg-blue-600 text-white rounded shadow hover:bg-blue-700 z-30" hx-get="/api/results/export" hx-target="#download" hx-swap="innerHTML">{}</button><div class="relative bg-[#FF746C] text-black p-8 rounded-lg z-10 flex flex-col items-center"><h2 class="text-2xl font-bold mb-4">{}</h2></div><div id="download" class="hidden"></div></div>"##,
        download, thanks
    )
}
