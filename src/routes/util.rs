//! Shared URL/form parsing and HTML helpers for route handlers.

/// Parse URL-encoded form body into key-value pairs.
/// Handles `key=value&key2=value2` format (from HTMX POST bodies).
pub fn parse_form_body(body: &str) -> Vec<(String, String)> {
    if body.is_empty() {
        return Vec::new();
    }
    body.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((percent_decode(key), percent_decode(val)))
        })
        .collect()
}

/// Percent-decode a URL-encoded value. Escapes are collected as bytes so
/// multi-byte UTF-8 sequences (`a%C3%B1os`) decode to one character.
pub fn percent_decode(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    let mut iter = input.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hi = iter.next();
                let lo = iter.next();
                let decoded = match (hi, lo) {
                    (Some(h), Some(l)) => hex_value(h).zip(hex_value(l)).map(|(h, l)| h << 4 | l),
                    _ => None,
                };
                match decoded {
                    Some(val) => bytes.push(val),
                    None => {
                        bytes.push(b'%');
                        bytes.extend(hi);
                        bytes.extend(lo);
                    }
                }
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Helper to get a value by key from a list of key-value pairs.
pub fn get_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Escape text for element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `hx-vals` attribute value for a single key, safe inside single quotes.
pub fn hx_vals(key: &str, value: &str) -> String {
    let json = serde_json::json!({ key: value }).to_string();
    escape_html(&json)
}

/// Error fragment in the same shape every route uses.
pub fn error_fragment(message: &str) -> String {
    format!(
        r#"<span class="text-red-600">{}</span>"#,
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_form_body_works() {
        let pairs = parse_form_body("lang=es&gender=Otro&action=continue");
        assert_eq!(pairs.len(), 3);
        assert_eq!(get_param(&pairs, "lang"), Some("es"));
        assert_eq!(get_param(&pairs, "action"), Some("continue"));
    }

    #[test]
    fn parse_form_body_empty() {
        let pairs = parse_form_body("");
        assert!(pairs.is_empty());
    }

    #[test]
    fn percent_decode_plus_as_space() {
        assert_eq!(percent_decode("Prefer+not+to+say"), "Prefer not to say");
    }

    #[test]
    fn percent_decode_hex() {
        assert_eq!(percent_decode("1%3B2.1.1%0A"), "1;2.1.1\n");
    }

    #[test]
    fn percent_decode_utf8() {
        assert_eq!(percent_decode("60%2B+a%C3%B1os"), "60+ años");
    }

    #[test]
    fn percent_decode_keeps_bad_escapes() {
        assert_eq!(percent_decode("100%zz"), "100%zz");
        assert_eq!(percent_decode("50%"), "50%");
    }

    #[test]
    fn escape_html_handles_quotes() {
        assert_eq!(escape_html(r#"<a href='x'>"#), "&lt;a href=&#39;x&#39;&gt;");
    }

    #[test]
    fn hx_vals_is_quoted_json() {
        assert_eq!(hx_vals("lang", "es"), "{&quot;lang&quot;:&quot;es&quot;}");
    }
}
