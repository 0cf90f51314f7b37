//! SQL templates
//!
//! A template is one or more statements separated by `;`. Statements may
//! contain `{{key}}` placeholders that are filled in when credentials are
//! issued. Two structured encodings are also accepted: the whole template
//! as standard base64, or a JSON array of statement strings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::BTreeMap;

/// Statement separator
pub const DELIMITER: char = ';';

/// Fills `{{key}}` placeholders in a statement.
pub trait Renderer: Send + Sync {
    /// Substitute `values` into `template`. Keys not in `values` stay as-is.
    fn render(&self, template: &str, values: &BTreeMap<&str, &str>) -> String;
}

/// Plain `{{key}}` substitution with no escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceRenderer;

impl Renderer for BraceRenderer {
    fn render(&self, template: &str, values: &BTreeMap<&str, &str>) -> String {
        let mut rendered = template.to_string();
        for (key, value) in values {
            rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
        }
        rendered
    }
}

/// Break a raw template into trimmed, non-empty statements.
///
/// Splitting is not quote aware: a `;` inside a string literal ends the
/// statement. Any input that decodes as standard base64 to non-empty UTF-8 is
/// replaced by its decoding, including a bare word that only looks encoded.
pub fn parse_statements(raw: &str) -> Vec<String> {
    let input = raw.trim();
    if input.is_empty() {
        return Vec::new();
    }

    let decoded = STANDARD
        .decode(input)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|text| !text.is_empty());
    let input = decoded.as_deref().unwrap_or(input);

    let pieces: Vec<String> = match serde_json::from_str::<Vec<String>>(input) {
        Ok(list) => list,
        Err(_) => input.split(DELIMITER).map(str::to_string).collect(),
    };

    pieces
        .into_iter()
        .map(|piece| piece.trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
