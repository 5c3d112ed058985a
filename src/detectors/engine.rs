use super::Context;
use crate::rules::{Category, Field};
use crate::types::Engine;
use crate::vocabulary::Vocabulary;

/// Engines recognised by name alone, most specific first.
pub(super) const LEGACY_ENGINES: &[(&str, &[&str])] = &[
    ("Presto", &["presto"]),
    ("WebKit", &["webkit"]),
    ("Trident", &["trident"]),
    ("NetFront", &["netfront"]),
    ("NetSurf", &["netsurf"]),
    ("Amaya", &["amaya"]),
    ("Lynx", &["lynx"]),
    ("w3m", &["w3m"]),
    ("Goanna", &["goanna"]),
    ("Servo", &["servo"]),
    ("Flow", &["ekiohflow"]),
    ("KHTML", &["khtml"]),
    ("Tasman", &["tasman"]),
    ("Links", &["links"]),
    ("iCab", &["icab"]),
    ("LibWeb", &["libweb"]),
];

pub(super) fn detect(ctx: &Context<'_>) -> Engine {
    let mut fields = ctx.match_rules(Category::Engine, ctx.ua);
    let mut engine = Engine {
        name: fields.take(Field::Name),
        version: fields.take(Field::Version),
    };
    if engine.name.is_empty() {
        if let Some((name, version)) = by_name(ctx.ua, &ctx.vocab.engines) {
            engine.name = name.to_string();
            engine.version = version.to_string();
        }
    }
    engine
}

fn by_name<'t>(ua: &'t str, legacy: &Vocabulary<&'static str>) -> Option<(&'static str, &'t str)> {
    // ASCII lowercasing keeps byte offsets aligned with `ua`.
    let lower = ua.to_ascii_lowercase();
    let after = |key: &str| lower.find(key).map_or("", |at| version_at(ua, at + key.len()));

    if lower.contains("windows") && lower.contains("edge/") {
        return Some(("EdgeHTML", after("edge/")));
    }
    if lower.contains("arkweb/") {
        return Some(("ArkWeb", after("arkweb/")));
    }
    if lower.contains("webkit/537.36") && lower.contains("chrome/") && !lower.contains("chrome/27") {
        return Some(("Blink", after("chrome/")));
    }
    if let Some(hit) = legacy.find(ua) {
        let start = match ua.as_bytes().get(hit.end) {
            Some(b'/' | b' ') => hit.end + 1,
            _ => hit.end,
        };
        return Some((hit.label, version_at(ua, start)));
    }
    if lower.contains("rv:") && lower.contains("gecko") {
        return Some(("Gecko", after("rv:")));
    }
    None
}

/// The run of `[A-Za-z0-9._-]` starting at byte `start`.
fn version_at(ua: &str, start: usize) -> &str {
    let rest = ua.get(start..).unwrap_or("");
    let end = rest
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')))
        .unwrap_or(rest.len());
    &rest[..end]
}
