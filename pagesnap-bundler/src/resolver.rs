//! Normalizes the relative-URL forms found in markup and CSS into absolute
//! URLs. Pure string-in, string-out; malformed input comes back unchanged.

use url::Url;

/// Returns true when the reference already starts with a `scheme:` prefix
/// (`https:`, `data:`, `mailto:`, ...).
fn has_scheme(reference: &str) -> bool {
    let Some((candidate, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = candidate.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve `reference` against `base_url`.
///
/// Already-absolute references, `data:` URIs, CSS `var(...)` expressions,
/// and fragment-only references are returned unchanged. Protocol-relative
/// references inherit `https:`, root-relative references take the base
/// origin, and everything else resolves against the directory of the base
/// URL. Never fails; the worst case is the input handed back as-is.
pub fn resolve(reference: &str, base_url: &str) -> String {
    if reference.is_empty()
        || reference.starts_with("var(")
        || reference.starts_with('#')
        || has_scheme(reference)
    {
        return reference.to_string();
    }

    if reference.starts_with("//") {
        return format!("https:{}", reference);
    }

    let Ok(base) = Url::parse(base_url) else {
        return reference.to_string();
    };
    if !base.has_host() {
        return reference.to_string();
    }

    if reference.starts_with('/') {
        return format!("{}{}", base.origin().ascii_serialization(), reference);
    }

    match base.join(reference) {
        Ok(joined) => joined.to_string(),
        Err(_) => reference.to_string(),
    }
}
