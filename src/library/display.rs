/// Build the display name for a file stem.
///
/// A variant stem loses its `variant_suffix` and gains a marker made from the
/// suffix itself, lowercased and without leading separators, so `Song_Dreamy`
/// with suffix `_Dreamy` renders as `Song (dreamy)`.
pub fn display_name(stem: &str, variant_suffix: Option<&str>) -> String {
    match variant_suffix {
        Some(suffix) if !suffix.is_empty() && stem.ends_with(suffix) => {
            let base = stem[..stem.len() - suffix.len()].trim_end();
            let marker = variant_marker(suffix);
            if marker.is_empty() {
                base.to_string()
            } else {
                format!("{base} ({marker})")
            }
        }
        _ => stem.to_string(),
    }
}

fn variant_marker(suffix: &str) -> String {
    suffix
        .trim_start_matches(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .trim_end()
        .to_lowercase()
}
