//! Short link slugs for recipes

use std::collections::HashSet;

/// Used when a name has no alphanumeric characters at all
pub const FALLBACK_SLUG: &str = "recipe";

/// Characters kept from the name before any disambiguating suffix
pub const MAX_SLUG_CHARS: usize = 50;

/// Lowercase, keep Unicode alphanumerics, collapse separators into `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    let slug: String = slug.chars().take(MAX_SLUG_CHARS).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// First of `base`, `base-2`, `base-3`, ... not in `taken`
pub fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
