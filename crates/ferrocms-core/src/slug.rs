//! Slug and path normalization (§4.1).

use crate::error::{Error, Result};

/// Normalize a slug candidate: trim, lowercase, collapse whitespace runs to
/// `-`, strip anything outside `[a-z0-9-]`.
///
/// Rejects an empty input with [`Error::SlugRequired`] and an input that
/// decomposes to nothing usable with [`Error::SlugInvalid`].
pub fn normalize_slug(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::SlugRequired);
    }

    let lowered = trimmed.to_lowercase();
    let mut collapsed = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                collapsed.push('-');
            }
            last_was_space = true;
        } else {
            collapsed.push(ch);
            last_was_space = false;
        }
    }

    let slug: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();

    if slug.is_empty() {
        return Err(Error::SlugInvalid {
            input: input.to_string(),
        });
    }

    Ok(slug)
}

/// Normalize a routing path: trim, ensure a single leading `/`.
pub fn normalize_path(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::PathInvalid {
            path: input.to_string(),
        });
    }

    let without_leading_slashes = trimmed.trim_start_matches('/');
    if without_leading_slashes.is_empty() {
        // the whole path was slashes - treat as root
        return Ok("/".to_string());
    }

    Ok(format!("/{}", without_leading_slashes))
}

/// Derive a disambiguated slug by appending `-1`, `-2`, … until `exists`
/// reports the candidate is free, bailing out after `max_attempts` with
/// [`Error::PageDuplicateSlug`].
pub fn disambiguate_slug(
    base: &str,
    max_attempts: u32,
    mut exists: impl FnMut(&str) -> bool,
) -> Result<String> {
    if !exists(base) {
        return Ok(base.to_string());
    }

    for n in 1..=max_attempts {
        let candidate = format!("{base}-{n}");
        if !exists(&candidate) {
            return Ok(candidate);
        }
    }

    Err(Error::PageDuplicateSlug {
        source_slug: base.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_casing_and_whitespace() {
        assert_eq!(normalize_slug("  Hello   World  ").unwrap(), "hello-world");
    }

    #[test]
    fn strips_invalid_characters() {
        assert_eq!(normalize_slug("Caf\u{e9} #1!").unwrap(), "caf-1");
    }

    #[test]
    fn empty_input_is_required_error() {
        assert!(matches!(normalize_slug("   "), Err(Error::SlugRequired)));
    }

    #[test]
    fn punctuation_only_input_is_invalid() {
        assert!(matches!(
            normalize_slug("###"),
            Err(Error::SlugInvalid { .. })
        ));
    }

    #[test]
    fn path_gets_single_leading_slash() {
        assert_eq!(normalize_path("about").unwrap(), "/about");
        assert_eq!(normalize_path("//about").unwrap(), "/about");
        assert_eq!(normalize_path("/about/").unwrap(), "/about/");
    }

    #[test]
    fn disambiguation_appends_incrementing_suffix() {
        let taken = ["about", "about-1"];
        let slug = disambiguate_slug("about", 5, |s| taken.contains(&s)).unwrap();
        assert_eq!(slug, "about-2");
    }

    #[test]
    fn disambiguation_gives_up_after_max_attempts() {
        let result = disambiguate_slug("about", 2, |_| true);
        assert!(matches!(result, Err(Error::PageDuplicateSlug { .. })));
    }
}
