use storefront_core::DomainError;

pub const MAX_SLUG_LEN: usize = 120;

/// Lowercase ASCII alphanumerics; every other run of characters becomes a single `-`.
pub fn slugify(input: &str) -> Result<String, DomainError> {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out.truncate(MAX_SLUG_LEN);
    let out = out.trim_end_matches('-').to_string();
    if out.is_empty() {
        return Err(DomainError::validation(format!(
            "cannot derive a slug from '{input}'"
        )));
    }
    Ok(out)
}

/// Accept an explicit slug only if it is already in canonical form.
pub fn validate_slug(slug: &str) -> Result<String, DomainError> {
    let canonical = slugify(slug)?;
    if canonical != slug {
        return Err(DomainError::validation(format!(
            "slug '{slug}' must be lowercase letters, digits and single dashes (try '{canonical}')"
        )));
    }
    Ok(canonical)
}

/// Explicit slug if given, else derived from `name`.
pub(crate) fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, DomainError> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => validate_slug(slug),
        None => slugify(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("Running Shoes").unwrap(), "running-shoes");
        assert_eq!(slugify("  --Men's   T-Shirts!! ").unwrap(), "men-s-t-shirts");
        assert_eq!(slugify("4K TV (55\")").unwrap(), "4k-tv-55");
        assert!(slugify("!!!").is_err());
    }

    #[test]
    fn explicit_slug_must_be_canonical() {
        assert_eq!(validate_slug("summer-sale").unwrap(), "summer-sale");
        assert!(validate_slug("Summer Sale").is_err());
        assert!(validate_slug("double--dash").is_err());
    }

    #[test]
    fn resolve_prefers_explicit() {
        assert_eq!(resolve_slug(Some("custom"), "Ignored Name").unwrap(), "custom");
        assert_eq!(resolve_slug(Some("  "), "From Name").unwrap(), "from-name");
        assert_eq!(resolve_slug(None, "From Name").unwrap(), "from-name");
    }

    proptest! {
        #[test]
        fn slugify_output_is_canonical(s in ".{0,64}") {
            if let Ok(slug) = slugify(&s) {
                prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
                prop_assert_eq!(slugify(&slug).unwrap(), slug);
            }
        }
    }
}
