//! Package-safe names and versions.

/// Prefix added to names that would otherwise start with a digit.
pub const NAME_PREFIX: &str = "app-";

/// Name used when nothing usable is left after sanitizing.
pub const FALLBACK_NAME: &str = "app";

/// Turns a display name into an RPM package name.
///
/// Characters outside `[a-zA-Z0-9._+-]` become `-`, runs of `-` collapse,
/// leading and trailing `-` are trimmed and the result is lowercased. The
/// transformation is idempotent.
pub fn sanitize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-') {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("{NAME_PREFIX}{trimmed}");
    }
    trimmed.to_string()
}

/// Makes a version or release usable in an RPM header.
///
/// `-` separates version and release in RPM, so it becomes `~`. Whitespace
/// is dropped.
pub fn rpm_version(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '-' { '~' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_name("Test App"), "test-app");
        assert_eq!(sanitize_name("1App"), "app-1app");
        assert_eq!(sanitize_name("-App"), "app");
        assert_eq!(sanitize_name("App.With.Dots"), "app.with.dots");
        assert_eq!(sanitize_name("Foo  (Beta)!"), "foo-beta");
        assert_eq!(sanitize_name("!!!"), "app");
        assert_eq!(sanitize_name("Über App"), "ber-app");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in [
            "Test App", "1App", "-App", "App.With.Dots", "--9--", "a__b", "x+y c", "", " ", "42",
        ] {
            let once = sanitize_name(raw);
            assert_eq!(sanitize_name(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_rpm_version() {
        assert_eq!(rpm_version("1.2.3"), "1.2.3");
        assert_eq!(rpm_version("1.2.3-beta"), "1.2.3~beta");
        assert_eq!(rpm_version(" 2 "), "2");
    }
}
