/// Get environment variable with POSSESSION_ prefix, falling back to unprefixed version
///
/// Checks `POSSESSION_{key}` first, then `{key}`.
///
/// # Examples
///
/// ```rust,ignore
/// // Checks POSSESSION_ADMIN_REALM first, then ADMIN_REALM
/// let realm = get_env_with_prefix("ADMIN_REALM");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("POSSESSION_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a boolean environment value, accepting `1`/`0` as well as `true`/`false`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("POSSESSION_UTIL_TEST_VAR", "prefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("UTIL_TEST_VAR"),
            Some("prefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("POSSESSION_UTIL_TEST_VAR");
        }

        unsafe {
            std::env::set_var("UTIL_FALLBACK_VAR", "unprefixed_value");
        }
        assert_eq!(
            get_env_with_prefix("UTIL_FALLBACK_VAR"),
            Some("unprefixed_value".to_string())
        );
        unsafe {
            std::env::remove_var("UTIL_FALLBACK_VAR");
        }

        assert_eq!(get_env_with_prefix("UTIL_NON_EXISTENT_VAR"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" 1 "), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
