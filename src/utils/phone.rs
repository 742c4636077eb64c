use once_cell::sync::Lazy;
use regex::Regex;

/// Indonesian mobile numbers: `08…`, `628…` or `+628…`.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+?62|0)[0-9]{9,12}$").expect("phone pattern compiles"));

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// Rewrites a valid number into the `62…` form the gateway expects.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    if !is_valid_phone(phone) {
        return None;
    }

    let digits = phone.trim_start_matches('+');
    match digits.strip_prefix('0') {
        Some(rest) => Some(format!("62{rest}")),
        None => Some(digits.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_local_and_international_forms() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("6281234567890"));
        assert!(is_valid_phone("+6281234567890"));
    }

    #[test]
    fn rejects_foreign_short_and_lettered_numbers() {
        assert!(!is_valid_phone("+4412345678901"));
        assert!(!is_valid_phone("0812345"));
        assert!(!is_valid_phone("08123456789a"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn normalizes_to_country_code() {
        assert_eq!(normalize_phone("081234567890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("+6281234567890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone(" 6281234567890 ").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("12345"), None);
    }
}
