/// Reduces a phone-looking value to `380XXXXXXXXX`. Returns `None` when the digits do not
/// form a Ukrainian mobile number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if let Some(rest) = digits.strip_prefix("00") {
        digits = rest.to_string();
    }
    if digits.starts_with('0') && digits.len() == 10 {
        digits = format!("38{}", digits);
    }

    (digits.len() == 12 && digits.starts_with("380")).then_some(digits)
}

/// Values the denylist is checked against: the trimmed query and, when it is a phone
/// number, its normalized form.
pub fn lookup_candidates(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = Vec::with_capacity(2);
    if !trimmed.is_empty() {
        candidates.push(trimmed.to_string());
    }
    if let Some(phone) = normalize_phone(trimmed) {
        if !candidates.contains(&phone) {
            candidates.push(phone);
        }
    }
    candidates
}

/// Splits an operator-supplied comma separated list, dropping blanks.
pub fn split_raw_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_phone_spellings() {
        assert_eq!(normalize_phone("+380 63 665 92 55").as_deref(), Some("380636659255"));
        assert_eq!(normalize_phone("0636659255").as_deref(), Some("380636659255"));
        assert_eq!(normalize_phone("00380636659255").as_deref(), Some("380636659255"));
        assert_eq!(normalize_phone("(063) 665-92-55").as_deref(), Some("380636659255"));
    }

    #[test]
    fn rejects_non_phone_values() {
        assert_eq!(normalize_phone("Ivanov Ivan"), None);
        assert_eq!(normalize_phone("10.07.1999"), None);
        assert_eq!(normalize_phone("+1 202 555 0100"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn candidates_include_normalized_phone() {
        assert_eq!(
            lookup_candidates("  0683220001 "),
            vec!["0683220001".to_string(), "380683220001".to_string()]
        );
        assert_eq!(lookup_candidates("380683220001"), vec!["380683220001".to_string()]);
        assert_eq!(lookup_candidates("test@example.com"), vec!["test@example.com".to_string()]);
        assert!(lookup_candidates("   ").is_empty());
    }

    #[test]
    fn raw_lists_are_split_and_trimmed() {
        assert_eq!(
            split_raw_values("Ivanov Ivan, 380661112233, ,10.07.1999"),
            vec!["Ivanov Ivan", "380661112233", "10.07.1999"]
        );
    }
}
