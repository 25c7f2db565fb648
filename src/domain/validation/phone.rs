//! Algerian mobile number normalization

/// Country dialing prefix in canonical form
pub const DIAL_PREFIX: &str = "+213";

/// Why a phone number was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneError {
    /// Letters or other characters that never appear in a phone number
    InvalidCharacters,
    /// Digit count does not match any accepted layout
    InvalidLength,
    /// Subscriber number does not start with 5, 6 or 7
    NotMobile,
}

/// Normalizes to `+213XXXXXXXXX`
///
/// Accepted layouts after stripping separators: `00213` + 9 digits,
/// `213` + 9 digits, `0` + 9 digits, or the bare 9-digit subscriber number.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    if raw
        .chars()
        .any(|c| !(c.is_ascii_digit() || c.is_whitespace() || "+-.()/".contains(c)))
    {
        return Err(PhoneError::InvalidCharacters);
    }

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.strip_prefix("00").unwrap_or(&digits);

    let subscriber = if digits.len() == 12 && digits.starts_with("213") {
        &digits[3..]
    } else if digits.len() == 10 && digits.starts_with('0') {
        &digits[1..]
    } else if digits.len() == 9 {
        digits
    } else {
        return Err(PhoneError::InvalidLength);
    };

    if !subscriber.starts_with(|c: char| matches!(c, '5' | '6' | '7')) {
        return Err(PhoneError::NotMobile);
    }

    Ok(format!("{}{}", DIAL_PREFIX, subscriber))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_format() {
        assert_eq!(normalize_phone("0550123456").unwrap(), "+213550123456");
        assert_eq!(normalize_phone("0770 12 34 56").unwrap(), "+213770123456");
    }

    #[test]
    fn test_international_formats() {
        assert_eq!(normalize_phone("+213 661-234-567").unwrap(), "+213661234567");
        assert_eq!(normalize_phone("00213661234567").unwrap(), "+213661234567");
        assert_eq!(normalize_phone("213550123456").unwrap(), "+213550123456");
    }

    #[test]
    fn test_bare_subscriber_number() {
        assert_eq!(normalize_phone("550123456").unwrap(), "+213550123456");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(normalize_phone("call me"), Err(PhoneError::InvalidCharacters));
        assert_eq!(normalize_phone("05501234"), Err(PhoneError::InvalidLength));
        assert_eq!(normalize_phone("021123456"), Err(PhoneError::NotMobile));
        assert_eq!(normalize_phone(""), Err(PhoneError::InvalidLength));
    }
}
