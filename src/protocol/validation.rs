/// Validate a caller-supplied channel code.
///
/// Codes are opaque: any non-empty string up to `max_length` bytes is accepted.
pub fn validate_channel_code_with_limit(code: &str, max_length: usize) -> Result<(), String> {
    if code.is_empty() {
        return Err("Channel code cannot be empty".to_string());
    }
    if code.len() > max_length {
        return Err(format!(
            "Channel code too long (max {max_length} bytes, got {})",
            code.len()
        ));
    }
    Ok(())
}

/// Validate the size of a raw inbound frame.
pub fn validate_message_size(len: usize, max_size: usize) -> Result<(), String> {
    if len > max_size {
        return Err(format!(
            "Message too large ({len} bytes, max {max_size} bytes)"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DEFAULT_MAX_CHANNEL_CODE_LENGTH;
    use proptest::prelude::*;

    fn validate_channel_code(code: &str) -> Result<(), String> {
        validate_channel_code_with_limit(code, DEFAULT_MAX_CHANNEL_CODE_LENGTH)
    }

    #[test]
    fn empty_code_is_rejected() {
        assert!(validate_channel_code("").is_err());
    }

    #[test]
    fn opaque_codes_are_accepted() {
        assert!(validate_channel_code("ABC").is_ok());
        assert!(validate_channel_code("room with spaces / and ünïcode").is_ok());
        assert!(validate_channel_code(" ").is_ok());
    }

    #[test]
    fn code_length_is_bounded() {
        let long = "x".repeat(DEFAULT_MAX_CHANNEL_CODE_LENGTH + 1);
        assert!(validate_channel_code(&long).is_err());
        assert!(validate_channel_code_with_limit("abcd", 4).is_ok());
        assert!(validate_channel_code_with_limit("abcde", 4).is_err());
    }

    #[test]
    fn message_size_limit() {
        assert!(validate_message_size(10, 10).is_ok());
        assert!(validate_message_size(11, 10).is_err());
    }

    proptest! {
        #[test]
        fn code_validation_matches_predicate(raw in proptest::collection::vec(any::<char>(), 0..=40)) {
            let candidate: String = raw.into_iter().collect();
            let expected = !candidate.is_empty() && candidate.len() <= 32;
            prop_assert_eq!(validate_channel_code_with_limit(&candidate, 32).is_ok(), expected);
        }
    }
}
