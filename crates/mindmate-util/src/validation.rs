use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value is empty")]
    Empty,
    #[error("invalid identity reference")]
    InvalidIdentity,
}

/// Message bodies must contain something other than whitespace.
pub fn validate_message_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(())
}

/// Parse a wire identity reference: ASCII digits only, positive `i64`.
pub fn parse_identity(raw: &str) -> Result<i64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidIdentity);
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ValidationError::InvalidIdentity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_bodies_are_rejected() {
        assert_eq!(validate_message_content(""), Err(ValidationError::Empty));
        assert_eq!(validate_message_content(" \t\n"), Err(ValidationError::Empty));
        assert!(validate_message_content(" hi ").is_ok());
    }

    #[test]
    fn identity_references_must_be_positive_digits() {
        assert_eq!(parse_identity("12345"), Ok(12345));
        assert_eq!(parse_identity(""), Err(ValidationError::Empty));
        assert_eq!(parse_identity("-4"), Err(ValidationError::InvalidIdentity));
        assert_eq!(parse_identity("0"), Err(ValidationError::InvalidIdentity));
        assert_eq!(parse_identity("64f0c2aa9d"), Err(ValidationError::InvalidIdentity));
        assert_eq!(
            parse_identity("99999999999999999999"),
            Err(ValidationError::InvalidIdentity)
        );
    }
}
