//! Inbound payload normalization.
//!
//! Everything a client sends passes through here before the store sees it.
//! Roles collapse to `user` or `assistant`, blank content and titles are
//! rejected, emails are trimmed and lowercased.

use thiserror::Error;

use crate::models::MessageRole;

pub const MIN_THREAD_ID_LEN: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub fn parse_role(raw: &str) -> Result<MessageRole, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(MessageRole::User),
        "assistant" | "system" | "tool" => Ok(MessageRole::Assistant),
        other => Err(ValidationError::new(
            "role",
            format!("expected one of user, assistant, system, tool; got '{other}'"),
        )),
    }
}

pub fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub fn validate_thread_id(thread_id: &str) -> Result<(), ValidationError> {
    if thread_id.trim().chars().count() < MIN_THREAD_ID_LEN {
        return Err(ValidationError::new(
            "thread_id",
            format!("must be at least {MIN_THREAD_ID_LEN} characters"),
        ));
    }
    Ok(())
}

/// Trim and lowercase an email, rejecting anything without a
/// `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let plausible = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !plausible {
        return Err(ValidationError::new("emails", format!("invalid email '{}'", raw.trim())));
    }
    Ok(email)
}

/// Normalize a batch of emails, dropping duplicates but keeping first-seen order.
pub fn normalize_emails(raw: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut emails: Vec<String> = Vec::with_capacity(raw.len());
    for candidate in raw {
        let email = normalize_email(candidate)?;
        if !emails.contains(&email) {
            emails.push(email);
        }
    }
    Ok(emails)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_is_case_insensitive() {
        assert_eq!(parse_role("User").unwrap(), MessageRole::User);
        assert_eq!(parse_role(" assistant ").unwrap(), MessageRole::Assistant);
        assert_eq!(parse_role("SYSTEM").unwrap(), MessageRole::Assistant);
        assert_eq!(parse_role("tool").unwrap(), MessageRole::Assistant);
        assert!(parse_role("narrator").is_err());
    }

    #[test]
    fn test_require_text_rejects_whitespace() {
        assert!(require_text("content", "   ").is_err());
        assert!(require_text("content", "hi").is_ok());
    }

    #[test]
    fn test_thread_id_minimum_length() {
        assert!(validate_thread_id("short").is_err());
        assert!(validate_thread_id("0123456789").is_ok());
    }

    #[test]
    fn test_normalize_emails_dedupes_case_insensitively() {
        let raw = vec![
            " Bob@Example.com ".to_string(),
            "bob@example.com".to_string(),
            "carol@example.org".to_string(),
        ];
        let emails = normalize_emails(&raw).unwrap();
        assert_eq!(emails, vec!["bob@example.com", "carol@example.org"]);
    }

    #[test]
    fn test_normalize_email_rejects_garbage() {
        for bad in ["", "nobody", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }
}
