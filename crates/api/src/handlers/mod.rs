pub mod comments;
pub mod forums;
pub mod health;
pub mod tokens;
pub mod users;

use forum_core::validation::{required_text, rule_error};
use validator::ValidationError;

/// Longest accepted user name, forum title and post body, in characters.
pub const MAX_NAME_CHARS: usize = 500;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 600;

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    required_text(title, MAX_TITLE_CHARS)
}

pub(crate) fn validate_content(content: &str) -> Result<(), ValidationError> {
    required_text(content, MAX_CONTENT_CHARS)
}

pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
    required_text(name, MAX_NAME_CHARS)
}

/// Presence only; the address format is checked by the `email` rule.
pub(crate) fn validate_email_present(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(rule_error("required", "must be provided"));
    }
    Ok(())
}
