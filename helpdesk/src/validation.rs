//! Form validation.
//!
//! Every check collects field-level messages into [`ValidationErrors`]
//! instead of stopping at the first failure, so a form can show all of them
//! at once. The same rules run in the board before a request is sent and in
//! the desk before a command is applied.

use crate::identity::Password;
use crate::lifecycle::TicketPatch;
use crate::types::TicketDraft;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest accepted ticket title
pub const TITLE_MAX: usize = 200;
/// Longest accepted ticket description
pub const DESCRIPTION_MAX: usize = 2000;
/// Longest accepted comment
pub const COMMENT_MAX: usize = 1000;
/// Shortest accepted password
pub const PASSWORD_MIN: usize = 8;
/// Accepted username lengths
pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

/// Field name → message, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// No errors yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for `field`. The first message per field is kept.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message for `field`, if any
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// The underlying map
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors when at least one field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Registration form
#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    /// Desired login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Chosen password
    pub password: Password,
}

/// Login form
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Password
    pub password: Password,
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        errors.add("title", "Title is required");
    } else if char_len(trimmed) > TITLE_MAX {
        errors.add("title", format!("Title must be at most {TITLE_MAX} characters"));
    }
}

fn check_description(errors: &mut ValidationErrors, description: &str) {
    if char_len(description) > DESCRIPTION_MAX {
        errors.add(
            "description",
            format!("Description must be at most {DESCRIPTION_MAX} characters"),
        );
    }
}

/// Validate a new ticket.
///
/// # Errors
///
/// Title must be 1..=200 characters after trimming, description at most 2000.
pub fn validate_draft(draft: &TicketDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_title(&mut errors, &draft.title);
    check_description(&mut errors, &draft.description);
    errors.into_result()
}

/// Validate the supplied fields of a ticket update.
///
/// # Errors
///
/// Same text rules as [`validate_draft`], for the fields that are present.
pub fn validate_patch(patch: &TicketPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(title) = &patch.title {
        check_title(&mut errors, title);
    }
    if let Some(description) = &patch.description {
        check_description(&mut errors, description);
    }
    errors.into_result()
}

/// Validate a comment body.
///
/// # Errors
///
/// Content must be 1..=1000 characters and not blank.
pub fn validate_comment(content: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if content.trim().is_empty() {
        errors.add("content", "Comment cannot be empty");
    } else if char_len(content) > COMMENT_MAX {
        errors.add(
            "content",
            format!("Comment must be at most {COMMENT_MAX} characters"),
        );
    }
    errors.into_result()
}

/// Validate a registration form.
///
/// `confirmation` is the repeated password from a client form; the HTTP
/// endpoint has no such field and passes `None`.
///
/// # Errors
///
/// Username 3..=50 characters, email containing `@`, password at least 8
/// characters, confirmation equal to the password.
pub fn validate_registration(
    registration: &Registration,
    confirmation: Option<&str>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let username = registration.username.trim();
    if username.is_empty() {
        errors.add("username", "Username is required");
    } else if !USERNAME_LEN.contains(&char_len(username)) {
        errors.add(
            "username",
            format!(
                "Username must be between {} and {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ),
        );
    }

    let email = registration.email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !email.contains('@') {
        errors.add("email", "Email must be valid");
    }

    let password = registration.password.expose();
    if char_len(password) < PASSWORD_MIN {
        errors.add(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        );
    }
    if let Some(confirmation) = confirmation {
        if confirmation != password {
            errors.add("confirmPassword", "Passwords do not match");
        }
    }

    errors.into_result()
}

/// Validate a login form.
///
/// # Errors
///
/// Both fields are required.
pub fn validate_login(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if credentials.username.trim().is_empty() {
        errors.add("username", "Username is required");
    }
    if credentials.password.expose().is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TicketPriority;

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: Password::new(password),
        }
    }

    #[test]
    fn draft_title_bounds() {
        let ok = TicketDraft::new("x".repeat(TITLE_MAX), "", TicketPriority::Low);
        assert!(validate_draft(&ok).is_ok());

        let blank = TicketDraft::new("   ", "", TicketPriority::Low);
        let errors = validate_draft(&blank).unwrap_err();
        assert_eq!(errors.get("title"), Some("Title is required"));

        let long = TicketDraft::new("x".repeat(TITLE_MAX + 1), "", TicketPriority::Low);
        assert!(validate_draft(&long).unwrap_err().get("title").is_some());
    }

    #[test]
    fn draft_collects_every_field() {
        let draft = TicketDraft::new("", "d".repeat(DESCRIPTION_MAX + 1), TicketPriority::Low);
        let errors = validate_draft(&draft).unwrap_err();
        assert_eq!(errors.fields().len(), 2);
        assert_eq!(
            errors.to_string(),
            "description: Description must be at most 2000 characters; title: Title is required"
        );
    }

    #[test]
    fn patch_only_checks_present_fields() {
        assert!(validate_patch(&TicketPatch::default()).is_ok());

        let patch = TicketPatch {
            title: Some(String::new()),
            ..TicketPatch::default()
        };
        assert!(validate_patch(&patch).unwrap_err().get("title").is_some());
    }

    #[test]
    fn comment_bounds() {
        assert!(validate_comment("Rebooted, works now").is_ok());
        assert!(validate_comment(" \n ").is_err());
        assert!(validate_comment(&"c".repeat(COMMENT_MAX)).is_ok());
        assert!(validate_comment(&"c".repeat(COMMENT_MAX + 1)).is_err());
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&registration("alice", "a@x.io", "longenough"), None).is_ok());

        let errors =
            validate_registration(&registration("al", "nope", "short"), Some("other")).unwrap_err();
        assert!(errors.get("username").is_some());
        assert_eq!(errors.get("email"), Some("Email must be valid"));
        assert!(errors.get("password").is_some());
        assert_eq!(errors.get("confirmPassword"), Some("Passwords do not match"));
    }

    #[test]
    fn login_requires_both_fields() {
        let credentials = Credentials {
            username: String::new(),
            password: Password::new(""),
        };
        let errors = validate_login(&credentials).unwrap_err();
        assert_eq!(errors.fields().len(), 2);
    }

    #[test]
    fn serializes_as_plain_map() {
        let errors = ValidationErrors::single("title", "Title is required");
        assert_eq!(
            serde_json::to_value(&errors).unwrap_or_default(),
            serde_json::json!({ "title": "Title is required" })
        );
    }
}
