use crate::workplan::tracker::error::{Result, TrackerError};

/// Identity of the person making edits. Passed explicitly into every
/// operation that writes audit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: String,
}

impl Session {
    /// Accepts a trimmed, non-empty email-like identity.
    pub fn new(user: impl Into<String>) -> Result<Self> {
        let user = user.into();
        let trimmed = user.trim();
        if trimmed.is_empty() || !trimmed.contains('@') {
            return Err(TrackerError::InvalidUser(user));
        }
        Ok(Self {
            user: trimmed.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_must_look_like_an_email() {
        assert_eq!(
            Session::new(" si.manager@example.org ").unwrap().user(),
            "si.manager@example.org"
        );
        assert!(Session::new("si-manager").is_err());
        assert!(Session::new("   ").is_err());
    }
}
