//! Commit identity configuration for GitKit.
//!
//! Author identity is sandboxed: it is set by the embedder (or via
//! `git config user.name` inside the VFS) and never read from the host's
//! `~/.gitconfig` or environment.

/// Default author name for commits in sandboxed environments.
pub const DEFAULT_AUTHOR_NAME: &str = "sandbox";

/// Default author email for commits in sandboxed environments.
pub const DEFAULT_AUTHOR_EMAIL: &str = "sandbox@gitkit.local";

/// Commit author/committer identity.
///
/// # Example
///
/// ```rust
/// use gitkit::Identity;
///
/// let id = Identity::new().author("Deploy Bot", "deploy@example.com");
/// assert_eq!(id.name(), "Deploy Bot");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub(crate) name: String,
    pub(crate) email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: DEFAULT_AUTHOR_NAME.to_string(),
            email: DEFAULT_AUTHOR_EMAIL.to_string(),
        }
    }
}

impl Identity {
    /// Create an identity with the default sandbox author.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the author name and email.
    pub fn author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.name = name.into();
        self.email = email.into();
        self
    }

    /// Get the author name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the author email.
    pub fn email(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity() {
        let id = Identity::new();
        assert_eq!(id.name(), DEFAULT_AUTHOR_NAME);
        assert_eq!(id.email(), DEFAULT_AUTHOR_EMAIL);
    }

    #[test]
    fn test_custom_author() {
        let id = Identity::new().author("Test User", "test@example.com");
        assert_eq!(id.name(), "Test User");
        assert_eq!(id.email(), "test@example.com");
    }
}
