use std::fmt;

use crate::model::LearnerId;

/// Who is submitting a result, and with which credentials.
///
/// Handed explicitly to result sinks; nothing in this workspace reads
/// credentials from ambient storage.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    learner_id: LearnerId,
    bearer_token: Option<String>,
}

impl AuthContext {
    /// Context for a learner without remote credentials (local persistence only).
    #[must_use]
    pub fn local(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    #[must_use]
    pub fn learner_id(&self) -> &LearnerId {
        &self.learner_id
    }

    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("learner_id", &self.learner_id)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let auth = AuthContext::local(LearnerId::parse("amina").unwrap())
            .with_bearer_token("secret-token");
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
        assert_eq!(auth.bearer_token(), Some("secret-token"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let auth = AuthContext::local(LearnerId::parse("amina").unwrap()).with_bearer_token("  ");
        assert_eq!(auth.bearer_token(), None);
    }
}
