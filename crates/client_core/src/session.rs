//! Identity context handed to the workflow and service client at construction.

use shared::domain::UserId;

use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    user_id: Option<UserId>,
    access_token: Option<String>,
}

impl SessionContext {
    pub fn new(user_id: Option<UserId>, access_token: Option<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: &str) -> Self {
        Self::new(UserId::new(user_id), None)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Submissions fail fast without an identity.
    pub fn require_user(&self) -> Result<&UserId, ValidationError> {
        self.user_id.as_ref().ok_or(ValidationError::MissingIdentity)
    }
}
