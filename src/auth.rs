//! Identity of the caller invoking a coordination operation.
//!
//! Authentication itself is owned by the surrounding product; this layer
//! only needs to know who the UI believes is signed in, and to refuse
//! mutations claimed on behalf of somebody else.

use crate::error::{CoordError, CoordResult};
use crate::model::UserId;

/// The authenticated caller, as established by the external auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    uid: Option<UserId>,
}

impl AuthContext {
    /// Context for a signed-in user.
    pub fn signed_in(uid: impl Into<UserId>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    /// Context with no authenticated user.
    pub fn anonymous() -> Self {
        Self { uid: None }
    }

    /// The signed-in uid, or [`CoordError::AuthRequired`].
    pub fn require_uid(&self) -> CoordResult<&str> {
        self.uid.as_deref().ok_or(CoordError::AuthRequired)
    }

    /// The signed-in uid, which must match `claimed` — operations may not
    /// be performed on behalf of another user.
    pub fn require_same(&self, claimed: &str) -> CoordResult<&str> {
        let uid = self.require_uid()?;
        if uid != claimed {
            return Err(CoordError::AuthRequired);
        }
        Ok(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_callers_are_rejected() {
        let auth = AuthContext::anonymous();
        assert!(matches!(auth.require_uid(), Err(CoordError::AuthRequired)));
    }

    #[test]
    fn mismatched_identity_is_rejected() {
        let auth = AuthContext::signed_in("alice");
        assert_eq!(auth.require_same("alice").unwrap(), "alice");
        assert!(matches!(
            auth.require_same("bob"),
            Err(CoordError::AuthRequired)
        ));
    }
}
