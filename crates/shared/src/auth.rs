//! Authentication types for JWT access tokens.
//!
//! Tokens are issued by the external identity service; this backend only
//! validates them and reads the subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::UserId;

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_new_sets_correct_fields() {
        let user_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(1);

        let claims = Claims::new(user_id, expires_at);

        assert_eq!(claims.sub, user_id);
        assert!(claims.iat <= Utc::now().timestamp());
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_claims_user_id_returns_sub() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Utc::now() + Duration::hours(1));

        assert_eq!(claims.user_id().into_inner(), user_id);
    }

    #[test]
    fn test_claims_iat_is_current_time() {
        let before = Utc::now().timestamp();
        let claims = Claims::new(Uuid::new_v4(), Utc::now() + Duration::hours(1));
        let after = Utc::now().timestamp();

        assert!(claims.iat >= before);
        assert!(claims.iat <= after);
    }
}
