//! Caller identity and poll access policy.

use askanai_common::sha256_hex;
use askanai_db::entities::poll::{self, PollStatus, VisibilityMode};

/// The party behind a request.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Signed-in user, if a valid bearer token was presented.
    pub user_id: Option<String>,
    /// Whether the signed-in user holds the admin role.
    pub is_admin: bool,
    /// Plaintext creator key from `X-Creator-Key`.
    pub creator_key: Option<String>,
    /// Salted hash of the client IP.
    pub ip_hash: String,
    /// Salted hash of the client user agent.
    pub ua_hash: String,
}

impl Caller {
    /// An anonymous caller identified only by client hashes.
    #[must_use]
    pub fn anonymous(ip_hash: impl Into<String>, ua_hash: impl Into<String>) -> Self {
        Self {
            ip_hash: ip_hash.into(),
            ua_hash: ua_hash.into(),
            ..Self::default()
        }
    }

    /// Signed-in user id as a string slice.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Whether the caller created `poll`, as a signed-in user or by creator key.
    #[must_use]
    pub fn owns(&self, poll: &poll::Model) -> bool {
        let by_user = matches!(
            (self.user_id.as_deref(), poll.created_by_user_id.as_deref()),
            (Some(caller), Some(creator)) if caller == creator
        );
        let by_key = matches!(
            (self.creator_key.as_deref(), poll.creator_key_hash.as_deref()),
            (Some(key), Some(hash)) if sha256_hex(key) == hash
        );
        by_user || by_key
    }

    /// Owner or admin.
    #[must_use]
    pub fn can_manage(&self, poll: &poll::Model) -> bool {
        self.is_admin || self.owns(poll)
    }
}

/// Outcome of the results visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultsAccess {
    /// Results may be shown.
    Granted,
    /// Poll must be reported as nonexistent.
    Hidden,
    /// Caller must respond before seeing results.
    RespondFirst,
}

/// Decide whether `caller` may see results of `poll`.
///
/// `has_responded` is consulted only for voters-only polls.
#[must_use]
pub fn results_access(poll: &poll::Model, caller: &Caller, has_responded: bool) -> ResultsAccess {
    if caller.can_manage(poll) {
        return ResultsAccess::Granted;
    }
    if poll.status == PollStatus::Draft {
        return ResultsAccess::Hidden;
    }
    match poll.visibility_mode {
        VisibilityMode::Private => ResultsAccess::Hidden,
        VisibilityMode::Voters if !has_responded => ResultsAccess::RespondFirst,
        VisibilityMode::Voters | VisibilityMode::Public | VisibilityMode::Unlisted => {
            ResultsAccess::Granted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;

    fn stranger() -> Caller {
        Caller::anonymous("ip", "ua")
    }

    #[test]
    fn test_owner_by_user_or_key() {
        let mut poll = test_support::poll("p1");
        poll.created_by_user_id = Some("u1".to_string());
        poll.creator_key_hash = Some(sha256_hex("secret-key"));

        let by_user = Caller {
            user_id: Some("u1".to_string()),
            ..stranger()
        };
        let by_key = Caller {
            creator_key: Some("secret-key".to_string()),
            ..stranger()
        };
        let wrong_key = Caller {
            creator_key: Some("guess".to_string()),
            ..stranger()
        };

        assert!(by_user.owns(&poll));
        assert!(by_key.owns(&poll));
        assert!(!wrong_key.owns(&poll));
        assert!(!stranger().owns(&poll));
    }

    #[test]
    fn test_private_poll_hidden_from_strangers() {
        let mut poll = test_support::poll("p1");
        poll.visibility_mode = VisibilityMode::Private;

        assert_eq!(results_access(&poll, &stranger(), true), ResultsAccess::Hidden);

        let admin = Caller {
            user_id: Some("admin".to_string()),
            is_admin: true,
            ..stranger()
        };
        assert_eq!(results_access(&poll, &admin, false), ResultsAccess::Granted);
    }

    #[test]
    fn test_draft_hidden_even_when_public() {
        let mut poll = test_support::poll("p1");
        poll.status = PollStatus::Draft;

        assert_eq!(results_access(&poll, &stranger(), false), ResultsAccess::Hidden);
    }

    #[test]
    fn test_voters_only_requires_response() {
        let mut poll = test_support::poll("p1");
        poll.visibility_mode = VisibilityMode::Voters;

        assert_eq!(
            results_access(&poll, &stranger(), false),
            ResultsAccess::RespondFirst
        );
        assert_eq!(results_access(&poll, &stranger(), true), ResultsAccess::Granted);
    }

    #[test]
    fn test_unlisted_always_visible() {
        let mut poll = test_support::poll("p1");
        poll.visibility_mode = VisibilityMode::Unlisted;

        assert_eq!(results_access(&poll, &stranger(), false), ResultsAccess::Granted);
    }
}
