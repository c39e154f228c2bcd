//! Sync conflict classification.
//!
//! Maps a push/pull/fetch failure to a fixed category with targeted
//! remediation actions. The classifier consumes the typed error variants
//! directly; it never inspects message text. Unrecognized failures fall
//! back to the raw message with a dismiss-only remediation.

use crate::error::Error;

/// A remediation the caller can offer for a sync failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemedyAction {
    /// Discard local history and take the remote's.
    ForcePull,
    /// Overwrite the remote's history with the local one.
    ForcePush,
    /// Pull the remote's new commits, then retry the push.
    PullThenRetry,
    /// No automatic remediation; acknowledge and move on.
    Dismiss,
}

impl RemedyAction {
    /// Short human hint for this action.
    pub fn hint(&self) -> &'static str {
        match self {
            RemedyAction::ForcePull => "force-pull to discard local history",
            RemedyAction::ForcePush => "force-push to overwrite the remote",
            RemedyAction::PullThenRetry => "pull the remote changes, then retry",
            RemedyAction::Dismiss => "dismiss",
        }
    }
}

/// A classified sync failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConflict {
    /// One-line category title.
    pub title: String,
    /// Human explanation of what went wrong.
    pub detail: String,
    /// Remediation actions, most preferred first.
    pub actions: Vec<RemedyAction>,
}

/// Classify a sync failure into a category with remediation actions.
pub fn classify(err: &Error) -> SyncConflict {
    match err {
        Error::MergeUnsupported => SyncConflict {
            title: "merge required".to_string(),
            detail: "the histories can only be combined with a merge commit, \
                     which this store cannot represent"
                .to_string(),
            actions: vec![RemedyAction::ForcePull, RemedyAction::ForcePush],
        },
        Error::FastForwardUnsupported => SyncConflict {
            title: "histories have diverged".to_string(),
            detail: "the local and remote branches each contain commits the other does not"
                .to_string(),
            actions: vec![RemedyAction::ForcePull, RemedyAction::ForcePush],
        },
        Error::PushRejected(detail) => SyncConflict {
            title: "push rejected".to_string(),
            detail: detail.clone(),
            actions: vec![RemedyAction::PullThenRetry, RemedyAction::ForcePush],
        },
        Error::AuthenticationFailed
        | Error::HttpStatus { code: 401, .. }
        | Error::HttpStatus { code: 403, .. } => SyncConflict {
            title: "authentication failed".to_string(),
            detail: "the remote rejected your credentials; check your access rights".to_string(),
            actions: vec![RemedyAction::Dismiss],
        },
        Error::HttpStatus { code, text } => SyncConflict {
            title: "http failure".to_string(),
            detail: format!("the remote answered HTTP {}: {}", code, text),
            actions: vec![RemedyAction::Dismiss],
        },
        Error::NetworkFailure(detail) => SyncConflict {
            title: "network failure".to_string(),
            detail: detail.clone(),
            actions: vec![RemedyAction::Dismiss],
        },
        Error::SignerRequired => SyncConflict {
            title: "signer required".to_string(),
            detail: "this remote only accepts signed updates; configure a signer".to_string(),
            actions: vec![RemedyAction::Dismiss],
        },
        other => SyncConflict {
            title: "sync failed".to_string(),
            detail: other.to_string(),
            actions: vec![RemedyAction::Dismiss],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence_offers_both_force_directions() {
        let conflict = classify(&Error::FastForwardUnsupported);
        assert_eq!(
            conflict.actions,
            vec![RemedyAction::ForcePull, RemedyAction::ForcePush]
        );
    }

    #[test]
    fn test_merge_unsupported_matches_divergence_remediation() {
        let conflict = classify(&Error::MergeUnsupported);
        assert_eq!(
            conflict.actions,
            vec![RemedyAction::ForcePull, RemedyAction::ForcePush]
        );
    }

    #[test]
    fn test_rejected_push_suggests_pull_first() {
        let conflict = classify(&Error::PushRejected("remote is ahead".to_string()));
        assert_eq!(conflict.actions[0], RemedyAction::PullThenRetry);
        assert_eq!(conflict.detail, "remote is ahead");
    }

    #[test]
    fn test_http_401_is_authentication() {
        let conflict = classify(&Error::HttpStatus { code: 401, text: "Unauthorized".into() });
        assert_eq!(conflict.title, "authentication failed");
        let conflict = classify(&Error::HttpStatus { code: 403, text: "Forbidden".into() });
        assert_eq!(conflict.title, "authentication failed");
    }

    #[test]
    fn test_other_http_codes_keep_code_and_text() {
        let conflict = classify(&Error::HttpStatus { code: 502, text: "Bad Gateway".into() });
        assert_eq!(conflict.title, "http failure");
        assert!(conflict.detail.contains("502"));
        assert!(conflict.detail.contains("Bad Gateway"));
    }

    #[test]
    fn test_unrecognized_falls_back_to_raw_message() {
        let conflict = classify(&Error::Internal("boom".to_string()));
        assert_eq!(conflict.actions, vec![RemedyAction::Dismiss]);
        assert!(conflict.detail.contains("boom"));
    }
}
