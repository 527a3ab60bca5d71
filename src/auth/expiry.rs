//! auth::expiry
//!
//! Expiry checks for stored tokens.
//!
//! A missing timestamp means "never expires". A timestamp that does not
//! parse as RFC 3339 counts as expired, so a damaged record is refreshed or
//! skipped instead of being handed out.

use chrono::{DateTime, Utc};

use super::credentials::StoredCredentials;

/// Whether the access token has expired.
pub fn is_token_expired(credentials: &StoredCredentials) -> bool {
    is_expired_at(credentials.token.expires_at.as_deref(), Utc::now())
}

/// Whether the refresh token has expired.
///
/// Records without a refresh token expiry report `false`.
pub fn is_refresh_token_expired(credentials: &StoredCredentials) -> bool {
    is_expired_at(
        credentials.token.refresh_token_expires_at.as_deref(),
        Utc::now(),
    )
}

/// Evaluate a stored expiry timestamp against `now`.
pub fn is_expired_at(expires_at: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(raw) = expires_at else {
        return false;
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => now >= at.with_timezone(&Utc),
        Err(_) => {
            tracing::debug!("unparsable expiry timestamp, treating as expired");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{format_timestamp, OAuthToken};
    use chrono::Duration;

    fn record_with(token: OAuthToken) -> StoredCredentials {
        StoredCredentials::new("github.com", "octocat", token)
    }

    #[test]
    fn no_expiry_never_expires() {
        let record = record_with(OAuthToken::new("ghp_classic"));
        assert!(!is_token_expired(&record));
        assert!(!is_refresh_token_expired(&record));
    }

    #[test]
    fn one_second_in_past_is_expired() {
        let record =
            record_with(OAuthToken::new("gho_x").expiring_at(Utc::now() - Duration::seconds(1)));
        assert!(is_token_expired(&record));
    }

    #[test]
    fn one_second_in_future_is_valid() {
        let record =
            record_with(OAuthToken::new("gho_x").expiring_at(Utc::now() + Duration::seconds(1)));
        assert!(!is_token_expired(&record));
    }

    #[test]
    fn unparsable_date_is_expired() {
        let mut token = OAuthToken::new("gho_x");
        token.expires_at = Some("not-a-date".into());
        assert!(is_token_expired(&record_with(token)));
    }

    #[test]
    fn refresh_token_expiry() {
        let expired = record_with(
            OAuthToken::new("gho_x")
                .with_refresh_token("ghr_y", Some(Utc::now() - Duration::days(1))),
        );
        assert!(is_refresh_token_expired(&expired));

        let fresh = record_with(
            OAuthToken::new("gho_x")
                .with_refresh_token("ghr_y", Some(Utc::now() + Duration::days(180))),
        );
        assert!(!is_refresh_token_expired(&fresh));

        let unbounded = record_with(OAuthToken::new("gho_x").with_refresh_token("ghr_y", None));
        assert!(!is_refresh_token_expired(&unbounded));
    }

    #[test]
    fn exact_boundary_is_expired() {
        let now = Utc::now();
        let stamp = format_timestamp(now);
        let parsed = DateTime::parse_from_rfc3339(&stamp)
            .unwrap()
            .with_timezone(&Utc);
        assert!(is_expired_at(Some(&stamp), parsed));
        assert!(!is_expired_at(Some(&stamp), parsed - Duration::seconds(1)));
    }

    #[test]
    fn offsets_are_honored() {
        let now = DateTime::parse_from_rfc3339("2026-01-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // 13:30 at +02:00 is 11:30 UTC
        assert!(is_expired_at(Some("2026-01-10T13:30:00+02:00"), now));
        assert!(!is_expired_at(Some("2026-01-10T13:30:00+00:00"), now));
    }
}
