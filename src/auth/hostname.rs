//! auth::hostname
//!
//! Canonical hostname keys.
//!
//! Every backend is keyed by the normalized hostname, so `HTTPS://GitHub.COM/`
//! and `github.com` address the same credential.

/// Host used when the caller does not name one.
pub const DEFAULT_HOSTNAME: &str = "github.com";

/// Normalize a hostname or URL into a lookup key.
///
/// Lowercases, strips one leading `http://` or `https://`, and strips one
/// trailing `/`. Total: never fails.
///
/// # Example
///
/// ```
/// use octocode_credentials::auth::normalize_hostname;
///
/// assert_eq!(normalize_hostname("HTTPS://GitHub.COM/"), "github.com");
/// assert_eq!(normalize_hostname("github.com"), "github.com");
/// ```
pub fn normalize_hostname(input: &str) -> String {
    let lower = input.to_lowercase();
    let stripped = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    stripped.strip_suffix('/').unwrap_or(stripped).to_string()
}
