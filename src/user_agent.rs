//! Shared User-Agent string for API and asset HTTP clients.
//!
//! Hosting APIs reject anonymous clients, so every request identifies the
//! tool and its version with the same header.

/// Product token sent in the User-Agent header.
const PRODUCT: &str = "release-mirror";

/// Default User-Agent for API and download requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (release-asset-mirror)")
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("release-mirror/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version: {ua}"
        );
    }

    #[test]
    fn test_user_agent_is_not_a_browser() {
        let ua = default_user_agent();
        assert!(!ua.contains("Mozilla"), "UA must identify the tool: {ua}");
    }
}
