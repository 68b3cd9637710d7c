//! Constants for the download module (timeouts, retry budget, mirrors).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Whole-request ceiling (5 minutes for large assets).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Attempts made against one download source before moving to the next.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Constant pause between two attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Mirror used when no mirror list is configured.
pub const DEFAULT_MIRROR: &str = "gh-proxy.com";

/// Canonical origin of the primary hosting provider's download URLs.
pub const GITHUB_ORIGIN: &str = "https://github.com";

/// Suffix appended to a destination path while it is being written.
pub const TEMP_SUFFIX: &str = ".tmp";
