use std::net::TcpListener;
use std::panic::Location;

use wiremock::MockServer;

const REQUIRE_SOCKET_TESTS_ENV: &str = "RELEASE_MIRROR_REQUIRE_SOCKET_TESTS";

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_SOCKET_TESTS_ENV)
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Returns true when localhost sockets cannot be bound in this environment.
///
/// Panics instead when `RELEASE_MIRROR_REQUIRE_SOCKET_TESTS` is set.
#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; mock-server test cannot run here",
        location.file(),
        location.line()
    );
    assert!(
        !socket_tests_required(),
        "{message}. Unset {REQUIRE_SOCKET_TESTS_ENV} to allow skipping."
    );

    eprintln!("{message}. Skipping. Set {REQUIRE_SOCKET_TESTS_ENV}=1 to fail instead.");
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}
