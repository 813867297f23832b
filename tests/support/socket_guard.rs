//! Skips socket-bound tests on hosts where localhost cannot be bound.
//!
//! Set `RAWFETCH_REQUIRE_SOCKET_TESTS=1` to turn a skip into a failure.

use std::net::TcpListener as StdListener;
use std::panic::Location;

use tokio::net::TcpListener;
use wiremock::MockServer;

const REQUIRE_VAR: &str = "RAWFETCH_REQUIRE_SOCKET_TESTS";

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var(REQUIRE_VAR).is_ok_and(|value| {
        ["1", "true", "yes"]
            .iter()
            .any(|accepted| value.eq_ignore_ascii_case(accepted))
    })
}

/// Returns true when the calling test should return early.
#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if StdListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let caller = Location::caller();
    let message = format!(
        "[socket-bound-test] {}:{} cannot bind 127.0.0.1",
        caller.file(),
        caller.line()
    );
    assert!(!socket_tests_required(), "{message} and {REQUIRE_VAR} is set");
    eprintln!("{message}; skipping (set {REQUIRE_VAR}=1 to fail instead)");
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        return None;
    }
    Some(MockServer::start().await)
}

/// Binds a raw listener on an ephemeral localhost port.
pub async fn bind_listener_or_skip() -> Option<TcpListener> {
    if should_skip_socket_bound_test() {
        return None;
    }
    TcpListener::bind("127.0.0.1:0").await.ok()
}
