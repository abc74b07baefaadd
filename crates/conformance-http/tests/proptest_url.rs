// crates/conformance-http/tests/proptest_url.rs
// ============================================================================
// Module: URL Policy Property-Based Tests
// Description: Property tests for scheme, credential, and allowlist enforcement.
// Purpose: Ensure URL policy holds across generated hosts, paths, and users.
// ============================================================================

//! Property-based tests for URL policy invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;

use conformance_http::HttpClientConfig;
use conformance_http::HttpError;
use conformance_http::Url;
use conformance_http::validate_url;
use proptest::prelude::*;

fn host_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5}){1,2}"
}

fn path_strategy() -> impl Strategy<Value = String> {
    "(/[a-z0-9_-]{0,8}){0,4}"
}

proptest! {
    #[test]
    fn credentials_are_always_rejected(
        host in host_strategy(),
        path in path_strategy(),
        user in "[a-z]{1,8}",
    ) {
        let url = Url::parse(&format!("https://{user}@{host}{path}")).unwrap();
        prop_assert_eq!(validate_url(&url, &HttpClientConfig::default()), Err(HttpError::Credentials));
    }

    #[test]
    fn cleartext_follows_the_opt_in(host in host_strategy(), path in path_strategy(), allow_http in any::<bool>()) {
        let url = Url::parse(&format!("http://{host}{path}")).unwrap();
        let config = HttpClientConfig {
            allow_http,
            ..HttpClientConfig::default()
        };
        let result = validate_url(&url, &config);
        if allow_http {
            prop_assert_eq!(result, Ok(()));
        } else {
            prop_assert_eq!(result, Err(HttpError::Scheme("http".to_string())));
        }
    }

    #[test]
    fn allowlist_admits_exactly_listed_hosts(
        allowed in prop::collection::btree_set(host_strategy(), 1 .. 4),
        candidate in host_strategy(),
    ) {
        let config = HttpClientConfig {
            allowed_hosts: Some(allowed.clone()),
            ..HttpClientConfig::default()
        };
        let url = Url::parse(&format!("https://{candidate}/")).unwrap();
        let host = url.host_str().unwrap().to_string();
        let result = validate_url(&url, &config);
        if allowed.contains(&host) {
            prop_assert_eq!(result, Ok(()));
        } else {
            prop_assert_eq!(result, Err(HttpError::HostNotAllowed(host)));
        }
        let listed: BTreeSet<String> = allowed;
        for host in &listed {
            let url = Url::parse(&format!("https://{host}/")).unwrap();
            prop_assert_eq!(validate_url(&url, &config), Ok(()));
        }
    }
}
