// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint selection.
//!
//! An endpoint qualifies when its URL scheme equals the scheme of the URL
//! the workflow was started with and its security mode is not `None`.
//! Among qualifying endpoints the **last** one in received order wins.
//! Security level and policy strength are not consulted.

use crate::dispatch::scheme_of;
use crate::error::{ProbeError, ProbeResult};
use crate::types::EndpointDescription;

/// Result of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The chosen endpoint.
    pub endpoint: EndpointDescription,
    /// How many endpoints qualified.
    pub qualifying: usize,
}

/// Selects an endpoint and reports how many qualified.
pub fn select(url: &str, endpoints: &[EndpointDescription]) -> ProbeResult<Selection> {
    let no_match = || ProbeError::no_secure_endpoint(url, endpoints.len());
    let wanted = scheme_of(url).ok_or_else(no_match)?;

    let mut chosen = None;
    let mut qualifying = 0;
    for endpoint in endpoints {
        let Some(scheme) = scheme_of(&endpoint.endpoint_url) else {
            tracing::debug!(endpoint = %endpoint.endpoint_url, "Skipping endpoint with unparseable URL");
            continue;
        };
        if scheme == wanted && !endpoint.security_mode.is_none() {
            qualifying += 1;
            chosen = Some(endpoint);
        }
    }

    let endpoint = chosen.ok_or_else(no_match)?.clone();
    tracing::info!(
        endpoint = %endpoint.endpoint_url,
        mode = %endpoint.security_mode,
        policy = %endpoint.security_policy_uri,
        count = qualifying,
        "Selected endpoint"
    );
    Ok(Selection {
        endpoint,
        qualifying,
    })
}

/// Selects an endpoint.
pub fn select_endpoint(
    url: &str,
    endpoints: &[EndpointDescription],
) -> ProbeResult<EndpointDescription> {
    select(url, endpoints).map(|s| s.endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{SecurityMode, SecurityPolicy};

    const PROFILE: &str = "profile-a";

    fn ep(url: &str, mode: SecurityMode) -> EndpointDescription {
        EndpointDescription::new(url, mode, PROFILE)
    }

    #[test]
    fn test_last_match_wins() {
        let endpoints = vec![
            ep("scheme-a://h:1", SecurityMode::SignAndEncrypt)
                .with_security_policy(SecurityPolicy::Aes256Sha256RsaPss)
                .with_security_level(200),
            ep("scheme-a://h:1", SecurityMode::None),
            ep("scheme-a://h:1", SecurityMode::Sign).with_security_level(1),
            ep("scheme-b://h:2", SecurityMode::SignAndEncrypt),
        ];

        let selection = select("scheme-a://h:1", &endpoints).unwrap();
        assert_eq!(selection.endpoint, endpoints[2]);
        assert_eq!(selection.qualifying, 2);
    }

    #[test]
    fn test_scheme_must_match() {
        let endpoints = vec![ep("scheme-b://h:2", SecurityMode::SignAndEncrypt)];
        let err = select_endpoint("scheme-a://h:1", &endpoints).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSecureEndpoint);
    }

    #[test]
    fn test_all_none_fails() {
        let endpoints = vec![
            ep("scheme-a://h:1", SecurityMode::None),
            ep("scheme-a://h:1", SecurityMode::None),
        ];
        let err = select_endpoint("scheme-a://h:1", &endpoints).unwrap_err();
        assert!(matches!(
            err,
            ProbeError::NoSecureEndpoint { candidates: 2, .. }
        ));
    }

    #[test]
    fn test_empty_list_fails() {
        let err = select_endpoint("scheme-a://h:1", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSecureEndpoint);
    }

    #[test]
    fn test_unparseable_urls_never_qualify() {
        let endpoints = vec![
            ep("scheme-a://h:1", SecurityMode::Sign),
            ep("not a url", SecurityMode::SignAndEncrypt),
        ];
        let selection = select("scheme-a://h:1", &endpoints).unwrap();
        assert_eq!(selection.endpoint, endpoints[0]);
        assert_eq!(selection.qualifying, 1);
    }

    #[test]
    fn test_host_is_not_compared() {
        let endpoints = vec![ep("scheme-a://other-host:9", SecurityMode::Sign)];
        let chosen = select_endpoint("scheme-a://h:1", &endpoints).unwrap();
        assert_eq!(chosen.endpoint_url, "scheme-a://other-host:9");
    }
}
