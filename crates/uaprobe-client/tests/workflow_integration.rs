// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Workflow Integration Tests
//!
//! End-to-end runs of the discovery to read workflow over in-memory
//! bindings registered under custom schemes.
//!
//! ## Test Categories
//!
//! - `test_workflow_*`: Successful runs on each binding
//! - `test_selection_*`: Endpoint selection as seen through a run
//! - `test_failure_*`: Failing runs, reporting and cleanup

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use uaprobe_client::certificate::ClientCertificate;
use uaprobe_client::dispatch::TransportRegistry;
use uaprobe_client::error::{ErrorKind, ProbeError, ReadError};
use uaprobe_client::report::{MemorySink, ReportEvent};
use uaprobe_client::simulator::{LoopbackFactory, ServerFixture};
use uaprobe_client::types::{
    ClientConfig, EndpointDescription, NodeId, ReadValueId, SecurityMode, ServerDescription,
    StatusCode, TimestampsToReturn, Variant,
};
use uaprobe_client::workflow::{Workflow, WorkflowState};

// =============================================================================
// Test Helpers
// =============================================================================

const URL_A: &str = "scheme-a://host:48040";
const URL_B: &str = "scheme-b://host:48043";

fn test_server() -> ServerDescription {
    ServerDescription::new("TestServer", "urn:test")
}

fn secure(url: &str, profile: &str) -> EndpointDescription {
    EndpointDescription::new(url, SecurityMode::SignAndEncrypt, profile)
}

fn unsecured(url: &str, profile: &str) -> EndpointDescription {
    EndpointDescription::new(url, SecurityMode::None, profile)
}

fn two_nodes() -> Vec<ReadValueId> {
    vec![
        ReadValueId::value(NodeId::string(1, "Node1")),
        ReadValueId::value(NodeId::string(1, "Node2")),
    ]
}

fn fixture_with(endpoints: Vec<EndpointDescription>) -> ServerFixture {
    let mut builder = ServerFixture::builder()
        .server(test_server())
        .value(NodeId::string(1, "Node1"), 1i32)
        .value(NodeId::string(1, "Node2"), "two");
    for endpoint in endpoints {
        builder = builder.endpoint(endpoint);
    }
    builder.build()
}

fn registry(fixture_a: &ServerFixture, fixture_b: &ServerFixture) -> TransportRegistry {
    TransportRegistry::new()
        .with_binding(
            "scheme-a",
            "profile-a",
            Arc::new(LoopbackFactory::new(fixture_a.clone(), "profile-a")),
        )
        .with_binding(
            "scheme-b",
            "profile-b",
            Arc::new(LoopbackFactory::new(fixture_b.clone(), "profile-b")),
        )
}

fn workflow(registry: TransportRegistry, sink: Arc<MemorySink>) -> Workflow {
    Workflow::builder()
        .registry(registry)
        .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
        .requests(two_nodes())
        .timestamps(TimestampsToReturn::Both)
        .shared_sink(sink)
        .build()
        .expect("workflow should build")
}

// =============================================================================
// Successful Runs
// =============================================================================

#[tokio::test]
async fn test_workflow_socket_binding() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    let outcome = workflow(registry(&fixture_a, &fixture_b), sink.clone())
        .spawn(URL_A)
        .wait()
        .await
        .expect("run should succeed");

    assert_eq!(outcome.endpoint, secure(URL_A, "profile-a"));
    assert_eq!(outcome.servers, vec![test_server()]);
    assert_eq!(outcome.values.len(), 2);
    assert_eq!(outcome.values[0].value, Variant::Int32(1));
    assert_eq!(outcome.values[1].value, Variant::String("two".into()));

    assert_eq!(fixture_a.read_calls(), 1);
    assert_eq!(fixture_b.discovery_calls(), 0);
    assert_eq!(fixture_a.active_channels(), 0);
    assert_eq!(fixture_a.active_sessions(), 0);
}

#[tokio::test]
async fn test_workflow_websocket_binding() {
    let fixture_a = fixture_with(Vec::new());
    let fixture_b = fixture_with(vec![secure(URL_B, "profile-b")]);
    let sink = Arc::new(MemorySink::new());

    let outcome = workflow(registry(&fixture_a, &fixture_b), sink.clone())
        .spawn(URL_B)
        .wait()
        .await
        .expect("run should succeed");

    assert_eq!(outcome.endpoint.transport_profile_uri, "profile-b");
    assert_eq!(outcome.values[0].value, Variant::Int32(1));
    assert_eq!(outcome.values[1].value, Variant::String("two".into()));
    assert_eq!(fixture_b.read_calls(), 1);
    assert_eq!(fixture_a.discovery_calls(), 0);
}

#[tokio::test]
async fn test_workflow_report_lines() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    workflow(registry(&fixture_a, &fixture_b), sink.clone())
        .run(URL_A)
        .await
        .expect("run should succeed");

    let lines = sink.lines();
    assert_eq!(
        lines,
        vec![
            "[Connecting to EndpointUrl] scheme-a://host:48040".to_string(),
            "[ApplicationDescription] TestServer|urn:test".to_string(),
            "[EndpointDescription] scheme-a://host:48040|profile-a".to_string(),
            "[Connecting to EndpointUrl] scheme-a://host:48040 SignAndEncrypt".to_string(),
            format!("[DataValue] {}", sink.values()[0]),
            format!("[DataValue] {}", sink.values()[1]),
        ]
    );
}

#[tokio::test]
async fn test_workflow_state_reaches_done() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    let task = workflow(registry(&fixture_a, &fixture_b), sink).spawn(URL_A);
    let mut states = task.subscribe();
    let outcome = task.wait().await;
    assert!(outcome.is_ok());

    states.changed().await.ok();
    assert_eq!(*states.borrow(), WorkflowState::Done);
}

#[tokio::test]
async fn test_workflow_preserves_request_order() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());

    let mut reversed = two_nodes();
    reversed.reverse();
    let outcome = Workflow::builder()
        .registry(registry(&fixture_a, &fixture_b))
        .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
        .requests(reversed)
        .sink(MemorySink::new())
        .build()
        .unwrap()
        .run(URL_A)
        .await
        .unwrap();

    assert_eq!(outcome.values[0].value, Variant::String("two".into()));
    assert_eq!(outcome.values[1].value, Variant::Int32(1));
}

#[tokio::test]
async fn test_workflow_runs_are_independent() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());
    let registry = Arc::new(registry(&fixture_a, &fixture_b));

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            Workflow::builder()
                .shared_registry(registry.clone())
                .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
                .requests(two_nodes())
                .sink(MemorySink::new())
                .build()
                .unwrap()
                .spawn(URL_A)
        })
        .collect();

    for task in tasks {
        let outcome = task.wait().await.unwrap();
        assert_eq!(outcome.values.len(), 2);
    }
    assert_eq!(fixture_a.read_calls(), 3);
    assert_eq!(fixture_a.sessions_created(), 3);
    assert_eq!(fixture_a.active_channels(), 0);
}

#[tokio::test]
async fn test_workflow_positional_correlation_under_permutation() {
    let names = ["Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot"];
    let mut builder = ServerFixture::builder()
        .server(test_server())
        .endpoint(secure(URL_A, "profile-a"));
    for (i, name) in names.iter().enumerate() {
        builder = builder.value(NodeId::string(1, *name), (i as i32 + 1) * 10);
    }
    let fixture_a = builder.build();
    let fixture_b = fixture_with(Vec::new());
    let registry = Arc::new(registry(&fixture_a, &fixture_b));

    let orders: [[usize; 6]; 4] = [
        [0, 1, 2, 3, 4, 5],
        [5, 4, 3, 2, 1, 0],
        [2, 5, 0, 3, 1, 4],
        [3, 0, 4, 1, 5, 2],
    ];

    for order in orders {
        let requests: Vec<_> = order
            .iter()
            .map(|&i| ReadValueId::value(NodeId::string(1, names[i])))
            .collect();

        let outcome = Workflow::builder()
            .shared_registry(registry.clone())
            .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
            .requests(requests)
            .sink(MemorySink::new())
            .build()
            .unwrap()
            .run(URL_A)
            .await
            .unwrap();

        let actual: Vec<_> = outcome.values.iter().map(|v| v.value.clone()).collect();
        let expected: Vec<_> = order
            .iter()
            .map(|&i| Variant::Int32((i as i32 + 1) * 10))
            .collect();
        assert_eq!(actual, expected, "order {:?}", order);
    }
    assert_eq!(fixture_a.read_calls(), orders.len());
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_selection_last_qualifying_endpoint() {
    let first = secure(URL_A, "profile-a").with_security_level(200);
    let last = EndpointDescription::new("scheme-a://host:48041", SecurityMode::Sign, "profile-a")
        .with_security_level(1);
    let fixture_a = fixture_with(vec![
        first,
        unsecured(URL_A, "profile-a"),
        last.clone(),
        secure("scheme-z://host:1", "profile-a"),
    ]);
    let fixture_b = fixture_with(Vec::new());

    let outcome = workflow(registry(&fixture_a, &fixture_b), Arc::new(MemorySink::new()))
        .run(URL_A)
        .await
        .unwrap();

    assert_eq!(outcome.endpoint, last);
}

// =============================================================================
// Failing Runs
// =============================================================================

#[tokio::test]
async fn test_selection_is_stable_across_runs() {
    let expected = EndpointDescription::new("scheme-a://host:48041", SecurityMode::Sign, "profile-a");
    let fixture_a = fixture_with(vec![
        secure(URL_A, "profile-a"),
        expected.clone(),
        unsecured(URL_A, "profile-a"),
        secure(URL_B, "profile-b"),
    ]);
    let fixture_b = fixture_with(Vec::new());
    let registry = Arc::new(registry(&fixture_a, &fixture_b));

    let mut chosen = Vec::new();
    for _ in 0..2 {
        let outcome = Workflow::builder()
            .shared_registry(registry.clone())
            .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
            .requests(two_nodes())
            .sink(MemorySink::new())
            .build()
            .unwrap()
            .run(URL_A)
            .await
            .unwrap();
        chosen.push(outcome.endpoint);
    }

    assert_eq!(chosen[0], expected);
    assert_eq!(chosen[1], chosen[0]);
    assert_eq!(fixture_a.discovery_calls(), 2);
}

#[tokio::test]
async fn test_failure_no_secure_endpoint() {
    let fixture_a = fixture_with(vec![
        unsecured(URL_A, "profile-a"),
        unsecured("scheme-a://host:48041", "profile-a"),
    ]);
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    let task = workflow(registry(&fixture_a, &fixture_b), sink.clone()).spawn(URL_A);
    let err = task.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoSecureEndpoint);
    assert_eq!(fixture_a.read_calls(), 0);
    assert_eq!(fixture_a.sessions_created(), 0);
    assert_eq!(fixture_a.channels_opened(), 1);
    assert_eq!(fixture_a.active_channels(), 0);

    let events = sink.events();
    assert!(events.last().is_some_and(ReportEvent::is_failure));
    assert_eq!(events.iter().filter(|e| e.is_failure()).count(), 1);
    assert!(!events.iter().any(|e| matches!(e, ReportEvent::Selected(_))));
}

#[tokio::test]
async fn test_failure_secure_endpoint_of_other_scheme() {
    let fixture_a = fixture_with(vec![
        unsecured(URL_A, "profile-a"),
        secure(URL_B, "profile-b"),
    ]);
    let fixture_b = fixture_with(Vec::new());

    let err = workflow(registry(&fixture_a, &fixture_b), Arc::new(MemorySink::new()))
        .run(URL_A)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoSecureEndpoint);
    assert_eq!(fixture_b.channels_opened(), 0);
}

#[tokio::test]
async fn test_failure_unsupported_scheme() {
    let fixture_a = fixture_with(Vec::new());
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    let err = workflow(registry(&fixture_a, &fixture_b), sink.clone())
        .run("scheme-z://host:1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedTransport);
    assert_eq!(sink.events().len(), 2);
}

#[tokio::test]
async fn test_failure_session_rejected() {
    let fixture_a = ServerFixture::builder()
        .server(test_server())
        .endpoint(secure(URL_A, "profile-a"))
        .reject_sessions(StatusCode::BAD_TOO_MANY_SESSIONS)
        .build();
    let fixture_b = fixture_with(Vec::new());

    let task = workflow(registry(&fixture_a, &fixture_b), Arc::new(MemorySink::new())).spawn(URL_A);
    let err = task.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SessionRejected);
    assert_eq!(fixture_a.read_calls(), 0);
    assert_eq!(fixture_a.active_channels(), 0);
}

#[tokio::test]
async fn test_failure_missing_certificate() {
    let fixture_a = fixture_with(vec![secure(URL_A, "profile-a")]);
    let fixture_b = fixture_with(Vec::new());

    let err = Workflow::builder()
        .registry(registry(&fixture_a, &fixture_b))
        .requests(two_nodes())
        .sink(MemorySink::new())
        .build()
        .unwrap()
        .run(URL_A)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ChannelEstablishmentFailure);
    assert_eq!(fixture_a.sessions_created(), 0);
}

#[tokio::test]
async fn test_failure_read_timeout_releases_session() {
    let fixture_a = ServerFixture::builder()
        .server(test_server())
        .endpoint(secure(URL_A, "profile-a"))
        .value(NodeId::string(1, "Node1"), 1i32)
        .stall_reads()
        .build();
    let fixture_b = fixture_with(Vec::new());
    let config = ClientConfig::builder()
        .request_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = Workflow::builder()
        .config(config)
        .registry(registry(&fixture_a, &fixture_b))
        .certificate(ClientCertificate::self_issued("urn:uaprobe:test"))
        .requests(two_nodes())
        .sink(MemorySink::new())
        .build()
        .unwrap()
        .run(URL_A)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReadFailure);
    assert!(matches!(err, ProbeError::Read(ReadError::Channel(_))));
    assert_eq!(fixture_a.read_calls(), 1);
    assert_eq!(fixture_a.active_channels(), 0);
}

#[tokio::test]
async fn test_failure_discovery_unreachable() {
    let fixture_a = ServerFixture::builder().unreachable().build();
    let fixture_b = fixture_with(Vec::new());
    let sink = Arc::new(MemorySink::new());

    let task = workflow(registry(&fixture_a, &fixture_b), sink.clone()).spawn(URL_A);
    let mut states = task.subscribe();
    let err = task.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DiscoveryFailure);
    states.changed().await.ok();
    assert_eq!(
        *states.borrow(),
        WorkflowState::Failed(ErrorKind::DiscoveryFailure)
    );
    assert_eq!(sink.events().len(), 2);
}
