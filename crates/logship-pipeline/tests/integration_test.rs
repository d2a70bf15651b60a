// Copyright 2025-Present the logship contributors
// SPDX-License-Identifier: Apache-2.0

use logship_pipeline::config::Config;
use logship_pipeline::error::Error;
use logship_pipeline::intake::IntakeClient;
use logship_pipeline::pipeline::Pipeline;
use logship_pipeline::workload::Workload;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn test_config(endpoint: String) -> Config {
    Config {
        docker_image: "unused".to_string(),
        bash_command: "unused".to_string(),
        endpoint,
        api_key: "mock-api-key".to_string(),
        group: "test-group".to_string(),
        stream: "test-stream".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn pipeline_ships_captured_lines_to_intake() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/logs")
        .match_header("X-Api-Key", "mock-api-key")
        .match_header("Content-Type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "destination_group": "test-group",
            "destination_stream": "test-stream",
        })))
        .with_status(200)
        .create_async()
        .await;

    let client = IntakeClient::new(&test_config(server.url())).expect("failed to build client");
    let pipeline = Pipeline::new(
        Arc::new(client),
        "emit".to_string(),
        Duration::from_secs(3600),
    );

    let workload = Workload::spawn(
        "sh",
        &["-c", "echo o1; echo o2; echo o3; echo e1 >&2; echo e2 >&2"],
    )
    .expect("failed to spawn workload");

    let summary = pipeline
        .run(workload, CancellationToken::new(), CancellationToken::new())
        .await
        .expect("pipeline failed");

    assert_eq!(summary.entries_delivered, 5);
    assert_eq!(summary.batches_flushed, 1);
    assert!(!summary.interrupted);
    mock.assert_async().await;
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let mut server = Server::new_async().await;
    let group_mock = server
        .mock("POST", "/api/v1/groups")
        .match_header("X-Api-Key", "mock-api-key")
        .with_status(409)
        .expect(2)
        .create_async()
        .await;
    let stream_mock = server
        .mock("POST", "/api/v1/streams")
        .with_status(409)
        .expect(2)
        .create_async()
        .await;

    let client = IntakeClient::new(&test_config(server.url())).expect("failed to build client");

    // "Already exists" is success, twice over.
    client.ensure_group().await.expect("first ensure_group");
    client.ensure_group().await.expect("second ensure_group");
    client.ensure_stream().await.expect("first ensure_stream");
    client.ensure_stream().await.expect("second ensure_stream");

    group_mock.assert_async().await;
    stream_mock.assert_async().await;
}

#[tokio::test]
async fn provisioning_failure_is_fatal() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/groups")
        .with_status(403)
        .with_body("invalid credentials")
        .create_async()
        .await;

    let client = IntakeClient::new(&test_config(server.url())).expect("failed to build client");
    let result = client.ensure_group().await;

    match result {
        Err(Error::Provisioning(msg)) => assert!(msg.contains("403")),
        other => panic!("expected provisioning error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn delivery_failure_reports_count_delivered_before_it() {
    let mut server = Server::new_async().await;
    let ok_mock = server
        .mock("POST", "/api/v1/logs")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let fail_mock = server
        .mock("POST", "/api/v1/logs")
        .with_status(503)
        .with_body("Service Unavailable")
        .expect(1)
        .create_async()
        .await;

    let client = IntakeClient::new(&test_config(server.url())).expect("failed to build client");
    let pipeline = Pipeline::new(
        Arc::new(client),
        "emit".to_string(),
        Duration::from_millis(50),
    );

    let workload = Workload::spawn(
        "sh",
        &["-c", "echo first; sleep 0.15; echo second; sleep 0.15"],
    )
    .expect("failed to spawn workload");

    let result = pipeline
        .run(workload, CancellationToken::new(), CancellationToken::new())
        .await;

    match result {
        Err(Error::Delivery { delivered, .. }) => assert_eq!(delivered, 1),
        other => panic!("expected delivery error, got {other:?}"),
    }
    ok_mock.assert_async().await;
    fail_mock.assert_async().await;
}

#[tokio::test]
async fn interrupt_drains_and_ships_buffered_entries() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/logs")
        .match_body(Matcher::PartialJson(json!({
            "destination_group": "test-group",
        })))
        .with_status(200)
        .create_async()
        .await;

    let client = IntakeClient::new(&test_config(server.url())).expect("failed to build client");
    let pipeline = Pipeline::new(
        Arc::new(client),
        "emit".to_string(),
        Duration::from_secs(3600),
    );

    let workload =
        Workload::spawn("sh", &["-c", "echo buffered; exec sleep 30"]).expect("failed to spawn");

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let summary = pipeline
        .run(workload, shutdown, CancellationToken::new())
        .await
        .expect("pipeline failed");

    assert!(summary.interrupted);
    assert_eq!(summary.entries_delivered, 1);
    mock.assert_async().await;
}
