//! HTTP round trips against a server bound to an ephemeral port.

use lb_mimic::server::ServerHandle;
use lb_mimic::{
    LoadBalancerServer, LoadBalancerService, ManualClock, SequentialIds, SimulatorConfig,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

async fn start() -> (ServerHandle, ManualClock) {
    let clock = ManualClock::default();
    let service = LoadBalancerService::with_collaborators(
        SimulatorConfig::default(),
        Arc::new(clock.clone()),
        Arc::new(SequentialIds::new()),
    )
    .unwrap();
    let handle = LoadBalancerServer::bind("127.0.0.1:0", service)
        .await
        .unwrap()
        .spawn()
        .unwrap();
    (handle, clock)
}

async fn create(client: &reqwest::Client, base: &str, body: Value) -> Value {
    let response = client
        .post(format!("{}/v1.0/tenant-1/loadbalancers", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    response.json::<Value>().await.unwrap()["loadBalancer"].clone()
}

#[tokio::test]
async fn test_load_balancer_round_trip() {
    let (handle, clock) = start().await;
    let base = handle.base_url();
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &base,
        json!({
            "loadBalancer": {
                "name": "web",
                "protocol": "HTTP",
                "metadata": [{"key": "lb_building", "value": 2}]
            }
        }),
    )
    .await;
    assert_eq!(created["status"], "BUILD");
    assert_eq!(created["port"], 80);
    assert_eq!(created["cluster"]["name"], "test-cluster");
    assert!(created.get("nodes").is_none());
    let id = created["id"].as_u64().unwrap();
    let lb_url = format!("{}/v1.0/tenant-1/loadbalancers/{}", base, id);

    // Mutations are refused until the build hold elapses.
    let response = client.delete(&lb_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    clock.advance_secs(2);
    let fetched: Value = client.get(&lb_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(fetched["loadBalancer"]["status"], "ACTIVE");

    let listed: Value = client
        .get(format!("{}/v1.0/tenant-1/loadbalancers", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["loadBalancers"].as_array().map(Vec::len), Some(1));

    let response = client.delete(&lb_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let response = client.get(&lb_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let fault: Value = response.json().await.unwrap();
    assert_eq!(fault["code"], 404);

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_node_lifecycle_over_http() {
    let (handle, _) = start().await;
    let base = handle.base_url();
    let client = reqwest::Client::new();

    let created = create(
        &client,
        &base,
        json!({"loadBalancer": {"name": "web", "protocol": "HTTP", "port": 8080}}),
    )
    .await;
    assert_eq!(created["port"], 8080);
    let nodes_url = format!(
        "{}/v1.0/tenant-1/loadbalancers/{}/nodes",
        base,
        created["id"].as_u64().unwrap()
    );

    let response = client
        .post(&nodes_url)
        .json(&json!({"nodes": [
            {"address": "10.1.1.1", "port": 80, "condition": "ENABLED"},
            {"address": "10.1.1.2", "port": 80, "condition": "DISABLED", "weight": 5}
        ]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let added: Value = response.json().await.unwrap();
    assert_eq!(added["nodes"][0]["status"], "ONLINE");
    assert_eq!(added["nodes"][1]["weight"], 5);

    let listed: Value = client.get(&nodes_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed, added);

    let node_id = added["nodes"][0]["id"].as_u64().unwrap();
    let response = client
        .delete(format!("{}/{}", nodes_url, node_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let listed: Value = client.get(&nodes_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed["nodes"].as_array().map(Vec::len), Some(1));

    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_presets_route() {
    let (handle, _) = start().await;
    let client = reqwest::Client::new();

    let presets: Value = client
        .get(format!("{}/presets", handle.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(presets["loadbalancers"]["failing_lb_id"], "175647");
    assert!(presets["loadbalancers"]["lb_pending_delete"].is_string());

    handle.stop().await.unwrap();
}
