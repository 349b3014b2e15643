mod harness;

use canopy_core::DefaultPolicy;
use futures_util::future::join_all;
use harness::config::ConfigBuilder;
use harness::server::TestServer;

const CALC: &str = "http://127.0.0.1:9/mcp";

async fn calculator_server(policy: DefaultPolicy) -> TestServer {
    let config = ConfigBuilder::new()
        .with_client("cursor", policy)
        .with_server("1", "calculator", CALC, &["add", "subtract"])
        .build();

    TestServer::start(config).await.unwrap()
}

#[tokio::test]
async fn builtin_clients_are_listed_in_catalogue_order() {
    let server = TestServer::start(ConfigBuilder::new().build()).await.unwrap();

    let json = server.get_json("/api/v0/clients").await;
    let names: Vec<_> = json["clients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_owned())
        .collect();

    assert_eq!(names.len(), 7);
    assert_eq!(names[0], "claude");
    assert_eq!(json["clients"][0]["display_name"], "Claude Desktop");
}

#[tokio::test]
async fn servers_start_disabled_under_default_policy() {
    let server = calculator_server(DefaultPolicy::Disabled).await;

    let json = server.get_json("/api/v0/clients/cursor/servers").await;
    assert_eq!(json["servers"], serde_json::json!([]));
}

#[tokio::test]
async fn enabled_policy_exposes_server_and_all_tools() {
    let server = calculator_server(DefaultPolicy::Enabled).await;

    let json = server.get_json("/api/v0/clients/cursor/servers").await;
    assert_eq!(json["servers"][0]["id"], "1");

    let json = server.get_json("/api/v0/clients/cursor/servers/1/tools").await;
    assert_eq!(json["tools"], serde_json::json!(["add", "subtract"]));
}

#[tokio::test]
async fn toggling_server_flips_and_reports_new_state() {
    let server = calculator_server(DefaultPolicy::Disabled).await;

    let resp = server.post("/api/v0/clients/cursor/servers/1/toggle").await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["enabled"], true);
    assert_eq!(json["server_id"], "1");
    assert!(json.get("tool").is_none());

    let json = server.get_json("/api/v0/clients/cursor/servers").await;
    assert_eq!(json["servers"].as_array().unwrap().len(), 1);

    let resp = server.post("/api/v0/clients/cursor/servers/1/toggle").await;
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["enabled"], false);
}

#[tokio::test]
async fn toggling_tool_hides_it_from_enabled_tools() {
    let server = calculator_server(DefaultPolicy::Enabled).await;

    let resp = server.post("/api/v0/clients/cursor/servers/1/tools/add/toggle").await;
    assert_eq!(resp.status(), 200);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["tool"], "add");
    assert_eq!(json["enabled"], false);

    let json = server.get_json("/api/v0/clients/cursor/servers/1/tools").await;
    assert_eq!(json["tools"], serde_json::json!(["subtract"]));
}

#[tokio::test]
async fn disabled_server_hides_every_tool() {
    let server = calculator_server(DefaultPolicy::Disabled).await;

    let json = server.get_json("/api/v0/clients/cursor/servers/1/tools").await;
    assert_eq!(json["tools"], serde_json::json!([]));
}

#[tokio::test]
async fn unknown_client_is_not_found() {
    let server = calculator_server(DefaultPolicy::Enabled).await;

    let resp = server.post("/api/v0/clients/nobody/servers/1/toggle").await;
    assert_eq!(resp.status(), 404);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["error"]["type"], "not_found");
    assert_eq!(json["error"]["message"], "client not found: nobody");
}

#[tokio::test]
async fn undeclared_tool_is_not_found() {
    let server = calculator_server(DefaultPolicy::Enabled).await;

    let resp = server.post("/api/v0/clients/cursor/servers/1/tools/divide/toggle").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn matrix_snapshot_reflects_toggles() {
    let config = ConfigBuilder::new()
        .with_client("cursor", DefaultPolicy::Disabled)
        .with_client("cline", DefaultPolicy::Enabled)
        .with_server("1", "calculator", CALC, &["add"])
        .with_server("2", "weather", "http://127.0.0.1:9/weather", &[])
        .build();
    let server = TestServer::start(config).await.unwrap();

    server.post("/api/v0/clients/cursor/servers/2/toggle").await;
    server.post("/api/v0/clients/cline/servers/1/tools/add/toggle").await;

    let json = server.get_json("/api/v0/client-server-matrix").await;
    assert_eq!(
        json["servers"],
        serde_json::json!({
            "cursor": {"1": false, "2": true},
            "cline": {"1": true, "2": true},
        })
    );
    assert_eq!(json["tools"]["cursor"]["1"]["add"], false);
    assert_eq!(json["tools"]["cline"]["1"]["add"], false);
}

#[tokio::test]
async fn concurrent_toggles_keep_parity() {
    let server = calculator_server(DefaultPolicy::Disabled).await;

    let requests = (0..10).map(|_| server.post("/api/v0/clients/cursor/servers/1/toggle"));
    for resp in join_all(requests).await {
        assert_eq!(resp.status(), 200);
    }

    let json = server.get_json("/api/v0/client-server-matrix").await;
    assert_eq!(json["servers"]["cursor"]["1"], false);
}
