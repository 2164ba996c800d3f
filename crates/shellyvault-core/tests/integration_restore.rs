#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use shellyvault_core::BackupCoordinator;
use std::fs;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICE_ID: &str = "shellyplus1-a8032ab12345";

fn device_info_body() -> serde_json::Value {
    serde_json::json!({
        "id": DEVICE_ID,
        "name": "bench",
        "gen": 2,
        "model": "SNSW-001X16EU",
        "auth_en": false
    })
}

async fn mount_probe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rpc/Shelly.GetDeviceInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_info_body()))
        .mount(server)
        .await;
}

/// Seed the snapshot store the way a completed sweep would.
fn seed_script_snapshot(base: &std::path::Path, file_name: &str, code: &str) {
    let dir = base.join(DEVICE_ID);
    fs::create_dir_all(&dir).expect("device dir");
    fs::write(dir.join(file_name), code).expect("seed code");
}

#[tokio::test]
async fn test_backup_then_restore_round_trips_exact_bytes() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("GET"))
        .and(path("/rpc/Shelly.GetConfig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sys": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rpc/Script.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scripts": [{"id": 1, "name": "a", "enable": true}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rpc/Script.GetCode"))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": "let t = Timer.set(1000, true, fn);"
        })))
        .mount(&server)
        .await;
    // The upload must carry exactly the bytes previously read from the device.
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .and(body_json(serde_json::json!({
            "id": 1,
            "code": "let t = Timer.set(1000, true, fn);"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"len": 34})))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.backup_all().await.expect("sweep");
    coordinator.restore_script(1, None).await.expect("restore");
}

#[tokio::test]
async fn test_restore_missing_snapshot_is_a_no_op() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_script(9, None).await.expect("missing snapshot is not an error");
}

#[tokio::test]
async fn test_restore_uses_explicit_path_verbatim() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .and(body_json(serde_json::json!({"id": 4, "code": "print(\"x\");"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let file = tmp.path().join("handpicked.js");
    fs::write(&file, "print(\"x\");").expect("seed file");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_script(4, Some(file)).await.expect("restore from explicit path");
}

#[tokio::test]
async fn test_restore_picks_lexically_smallest_on_duplicate_ids() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .and(body_json(serde_json::json!({"id": 7, "code": "alpha"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");
    seed_script_snapshot(tmp.path(), "7_zeta.js", "zeta");
    seed_script_snapshot(tmp.path(), "7_alpha.js", "alpha");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_script(7, None).await.expect("restore");
}

#[tokio::test]
async fn test_restore_upload_failure_propagates() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .respond_with(ResponseTemplate::new(500).set_body_string("flash error"))
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");
    seed_script_snapshot(tmp.path(), "1_a.js", "print(1)");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_script(1, None).await.expect_err("upload failure propagates");
}

#[tokio::test]
async fn test_restore_offline_device_does_not_upload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rpc/Shelly.GetDeviceInfo"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc/Script.PutCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");
    seed_script_snapshot(tmp.path(), "1_a.js", "print(1)");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_script(1, None).await.expect("offline restore returns quietly");
    assert!(!coordinator.state().is_available);
}

#[tokio::test]
async fn test_restore_config_extracts_config_sub_object() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    let remote_config = serde_json::json!({"sys": {"device": {"name": "bench"}}});
    Mock::given(method("POST"))
        .and(path("/rpc/Shelly.SetConfig"))
        .and(body_json(remote_config.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path().join(DEVICE_ID);
    fs::create_dir_all(&dir).expect("device dir");
    fs::write(
        dir.join("device_config.json"),
        serde_json::to_string_pretty(&serde_json::json!({
            "device_id": DEVICE_ID,
            "device_name": "bench",
            "config": remote_config,
            "backup_time": "2026-08-01T12:00:00Z"
        }))
        .expect("serialize"),
    )
    .expect("seed config");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_config(None).await.expect("restore config");
}

#[tokio::test]
async fn test_restore_config_missing_snapshot_is_a_no_op() {
    let server = MockServer::start().await;
    mount_probe(&server).await;
    Mock::given(method("POST"))
        .and(path("/rpc/Shelly.SetConfig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let tmp = tempfile::tempdir().expect("tempdir");

    let coordinator = BackupCoordinator::new(server.uri(), None, tmp.path());
    coordinator.restore_config(None).await.expect("missing snapshot is not an error");
}
