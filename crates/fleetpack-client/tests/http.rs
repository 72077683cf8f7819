use mockito::{Matcher, Server};
use serde_json::json;

use fleetpack_api::{App, Labels, Spec};
use fleetpack_client::{ClientError, HttpClient};

fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[tokio::test]
async fn test_list_packets() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/packet/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "nginx": [
                    { "name": "nginx", "labels": { "arch": "arm64" }, "hash": "a".repeat(32) }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let listing = client.list_packets().await.unwrap();

    mock.assert_async().await;
    assert_eq!(listing["nginx"].len(), 1);
    assert_eq!(listing["nginx"][0].labels["arch"], "arm64");
}

#[tokio::test]
async fn test_token_is_sent() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/spec/")
        .match_header("authorization", "Bearer s3cret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap().with_token("s3cret");
    let specs = client.list_specs().await.unwrap();

    mock.assert_async().await;
    assert!(specs.is_empty());
}

#[tokio::test]
async fn test_upload_packet_sends_raw_bytes() {
    let mut server = Server::new_async().await;
    let hash = "b".repeat(32);
    let mock = server
        .mock("POST", "/packet/")
        .match_header("content-type", "application/octet-stream")
        .match_body(Matcher::Exact("not-really-a-packet".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": "web", "labels": {}, "hash": hash }).to_string())
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let info = client
        .upload_packet(b"not-really-a-packet".to_vec())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(info.name, "web");
    assert_eq!(info.hash, hash);
}

#[tokio::test]
async fn test_compute_desired_state() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/packet/compute")
        .match_body(Matcher::Json(json!({ "arch": "arm64" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "apps": [{ "name": "web", "labels": { "arch": "arm64" }, "hash": "c".repeat(32) }],
                "errors": [{ "app": "db", "labels": { "arch": "arm64" }, "message": "no packet found" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let state = client
        .compute_desired_state(&labels(&[("arch", "arm64")]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(state.apps.len(), 1);
    assert!(state.is_partial());
    assert!(state.unresolved_names().contains("db"));
}

#[tokio::test]
async fn test_packet_data_returns_bytes() {
    let mut server = Server::new_async().await;
    let hash = "d".repeat(32);
    let body: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];
    let mock = server
        .mock("GET", format!("/packet/{hash}/data").as_str())
        .with_status(200)
        .with_header("content-type", "application/octet-stream")
        .with_body(body)
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let data = client.packet_data(&hash).await.unwrap();

    mock.assert_async().await;
    assert_eq!(data.as_slice(), body);
}

#[tokio::test]
async fn test_not_found_maps_to_api_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/spec/missing")
        .with_status(404)
        .with_body(r#"{"error":"spec not found: missing","code":"NOT_FOUND"}"#)
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let err = client.get_spec("missing").await.unwrap_err();

    mock.assert_async().await;
    assert!(err.is_not_found());
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("spec not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_update_and_delete_spec() {
    let mut server = Server::new_async().await;
    let spec = Spec::new("edge")
        .with_target("site", "lab")
        .with_app(App::new("web"));
    let update = server
        .mock("PUT", "/spec/edge")
        .match_body(Matcher::Json(serde_json::to_value(&spec).unwrap()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&spec).unwrap())
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/spec/edge")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&spec).unwrap())
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let updated = client.update_spec("edge", &spec).await.unwrap();
    client.delete_spec("edge").await.unwrap();

    update.assert_async().await;
    delete.assert_async().await;
    assert_eq!(updated, spec);
}

#[tokio::test]
async fn test_server_error_is_not_not_found() {
    let mut server = Server::new_async().await;
    let hash = "e".repeat(32);
    server
        .mock("DELETE", format!("/packet/{hash}").as_str())
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = HttpClient::new(server.url()).unwrap();
    let err = client.delete_packet(&hash).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
}
