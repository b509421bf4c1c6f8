//! Full passes against mock IP and Dreamhost endpoints.

use dh_ddns_updater::{DdnsError, DomainConfig, DreamhostProvider, IpDetector, Reconciler, State};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IP: &str = "203.0.113.42";

fn ok(data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(format!(
        r#"{{"result":"success","data":"{}"}}"#,
        data
    ))
}

fn list(records: &[(&str, &str, &str)]) -> ResponseTemplate {
    let data: Vec<_> = records
        .iter()
        .map(|(record, record_type, value)| {
            serde_json::json!({
                "account_id": "1",
                "zone": "example.com",
                "record": record,
                "type": record_type,
                "value": value,
                "comment": "",
                "editable": "1"
            })
        })
        .collect();

    ResponseTemplate::new(200)
        .set_body_json(serde_json::json!({"result": "success", "data": data}))
}

async fn ip_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", IP)))
        .mount(&server)
        .await;
    server
}

fn reconciler(ip: &MockServer, api: &MockServer, state_path: &Path) -> Reconciler {
    let timeout = Duration::from_secs(5);
    let resolver = IpDetector::new(format!("{}/ip", ip.uri()), timeout).unwrap();
    let provider =
        DreamhostProvider::new("test-key".to_string(), format!("{}/", api.uri()), timeout)
            .unwrap();

    Reconciler::new(
        Box::new(resolver),
        Box::new(provider),
        vec![DomainConfig::new("example.com", "home", "A")],
        state_path.to_path_buf(),
    )
}

#[tokio::test]
async fn test_missing_record_is_created() {
    let ip = ip_server().await;
    let api = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .and(query_param("key", "test-key"))
        .respond_with(list(&[("example.com", "A", "198.51.100.7")]))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-remove_record"))
        .and(query_param("record", "home.example.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"result":"error","data":"no_such_record"}"#),
        )
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-add_record"))
        .and(query_param("record", "home.example.com"))
        .and(query_param("type", "A"))
        .and(query_param("value", IP))
        .respond_with(ok("record_added"))
        .expect(1)
        .mount(&api)
        .await;

    let mut state = State::load(&state_path).unwrap();
    let report = reconciler(&ip, &api, &state_path)
        .run_once(&CancellationToken::new(), &mut state)
        .await
        .unwrap();

    assert_eq!(report.updated, vec!["home.example.com".to_string()]);
    assert_eq!(state.records["home.example.com"], IP);
    assert_eq!(state.last_public_ip, IP);

    let persisted = State::load(&state_path).unwrap();
    assert_eq!(persisted.records["home.example.com"], IP);
    assert_eq!(persisted.last_public_ip, IP);
    assert!(persisted.last_updated.is_some());
}

#[tokio::test]
async fn test_current_record_needs_no_writes() {
    let ip = ip_server().await;
    let api = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .respond_with(list(&[("home.example.com", "A", IP)]))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-remove_record"))
        .respond_with(ok("record_removed"))
        .expect(0)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-add_record"))
        .respond_with(ok("record_added"))
        .expect(0)
        .mount(&api)
        .await;

    let mut state = State::default();
    state
        .records
        .insert("home.example.com".to_string(), IP.to_string());
    state.last_public_ip = IP.to_string();
    let before = state.clone();

    reconciler(&ip, &api, &state_path)
        .run_once(&CancellationToken::new(), &mut state)
        .await
        .unwrap();

    assert_eq!(state, before);
    assert_eq!(State::load(&state_path).unwrap(), before);
}

#[tokio::test]
async fn test_second_pass_is_read_only() {
    let ip = ip_server().await;
    let api = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    // The first listing predates the update; later ones see it.
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .respond_with(list(&[]))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .respond_with(list(&[("home.example.com", "A", IP)]))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-remove_record"))
        .respond_with(ok("record_removed"))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-add_record"))
        .respond_with(ok("record_added"))
        .expect(1)
        .mount(&api)
        .await;

    let reconciler = reconciler(&ip, &api, &state_path);
    let cancel = CancellationToken::new();
    let mut state = State::default();

    let first = reconciler.run_once(&cancel, &mut state).await.unwrap();
    let second = reconciler.run_once(&cancel, &mut state).await.unwrap();

    assert_eq!(first.updated.len(), 1);
    assert!(second.updated.is_empty());
    assert_eq!(second.unchanged, vec!["home.example.com".to_string()]);
}

#[tokio::test]
async fn test_add_failure_leaves_state_file_alone() {
    let ip = ip_server().await;
    let api = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .respond_with(list(&[]))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-remove_record"))
        .respond_with(ok("record_removed"))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-add_record"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&api)
        .await;

    let mut state = State::load(&state_path).unwrap();
    let before = std::fs::read_to_string(&state_path).unwrap();

    let err = reconciler(&ip, &api, &state_path)
        .run_once(&CancellationToken::new(), &mut state)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "failed to update 1 records");
    assert_eq!(std::fs::read_to_string(&state_path).unwrap(), before);
    assert!(state.last_public_ip.is_empty());
}

#[tokio::test]
async fn test_cancel_during_slow_lookup_writes_nothing() {
    let ip = ip_server().await;
    let api = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    // Outlives both the cancel and the client timeout.
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-list_records"))
        .respond_with(list(&[]).set_delay(Duration::from_secs(30)))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(query_param("cmd", "dns-add_record"))
        .respond_with(ok("record_added"))
        .expect(0)
        .mount(&api)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let mut state = State::default();
    let reconciler = reconciler(&ip, &api, &state_path);
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        reconciler.run_once(&cancel, &mut state),
    )
    .await
    .expect("pass did not stop on cancel");

    assert!(matches!(result, Err(DdnsError::Cancelled)));
    assert_eq!(state, State::default());
    assert!(!state_path.exists());
}
