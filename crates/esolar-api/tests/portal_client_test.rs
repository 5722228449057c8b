#![allow(clippy::unwrap_used)]
// Integration tests for `PortalClient` using wiremock.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use esolar_api::{
    ChartWindow, Credentials, DeviceScope, Error, PortalClient, Provider, Scheme, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PortalClient) {
    let server = MockServer::start().await;
    let provider = Provider::new(server.address().to_string(), "saj", Scheme::Http, true);
    let client = PortalClient::new(
        provider,
        Credentials::new("owner@example.com", "hunter2"),
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

fn window() -> ChartWindow {
    let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    ChartWindow::new(today, now)
}

async fn mount_login(server: &MockServer, status: u16) {
    let mut template = ResponseTemplate::new(status);
    if status == 302 || status == 303 {
        template = template
            .insert_header("Location", "/saj/monitor/home/index")
            .insert_header("Set-Cookie", "JSESSIONID=abc123; Path=/saj");
    }
    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Serve the portal login over TLS with a self-signed certificate for
/// 127.0.0.1. Every connection that completes the handshake gets a login
/// redirect.
fn spawn_self_signed_portal() -> SocketAddr {
    let certs = CertificateDer::pem_slice_iter(include_bytes!("fixtures/self_signed.crt"))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_slice(include_bytes!("fixtures/self_signed.key")).unwrap();
    let config = Arc::new(
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let conn = ServerConnection::new(Arc::clone(&config)).unwrap();
            let mut tls = StreamOwned::new(conn, stream);
            let mut request = [0u8; 4096];
            // A client that rejects the certificate aborts the handshake here.
            if tls.read(&mut request).is_err() {
                continue;
            }
            let _ = tls.write_all(
                b"HTTP/1.1 302 Found\r\n\
                  Location: /saj/monitor/home/index\r\n\
                  Content-Length: 0\r\n\
                  Connection: close\r\n\r\n",
            );
            tls.conn.send_close_notify();
            let _ = tls.flush();
        }
    });
    addr
}

fn tls_client(addr: SocketAddr, verify_tls: bool) -> PortalClient {
    let provider = Provider::new(addr.to_string(), "saj", Scheme::Https, verify_tls);
    PortalClient::new(
        provider,
        Credentials::new("owner@example.com", "hunter2"),
        &TransportConfig::default(),
    )
    .unwrap()
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_redirect_is_success() {
    let (server, client) = setup().await;
    mount_login(&server, 302).await;

    client.login().await.unwrap();
    assert!(client.is_authenticated());

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("lang=en"));
    assert!(body.contains("username=owner%40example.com"));
    assert!(body.contains("password=hunter2"));
    assert!(body.contains("rememberMe=true"));
}

#[tokio::test]
async fn test_login_see_other_is_success() {
    let (server, client) = setup().await;
    mount_login(&server, 303).await;

    client.login().await.unwrap();
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_login_page_rerendered_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(
        matches!(&result, Err(Error::Authentication { message }) if message == "invalid credentials"),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_login_forbidden_is_auth_error() {
    let (server, client) = setup().await;
    mount_login(&server, 403).await;

    let err = client.login().await.unwrap_err();
    assert!(err.is_auth_failure());
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_login_redirect_without_location_is_unknown() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let result = client.login().await;
    assert!(
        matches!(result, Err(Error::UnknownAuthentication { status: 302 })),
        "expected UnknownAuthentication, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_server_error_is_unknown() {
    let (server, client) = setup().await;
    mount_login(&server, 500).await;

    let result = client.login().await;
    assert!(matches!(result, Err(Error::UnknownAuthentication { status: 500 })));
}

#[tokio::test]
async fn test_ensure_authenticated_reuses_session() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/saj/monitor/home/index"),
        )
        .expect(1)
        .mount(&server)
        .await;

    client.ensure_authenticated().await.unwrap();
    client.ensure_authenticated().await.unwrap();
    client.ensure_authenticated().await.unwrap();
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn test_invalidate_forces_relogin() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/saj/monitor/home/index"),
        )
        .expect(2)
        .mount(&server)
        .await;

    client.ensure_authenticated().await.unwrap();
    client.invalidate();
    assert!(!client.is_authenticated());
    client.ensure_authenticated().await.unwrap();
}

#[tokio::test]
async fn test_session_cookie_is_sent_on_data_calls() {
    let (server, client) = setup().await;
    mount_login(&server, 302).await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getUserPlantList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plantList": [] })))
        .mount(&server)
        .await;

    client.login().await.unwrap();
    client.get_user_plant_list(&window()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let cookie = requests[1]
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_owned();
    assert!(cookie.contains("JSESSIONID=abc123"), "cookie header: {cookie}");
    assert!(client.cookie_header().unwrap().contains("JSESSIONID=abc123"));
}

#[tokio::test]
async fn test_reset_drops_cookies() {
    let (server, mut client) = setup().await;
    mount_login(&server, 302).await;

    client.login().await.unwrap();
    assert!(client.cookie_header().unwrap().contains("JSESSIONID"));

    client.reset().unwrap();
    assert!(!client.is_authenticated());
    let after = client.cookie_header().unwrap_or_default();
    assert!(!after.contains("JSESSIONID"), "cookie header: {after}");
}

// ── Endpoint tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_plant_list_form() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getUserPlantList"))
        .and(body_string_contains("clientDate=2024-06-15"))
        .and(body_string_contains("selectInputType=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plantList": [{ "plantuid": "P-1", "plantname": "Roof" }]
        })))
        .mount(&server)
        .await;

    let doc = client.get_user_plant_list(&window()).await.unwrap();
    assert_eq!(doc["plantList"][0]["plantuid"], "P-1");
}

#[tokio::test]
async fn test_plant_chart_query() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getPlantDetailChart2"))
        .and(query_param("plantuid", "P-1"))
        .and(query_param("deviceSnArr", "SN-INV"))
        .and(query_param("chartDateType", "1"))
        .and(query_param("chartCountType", "2"))
        .and(query_param("previousChartMonth", "2024-05"))
        .and(query_param("elecDevicesn", "SN-INV"))
        .and(query_param("_", "1718452800000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "viewBean": {} })))
        .mount(&server)
        .await;

    let doc = client
        .get_plant_detail_chart("P-1", "SN-INV", "SN-INV", &window())
        .await
        .unwrap();
    assert!(doc.get("viewBean").is_some());
}

#[tokio::test]
async fn test_store_power_sends_empty_plantuid() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getStoreOrAcDevicePowerInfo"))
        .and(query_param("plantuid", ""))
        .and(query_param("devicesn", "SN-BAT"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "storeDevicePower": {} })),
        )
        .mount(&server)
        .await;

    client
        .get_store_device_power("SN-BAT", &window())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_device_list_scopes() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/cloudMonitor/device/findDevicePageList"))
        .and(body_string_contains("officeId=1"))
        .and(body_string_contains("localMonth=2024-06"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "scope": "month" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/saj/cloudMonitor/device/findDevicePageList"))
        .and(body_string_contains("officeId=&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "scope": "plant" })))
        .mount(&server)
        .await;

    let plant = client
        .find_device_page_list("P-1", DeviceScope::Plant)
        .await
        .unwrap();
    assert_eq!(plant["scope"], "plant");

    let month = client
        .find_device_page_list("P-1", DeviceScope::Month("2024-06"))
        .await
        .unwrap();
    assert_eq!(month["scope"], "month");
}

#[tokio::test]
async fn test_energy_preview_is_get() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/saj/monitor/site/getPlantMeterEnergyPreviewInfo"))
        .and(query_param("moduleSn", "M-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let doc = client
        .get_plant_meter_energy_preview("P-1", "M-1", &window())
        .await
        .unwrap();
    assert_eq!(doc["ok"], true);
}

#[tokio::test]
async fn test_module_list_uses_lowercase_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/cloudmonitor/plantMeterModule/getPlantMeterModuleList"))
        .and(body_string_contains("plantUid=P-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "moduleList": [{ "moduleSn": "M-1" }]
        })))
        .mount(&server)
        .await;

    let doc = client.get_plant_meter_module_list("P-1").await.unwrap();
    assert_eq!(doc["moduleList"][0]["moduleSn"], "M-1");
}

// ── Error handling tests ────────────────────────────────────────────

#[tokio::test]
async fn test_endpoint_status_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getPlantDetailInfo"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.get_plant_detail_info("P-1", &window()).await;
    assert!(
        matches!(
            result,
            Err(Error::Status {
                endpoint: "getPlantDetailInfo",
                status: 500
            })
        ),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_redirect_on_data_call_is_session_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getUserPlantList"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/saj/login"))
        .mount(&server)
        .await;

    let err = client.get_user_plant_list(&window()).await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired { status: 302, .. }));
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_malformed_json() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/saj/monitor/site/getUserPlantList"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.get_user_plant_list(&window()).await;
    match result {
        Err(Error::Deserialization { endpoint, body, .. }) => {
            assert_eq!(endpoint, "getUserPlantList");
            assert_eq!(body, "<html>oops</html>");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    let provider = Provider::new(server.address().to_string(), "saj", Scheme::Http, true);
    let transport = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = PortalClient::new(provider, Credentials::new("u", "p"), &transport).unwrap();

    Mock::given(method("POST"))
        .and(path("/saj/login"))
        .respond_with(ResponseTemplate::new(302).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got: {err:?}");
    assert!(err.is_transport());
    assert!(!err.is_auth_failure());
}

#[tokio::test]
async fn test_tls_failure_is_never_auth_error() {
    let server = MockServer::start().await;
    // Speak TLS to a plain-HTTP listener: the handshake fails before any
    // HTTP status exists.
    let provider = Provider::new(server.address().to_string(), "saj", Scheme::Https, true);
    let client = PortalClient::new(
        provider,
        Credentials::new("u", "p"),
        &TransportConfig::default(),
    )
    .unwrap();

    let err = client.login().await.unwrap_err();
    assert!(err.is_transport(), "got: {err:?}");
    assert!(!err.is_auth_failure());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_untrusted_certificate_is_certificate_error() {
    let addr = spawn_self_signed_portal();
    let client = tls_client(addr, true);

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Tls(_)), "got: {err:?}");
    assert!(err.is_certificate_error(), "got: {err}");
    assert!(err.is_transport());
    assert!(!err.is_auth_failure());
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_unverified_tls_reaches_login() {
    let addr = spawn_self_signed_portal();
    let client = tls_client(addr, false);

    client.login().await.unwrap();
    assert!(client.is_authenticated());
}
