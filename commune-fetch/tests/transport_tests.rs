//! Integration tests for the reqwest transport through the client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use commune_core::FormField;
use commune_fetch::{
    ClientListener, CommunityClient, RequestError, RequestOptions, ReqwestTransport,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct ExpiryCounter(AtomicUsize);

impl ClientListener for ExpiryCounter {
    fn on_session_expired(&self, _error: &RequestError) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn client() -> (CommunityClient, Arc<ReqwestTransport>) {
    let transport = Arc::new(ReqwestTransport::new().expect("Failed to build transport"));
    (CommunityClient::new(transport.clone()), transport)
}

#[tokio::test]
async fn test_get_sends_no_origin() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/"))
        .and(query_param("l", "english"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>market</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let response = client
        .get(
            &format!("{}/market/", mock_server.uri()),
            RequestOptions::new().query("l", "english"),
            Some("market"),
        )
        .await
        .unwrap();

    assert_eq!(response.text(), Some("<html>market</html>"));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("origin").is_none());
}

#[tokio::test]
async fn test_post_sends_origin_and_form() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a/b"))
        .and(header("origin", mock_server.uri().as_str()))
        .and(body_string_contains("sessionid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let response = client
        .post(
            &format!("{}/a/b", mock_server.uri()),
            RequestOptions::new().form_field("sessionid", "abc").json(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(response.json(), Some(&json!({"success": 1})));
}

#[tokio::test]
async fn test_multipart_keeps_file_details() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    client
        .post(
            &format!("{}/upload", mock_server.uri()),
            RequestOptions::new()
                .multipart_field("file", FormField::file(b"hello".to_vec(), "a.txt", "text/plain"))
                .multipart_field("sessionid", "abc"),
            None,
        )
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body).to_lowercase();
    assert!(body.contains(r#"name="file"; filename="a.txt""#));
    assert!(body.contains("content-type: text/plain"));
    assert!(body.contains("hello"));
    assert!(body.contains(r#"name="sessionid""#));
}

#[tokio::test]
async fn test_login_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/my/inventory"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login?redir=x"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let counter = Arc::new(ExpiryCounter::default());
    client.add_listener(counter.clone());

    let failure = client
        .get(
            &format!("{}/my/inventory", mock_server.uri()),
            RequestOptions::new().follow_redirect(false),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error, RequestError::NotLoggedIn);
    assert_eq!(failure.response.map(|r| r.status), Some(302));
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_redirects_followed_by_default() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;
    Mock::given(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let response = client
        .get(&format!("{}/old", mock_server.uri()), RequestOptions::new(), None)
        .await
        .unwrap();

    assert_eq!(response.url.path(), "/new");
    assert_eq!(response.text(), Some("moved"));
}

#[tokio::test]
async fn test_seeded_cookies_are_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("cookie", "sessionid=abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, transport) = client();
    let url = Url::parse(&mock_server.uri()).unwrap();
    transport.set_cookies(["sessionid=abc"], &url);

    client
        .get(&format!("{}/", mock_server.uri()), RequestOptions::new(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_json_body_is_malformed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let failure = client
        .get(&format!("{}/api", mock_server.uri()), RequestOptions::new().json(), None)
        .await
        .unwrap_err();

    assert_eq!(failure.error, RequestError::MalformedResponse);
}

#[tokio::test]
async fn test_http_error_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&mock_server)
        .await;

    let (client, _) = client();
    let failure = client
        .get(&format!("{}/", mock_server.uri()), RequestOptions::new(), None)
        .await
        .unwrap_err();

    assert_eq!(failure.error, RequestError::Http { status: 503 });
    assert_eq!(failure.error.status_code(), Some(503));
    assert_eq!(failure.response.and_then(|r| r.text().map(String::from)), Some("busy".into()));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let (client, _) = client();
    let failure = client
        .get("http://127.0.0.1:1/", RequestOptions::new(), None)
        .await
        .unwrap_err();

    assert!(failure.error.is_transport());
    assert!(failure.response.is_none());
}
