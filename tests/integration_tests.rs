//! Integration tests using wiremock to simulate a broker's management API.

use semp_client::{Client, ClientBuilder, Error, TransportRetryPolicy};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_PATH: &str = "/SEMP/v2/config";

/// A client with tiny waits so retry tests run fast.
fn fast_client(mock_server: &MockServer) -> ClientBuilder {
    Client::builder()
        .base_url(format!("{}{}", mock_server.uri(), BASE_PATH))
        .unwrap()
        .basic_auth("admin", "admin")
        .retries(3, Duration::from_millis(1), Duration::from_millis(5))
        .transport_retry(TransportRetryPolicy::new(6, Duration::from_millis(1)))
}

fn semp_path(suffix: &str) -> String {
    format!("{}{}", BASE_PATH, suffix)
}

#[tokio::test]
async fn test_get_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"msgVpnName": "default", "enabled": true},
            "meta": {"responseCode": 200}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let vpn = client.get("/msgVpns/default").await.unwrap().unwrap();

    assert_eq!(vpn["msgVpnName"], json!("default"));
    assert_eq!(vpn["enabled"], json!(true));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(semp_path("/msgVpns/default/queues")))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"queueName": "orders"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"queueName": "orders", "msgVpnName": "default"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let queue = client
        .post("/msgVpns/default/queues", &json!({"queueName": "orders"}))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(queue["queueName"], json!("orders"));
}

#[tokio::test]
async fn test_delete_returns_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(semp_path("/msgVpns/default/queues/orders")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"meta": {"responseCode": 200}})),
        )
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client.delete("/msgVpns/default/queues/orders").await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_not_found_is_distinguished() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/missing")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {
                "responseCode": 404,
                "error": {"description": "Could not find match for msgVpnName missing", "status": "NOT_FOUND"}
            }
        })))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client.get("/msgVpns/missing").await;

    match result {
        Err(Error::NotFound {
            description, url, ..
        }) => {
            assert_eq!(description, "Could not find match for msgVpnName missing");
            assert!(url.ends_with("/SEMP/v2/config/msgVpns/missing"));
        }
        _ => panic!("Expected NotFound, got {:?}", result),
    }
}

#[tokio::test]
async fn test_bad_request_body_is_parsed_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(semp_path("/msgVpns/default")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": {
                "responseCode": 400,
                "error": {"description": "Invalid attribute maxConnectionCount", "status": "INVALID_PARAMETER"}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client
        .put("/msgVpns/default", &json!({"maxConnectionCount": -1}))
        .await;

    match result {
        Err(Error::RequestFailed {
            description,
            status,
            ..
        }) => {
            assert_eq!(description, "Invalid attribute maxConnectionCount");
            assert_eq!(status, "INVALID_PARAMETER");
        }
        _ => panic!("Expected RequestFailed, got {:?}", result),
    }
}

#[tokio::test]
async fn test_unexpected_status_fails_immediately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client.get("/msgVpns").await;

    match result {
        Err(Error::UnexpectedStatus {
            status,
            raw_response,
            method,
            ..
        }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(raw_response, "Unauthorized");
            assert_eq!(method, http::Method::GET);
        }
        _ => panic!("Expected UnexpectedStatus, got {:?}", result),
    }
}

#[tokio::test]
async fn test_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/about/api")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client.get("/about/api").await;

    match result {
        Err(Error::MalformedResponse { raw_response, .. }) => {
            assert_eq!(raw_response, "<html>proxy login</html>");
        }
        _ => panic!("Expected MalformedResponse, got {:?}", result),
    }
}

#[tokio::test]
async fn test_transport_retries_transient_statuses() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 503, third succeeds
    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default")))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("Service unavailable")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"data": {"msgVpnName": "default"}}))
            }
        })
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let vpn = client.get("/msgVpns/default").await.unwrap().unwrap();

    assert_eq!(vpn["msgVpnName"], json!("default"));
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_transport_gives_up_at_ceiling() {
    let mock_server = MockServer::start().await;

    // The first attempt plus six retries.
    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway"))
        .expect(7)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let result = client.get("/msgVpns").await;

    match result {
        Err(Error::UnexpectedStatus {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(raw_response, "Bad gateway");
        }
        _ => panic!("Expected UnexpectedStatus, got {:?}", result),
    }
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default")))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429).set_body_string("slow down")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"data": {"msgVpnName": "default"}}))
            }
        })
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let vpn = client.get("/msgVpns/default").await.unwrap().unwrap();

    assert_eq!(vpn["msgVpnName"], json!("default"));
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_attempts_never_exceed_retries_plus_one() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server)
        .retries(2, Duration::from_millis(1), Duration::from_millis(2))
        .build()
        .unwrap();
    let result = client.get("/msgVpns").await;

    match result {
        Err(Error::RetriesExhausted {
            attempts,
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(status.as_u16(), 429);
            assert_eq!(raw_response, "slow down");
        }
        _ => panic!("Expected RetriesExhausted, got {:?}", result),
    }
}

#[tokio::test]
async fn test_rate_limit_wait_grows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&mock_server)
        .await;

    // Waits of 40ms, 80ms and 100ms (capped) between the four attempts.
    let client = fast_client(&mock_server)
        .retries(3, Duration::from_millis(40), Duration::from_millis(100))
        .build()
        .unwrap();

    let start = Instant::now();
    let result = client.get("/msgVpns").await;

    assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 4, .. })));
    assert!(start.elapsed() >= Duration::from_millis(220));
}

#[tokio::test]
async fn test_bearer_token_preferred_over_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server)
        .bearer_token("tok-123")
        .build()
        .unwrap();
    client.collect("/msgVpns").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let authorization: Vec<_> = requests[0]
        .headers
        .get_all("authorization")
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert_eq!(authorization, vec!["Bearer tok-123".to_string()]);
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mock_server = MockServer::start().await;

    // base64("admin:admin")
    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default")))
        .and(header("authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    client.get("/msgVpns/default").await.unwrap();
}

#[tokio::test]
async fn test_missing_credentials_makes_no_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}{}", mock_server.uri(), BASE_PATH))
        .unwrap()
        .build()
        .unwrap();
    let result = client.get("/msgVpns/default").await;

    assert!(matches!(result, Err(Error::MissingCredentials)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_first_request_skips_pacing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let interval = Duration::from_millis(300);
    let start = Instant::now();
    let client = fast_client(&mock_server)
        .request_limits(Duration::from_secs(10), interval)
        .build()
        .unwrap();

    client.get("/msgVpns/default").await.unwrap();
    assert!(start.elapsed() < interval);

    client.get("/msgVpns/default").await.unwrap();
    assert!(start.elapsed() >= interval);
}

#[tokio::test]
async fn test_collection_follows_next_page_links() {
    let mock_server = MockServer::start().await;
    let next_page = format!(
        "{}{}/msgVpns/default/queues?count=2&cursor=p2",
        mock_server.uri(),
        BASE_PATH
    );

    // Mounted first so it takes precedence for the continuation request.
    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default/queues")))
        .and(query_param("cursor", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [3]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default/queues")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [1, 2],
            "meta": {"paging": {"nextPageUri": next_page}, "responseCode": 200}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let items = client
        .collect("/msgVpns/default/queues?count=2")
        .await
        .unwrap();

    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_pages_are_yielded_lazily() {
    let mock_server = MockServer::start().await;
    let next_page = format!("{}{}/msgVpns?cursor=2", mock_server.uri(), BASE_PATH);

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .and(query_param("cursor", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"msgVpnName": "b"}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"msgVpnName": "a"}],
            "meta": {"paging": {"nextPageUri": next_page}}
        })))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let mut pages = client.pages("/msgVpns");

    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first, vec![json!({"msgVpnName": "a"})]);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);

    let second = pages.next_page().await.unwrap().unwrap();
    assert_eq!(second, vec![json!({"msgVpnName": "b"})]);
    assert!(pages.next_page().await.unwrap().is_none());
    assert_eq!(pages.pages_fetched(), 2);
}

#[tokio::test]
async fn test_page_limit_stops_endless_collection() {
    let mock_server = MockServer::start().await;
    let next_page = format!("{}{}/msgVpns?cursor=again", mock_server.uri(), BASE_PATH);

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [1],
            "meta": {"paging": {"nextPageUri": next_page}}
        })))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).max_pages(3).build().unwrap();
    let result = client.collect("/msgVpns").await;

    assert!(matches!(
        result,
        Err(Error::PageLimitExceeded { limit: 3, .. })
    ));
}

#[tokio::test]
async fn test_collection_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/default/bogus")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "meta": {"responseCode": 400, "error": {"description": "Invalid path", "status": "INVALID_PATH"}}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns/gone/queues")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"responseCode": 404, "error": {"description": "gone", "status": "NOT_FOUND"}}
        })))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();

    let err = client.collect("/msgVpns/default/bogus").await.unwrap_err();
    assert!(err.is_bad_request());

    let err = client.collect("/msgVpns/gone/queues").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_session_cookie_is_replayed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/about/api")))
        .and(header("cookie", "Session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"platform": "VMR", "sempVersion": "2.36"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(semp_path("/about/api")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "Session=abc123; Path=/")
                .set_body_json(json!({
                    "data": {"platform": "VMR", "sempVersion": "2.36"}
                })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let jar = Arc::new(reqwest::cookie::Jar::default());
    let client = fast_client(&mock_server)
        .cookie_store(jar.clone())
        .build()
        .unwrap();

    client.about_api().await.unwrap();
    client.about_api().await.unwrap();

    let url = reqwest::Url::parse(&mock_server.uri()).unwrap();
    assert!(reqwest::cookie::CookieStore::cookies(jar.as_ref(), &url).is_some());
}

#[tokio::test]
async fn test_about_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/about/api")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"platform": "Appliance", "sempVersion": "2.40", "other": 1},
            "meta": {"responseCode": 200}
        })))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let about = client.about_api().await.unwrap();

    assert_eq!(about.platform, "Appliance");
    assert_eq!(about.semp_version, "2.40");
}

#[tokio::test]
async fn test_request_deadline_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({"data": []})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server)
        .request_limits(Duration::from_millis(50), Duration::ZERO)
        .build()
        .unwrap();
    let result = client.get("/msgVpns").await;

    assert!(matches!(result, Err(Error::Timeout { .. })));
}

#[tokio::test]
async fn test_deadline_spans_transport_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server)
        .transport_retry(TransportRetryPolicy::new(6, Duration::from_millis(50)))
        .build()
        .unwrap();
    let start = Instant::now();
    let result = client
        .send(
            semp_client::SempRequest::new(http::Method::GET, "/msgVpns")
                .with_timeout(Duration::from_millis(100)),
        )
        .await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(Error::Timeout { .. })), "{:?}", result);
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_deadline_spans_rate_limit_waits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server)
        .retries(10, Duration::from_millis(200), Duration::from_secs(1))
        .request_limits(Duration::from_millis(300), Duration::ZERO)
        .build()
        .unwrap();
    let start = Instant::now();
    let result = client.get("/msgVpns").await;

    assert!(matches!(result, Err(Error::Timeout { .. })), "{:?}", result);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_raw_execute_reports_attempts() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path(semp_path("/msgVpns")))
        .respond_with(move |_req: &wiremock::Request| {
            if attempt_count_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                ResponseTemplate::new(429)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"data": []}))
            }
        })
        .mount(&mock_server)
        .await;

    let client = fast_client(&mock_server).build().unwrap();
    let response = client
        .execute(&semp_client::SempRequest::new(http::Method::GET, "/msgVpns"))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
}
