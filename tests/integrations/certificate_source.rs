use danglewatch::core::{CertificateSource, TargetDomain};
use danglewatch::network::CrtShClient;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, attempts: u32) -> CrtShClient {
    CrtShClient::new(
        format!("{}/", server.uri()),
        2,
        Duration::from_secs(5),
        attempts,
        Duration::ZERO,
    )
    .unwrap()
}

#[tokio::test]
async fn test_fetch_queries_wildcard_pattern_and_parses_records() {
    let server = MockServer::start().await;
    let body = json!([
        {
            "id": 12345,
            "name_value": "api.example.com\nwww.example.com",
            "entry_timestamp": "2024-05-01T10:00:00.123"
        },
        {
            "id": 12346,
            "name_value": "*.cdn.example.com",
            "entry_timestamp": null
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "%.example.com"))
        .and(query_param("output", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server, 1)
        .fetch(&TargetDomain::new("example.com"))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "12345");
    assert_eq!(
        records[0].subject_names().collect::<Vec<_>>(),
        vec!["api.example.com", "www.example.com"]
    );
    assert_eq!(records[1].entry_timestamp, "");
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let records = client(&server, 1)
        .fetch(&TargetDomain::new("example.com"))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_server_error_fails_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 1)
        .fetch(&TargetDomain::new("example.com"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_malformed_body_fails_the_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let result = client(&server, 1)
        .fetch(&TargetDomain::new("example.com"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_retries_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "777", "name_value": "late.example.com", "entry_timestamp": "2024-05-01T00:00:00" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server, 3)
        .fetch(&TargetDomain::new("example.com"))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "777");
}

#[tokio::test]
async fn test_gives_up_after_configured_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = client(&server, 2)
        .fetch(&TargetDomain::new("example.com"))
        .await;
    assert!(result.is_err());
}
