//! HTTP transport and full runs against a mock export endpoint

use finam_exporter::credentials::StaticCredentials;
use finam_exporter::export::ProgressLog;
use finam_exporter::fetcher::{HttpTransport, ReqwestTransport, TransportError};
use finam_exporter::{ExportOrchestrator, ExportRequest, Granularity};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DAILY_BODY: &str = "<TICKER>,<PER>,<DATE>,<TIME>,<CLOSE>\nSBER,D,20230103,000000,250.1\n";

#[tokio::test]
async fn get_sends_query_and_returns_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export9.out"))
        .and(query_param("code", "SBER"))
        .and(query_param("p", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DAILY_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new();
    let params = vec![("code", "SBER".to_string()), ("p", "8".to_string())];
    let response = transport
        .get(
            &format!("{}/export9.out", server.uri()),
            &params,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert!(response.status.is_success());
    assert_eq!(response.text(), DAILY_BODY);
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = ReqwestTransport::new()
        .get(&server.uri(), &[], Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 503);
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = ReqwestTransport::new()
        .get(&server.uri(), &[], Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout(_)));
}

#[tokio::test]
async fn year_export_writes_segment_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export9.out"))
        .and(query_param("em", "3"))
        .and(query_param("from", "01.01.2023"))
        .and(query_param("to", "31.12.2023"))
        .and(query_param("at", "1"))
        .and(query_param("token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DAILY_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = ExportOrchestrator::new(Arc::new(StaticCredentials::new("tok")))
        .with_base_url(format!("{}/export9.out", server.uri()));
    let mut request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
    request.output_dir = Some(dir.path().to_path_buf());

    let outcome = orchestrator.run(&request, &ProgressLog::new()).await.unwrap();

    let expected = dir.path().join("out/SBER/p8/2023/SBER_230101_231231.txt");
    assert_eq!(outcome.saved, vec![expected.clone()]);
    assert_eq!(std::fs::read_to_string(expected).unwrap(), DAILY_BODY);
}

#[tokio::test]
async fn endpoint_error_fragment_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Invalid request to date"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let orchestrator = ExportOrchestrator::new(Arc::new(StaticCredentials::new("tok")))
        .with_base_url(server.uri());
    let mut request = ExportRequest::for_year("SBER", "3", Granularity::Daily, 2023);
    request.output_dir = Some(dir.path().to_path_buf());

    let outcome = orchestrator.run(&request, &ProgressLog::new()).await.unwrap();

    assert!(outcome.is_zero_yield());
    assert_eq!(outcome.rejected, 1);
    assert!(!dir.path().join("out/SBER/p8/2023/SBER_230101_231231.txt").exists());
}
