use dynakit_application::{ColumnSet, OrganizationService};
use dynakit_core::AppError;
use reqwest::Url;
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{HttpOrganizationService, HttpOrganizationServiceConfig};

fn build_service(server: &MockServer, bearer_token: Option<&str>) -> HttpOrganizationService {
    build_service_at(server.uri().as_str(), bearer_token)
}

fn build_service_at(uri: &str, bearer_token: Option<&str>) -> HttpOrganizationService {
    let base_url = Url::parse(uri);
    assert!(base_url.is_ok());

    HttpOrganizationService::new(
        reqwest::Client::new(),
        HttpOrganizationServiceConfig {
            base_url: base_url.unwrap_or_else(|_| unreachable!()),
            bearer_token: bearer_token.map(str::to_owned),
            max_attempts: 2,
            retry_backoff_ms: 50,
        },
    )
}

fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn retrieve_sends_bearer_token_and_column_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .and(query_param("select", "name,statecode"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "Contoso", "statecode": 0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, Some("secret-token"));
    let record = service
        .retrieve(
            "account",
            "a-1",
            &ColumnSet::Columns(vec!["name".to_owned(), "statecode".to_owned()]),
        )
        .await;

    assert!(record.is_ok());
    let record = record.unwrap_or_else(|_| unreachable!());
    assert_eq!(record.reference().logical_name(), "account");
    assert_eq!(record.attribute("name"), Some(&json!("Contoso")));
}

#[tokio::test]
async fn update_patches_partial_attributes() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/records/account/a-1"))
        .and(body_json(json!({"description": "hello", "statecode": 1})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let updated = service
        .update(
            "account",
            "a-1",
            attributes(json!({"description": "hello", "statecode": 1})),
        )
        .await;

    assert!(updated.is_ok());
}

#[tokio::test]
async fn create_returns_identifier_from_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/annotation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n-77"})))
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let created = service
        .create("annotation", attributes(json!({"subject": "note"})))
        .await;

    assert_eq!(created.unwrap_or_default(), "n-77");
}

#[tokio::test]
async fn structured_error_body_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "0x80040217", "message": "account With Id = missing Does Not Exist"}
        })))
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let result = service.retrieve("account", "missing", &ColumnSet::All).await;

    assert!(matches!(
        result,
        Err(AppError::NotFound(message)) if message == "account With Id = missing Does Not Exist"
    ));
}

#[tokio::test]
async fn plain_text_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(412).set_body_string("record changed concurrently"))
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let result = service.update("account", "a-1", Map::new()).await;

    assert!(matches!(
        result,
        Err(AppError::Conflict(message)) if message == "record changed concurrently"
    ));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Contoso"})))
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let record = service.retrieve("account", "a-1", &ColumnSet::All).await;

    assert!(record.is_ok());
}

#[tokio::test]
async fn exhausted_retries_report_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "sql timeout"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let result = service.retrieve("account", "a-1", &ColumnSet::All).await;

    assert!(matches!(
        result,
        Err(AppError::Internal(message)) if message == "sql timeout"
    ));
}

#[tokio::test]
async fn create_reuses_idempotency_key_across_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/annotation"))
        .and(header_exists("idempotency-key"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/records/annotation"))
        .and(header_exists("idempotency-key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n-78"})))
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let created = service
        .create("annotation", attributes(json!({"subject": "note"})))
        .await;
    assert_eq!(created.unwrap_or_default(), "n-78");

    let keys: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| request.headers.get("idempotency-key"))
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
}

#[tokio::test]
async fn separate_creates_use_distinct_idempotency_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/records/annotation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n-79"})))
        .expect(2)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    assert!(service.create("annotation", Map::new()).await.is_ok());
    assert!(service.create("annotation", Map::new()).await.is_ok());

    let keys: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| request.headers.get("idempotency-key"))
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
}

#[tokio::test]
async fn json_error_without_message_keeps_raw_body() {
    let server = MockServer::start().await;
    let body = r#"{"error":"invalid_token","error_description":"token expired"}"#;
    Mock::given(method("PATCH"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(401).set_body_string(body))
        .mount(&server)
        .await;

    let service = build_service(&server, Some("expired-token"));
    let result = service.update("account", "a-1", Map::new()).await;

    assert!(matches!(
        result,
        Err(AppError::Unauthorized(message)) if message == body
    ));
}

#[tokio::test]
async fn forbidden_status_maps_to_forbidden() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error": {"message": "missing read privilege"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let result = service.retrieve("account", "a-1", &ColumnSet::All).await;

    assert!(matches!(
        result,
        Err(AppError::Forbidden(message)) if message == "missing read privilege"
    ));
}

#[tokio::test]
async fn unauthorized_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})))
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let result = service.retrieve("account", "a-1", &ColumnSet::All).await;

    assert!(matches!(
        result,
        Err(AppError::Unauthorized(message)) if message == "token expired"
    ));
}

#[tokio::test]
async fn throttled_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/records/account/a-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = build_service(&server, None);
    let updated = service.update("account", "a-1", Map::new()).await;

    assert!(updated.is_ok());
}

#[tokio::test]
async fn transport_errors_exhaust_retries_as_internal() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0");
    assert!(listener.is_ok());
    let address = listener
        .unwrap_or_else(|_| unreachable!())
        .local_addr()
        .unwrap_or_else(|_| unreachable!());

    // The listener is dropped above, so nothing accepts on this port.
    let service = build_service_at(format!("http://{address}/api").as_str(), None);
    let result = service.retrieve("account", "a-1", &ColumnSet::All).await;

    assert!(matches!(
        result,
        Err(AppError::Internal(message)) if message.contains("transport error")
    ));
}

#[tokio::test]
async fn blank_route_segments_are_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let service = build_service(&server, None);

    assert!(matches!(
        service.retrieve(" ", "a-1", &ColumnSet::All).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        service.create("", Map::new()).await,
        Err(AppError::Validation(_))
    ));
}
