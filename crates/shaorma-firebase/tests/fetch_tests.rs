use std::time::Duration;

use serde_json::json;
use shaorma::{FetchOutcome, RemoteError, RemoteSource, fetch_all};
use shaorma_firebase::{FirebaseConfig, FirebaseSource};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer, token: Option<&str>) -> FirebaseSource {
    FirebaseSource::new(FirebaseConfig {
        database_url: server.uri(),
        auth_token: token.map(str::to_owned),
    })
}

#[tokio::test]
async fn read_keyed_collection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Stores.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "-Nabc": {
                "Title": "Dristor Kebab",
                "Address": "Bulevardul Unirii 1",
                "CategoryIds": ["1", "2"],
                "Latitude": 44.4268,
                "Longitude": 26.1025
            },
            "-Ndef": {
                "Title": "Old Shape",
                "CategoryId": 4
            }
        })))
        .mount(&server)
        .await;

    let children = source_for(&server, None).read("Stores").await.unwrap();

    assert_eq!(children.len(), 2);
    let first = children
        .iter()
        .find(|c| c.remote_key() == Some("-Nabc"))
        .unwrap();
    assert_eq!(first.value["Title"], "Dristor Kebab");
}

#[tokio::test]
async fn read_sends_auth_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Category.json"))
        .and(query_param("auth", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            null,
            {"Id": 1, "Name": "Fast food"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let children = source_for(&server, Some("secret"))
        .read("Category")
        .await
        .unwrap();

    assert_eq!(children.len(), 1);
    assert_eq!(children[0].remote_key(), Some("1"));
}

#[tokio::test]
async fn missing_collection_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Banners.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let source = source_for(&server, None);
    assert!(source.read("Banners").await.unwrap().is_empty());
    assert_eq!(
        fetch_all(&source, "Banners", Duration::from_secs(5)).await,
        FetchOutcome::Empty
    );
}

#[tokio::test]
async fn http_error_maps_to_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Stores.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = source_for(&server, None).read("Stores").await.unwrap_err();
    assert!(matches!(err, RemoteError::Status(401)));
}

#[tokio::test]
async fn invalid_json_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Stores.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = source_for(&server, None).read("Stores").await.unwrap_err();
    assert!(matches!(err, RemoteError::Parse(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Stores.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"-Na": {"Title": "Late"}}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let source = source_for(&server, None);
    let outcome = fetch_all(&source, "Stores", Duration::from_millis(100)).await;
    assert_eq!(outcome, FetchOutcome::Timeout);
}
