//! Wire-level tests for the HTTP transport and the startup fallback,
//! against a local mock server.

use serde_json::json;
use worklink::provider::{create_provider, FallbackResolver, HttpProvider, Provider, ProviderKind};
use worklink::types::WiqlQuery;
use worklink::{ClientConfig, Error};

fn config_for(server: &mockito::ServerGuard) -> ClientConfig {
    ClientConfig::new("org", "proj", "secret").with_base_url(server.url())
}

#[tokio::test]
async fn startup_falls_back_to_http_when_handshake_fails() {
    let mut server = mockito::Server::new_async().await;
    let handshake = server
        .mock("GET", "/org/_apis/connectionData?api-version=5.1")
        .with_status(500)
        .create_async()
        .await;
    let probe = server
        .mock("GET", "/org/_apis/projects/proj?api-version=7.1")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let handle = create_provider(&config_for(&server), ProviderKind::Sdk)
        .await
        .unwrap();

    assert_eq!(handle.kind(), ProviderKind::Http);
    assert!(handle.provider().is_healthy());
    handshake.assert_async().await;
    probe.assert_async().await;
}

#[tokio::test]
async fn successful_handshake_keeps_the_sdk_transport() {
    let mut server = mockito::Server::new_async().await;
    let handshake = server
        .mock("GET", "/org/_apis/connectionData?api-version=5.1")
        .with_status(200)
        .with_body(json!({"authenticatedUser": {"id": "u1"}}).to_string())
        .create_async()
        .await;

    let handle = create_provider(&config_for(&server), ProviderKind::Sdk)
        .await
        .unwrap();

    assert_eq!(handle.kind(), ProviderKind::Sdk);
    handshake.assert_async().await;
}

#[tokio::test]
async fn get_work_item_decodes_fields() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/org/proj/_apis/wit/workitems/42?api-version=7.1")
        .with_status(200)
        .with_body(
            json!({
                "id": 42,
                "rev": 3,
                "fields": {"System.Title": "Fix the flaky gate"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = HttpProvider::new(config_for(&server)).unwrap();
    let item = provider.get_work_item(42, None).await.unwrap();

    assert_eq!(item.id, 42);
    assert_eq!(item.rev, Some(3));
    assert_eq!(
        item.fields.get("System.Title").and_then(|v| v.as_str()),
        Some("Fix the flaky gate")
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn upstream_statuses_map_to_structured_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/org/proj/_apis/wit/workitems/1?api-version=7.1")
        .with_status(503)
        .with_body("down for maintenance")
        .create_async()
        .await;
    server
        .mock("GET", "/org/proj/_apis/wit/workitems/2?api-version=7.1")
        .with_status(404)
        .with_body("no such item")
        .create_async()
        .await;

    let provider = HttpProvider::new(config_for(&server)).unwrap();

    let transient = provider.get_work_item(1, None).await.unwrap_err();
    assert!(transient.is_retryable());
    assert!(matches!(transient, Error::Transient { status: 503, .. }));

    let remote = provider.get_work_item(2, None).await.unwrap_err();
    assert!(!remote.is_retryable());
    assert!(matches!(remote, Error::Remote { status: 404, .. }));
}

#[tokio::test]
async fn wiql_top_travels_as_query_parameter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/org/proj/_apis/wit/wiql")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("$top".into(), "50".into()),
            mockito::Matcher::UrlEncoded("api-version".into(), "7.1".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "queryType": "flat",
                "workItems": [{"id": 9}, {"id": 4}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = HttpProvider::new(config_for(&server)).unwrap();
    let result = provider
        .execute_wiql(WiqlQuery::new("SELECT [System.Id] FROM WorkItems").with_top(50))
        .await
        .unwrap();

    assert_eq!(result.ids(), vec![9, 4]);
    mock.assert_async().await;
}

#[tokio::test]
async fn wiki_page_paths_are_percent_encoded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/org/proj/_apis/wiki/wikis/w1/pages")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("path".into(), "docs/How To".into()),
            mockito::Matcher::UrlEncoded("includeContent".into(), "true".into()),
            mockito::Matcher::UrlEncoded("api-version".into(), "7.1".into()),
        ]))
        .with_status(200)
        .with_body(json!({"path": "/docs/How To", "content": "# hi"}).to_string())
        .create_async()
        .await;

    let provider = HttpProvider::new(config_for(&server)).unwrap();
    let page = provider
        .get_wiki_page("w1".to_string(), "docs/How To".to_string(), true)
        .await
        .unwrap();

    assert_eq!(page.content.as_deref(), Some("# hi"));
    mock.assert_async().await;
}

#[tokio::test]
async fn fallback_resolver_initializes_the_transport_once() {
    let mut server = mockito::Server::new_async().await;
    let probe = server
        .mock("GET", "/org/_apis/projects/proj?api-version=7.1")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let resolver = FallbackResolver::from_config(config_for(&server));
    let first = resolver.resolve().await.unwrap();
    let second = resolver.resolve().await.unwrap();

    assert_eq!(first.kind(), ProviderKind::Http);
    assert_eq!(second.kind(), ProviderKind::Http);
    probe.assert_async().await;
}
