use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subtrack_core::exchange::FeedQuote;
use subtrack_core::{
    Amount, CacheFabric, CurrencyUnit, ExchangeConfig, ExchangeResolver, FixedClock, HttpRateFeed,
    InMemoryRateStore, RateFeed, RequestContext, SubtrackError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{assert_close, date, noon};

fn feed_config(server: &MockServer, token_hosts: Vec<String>) -> ExchangeConfig {
    ExchangeConfig {
        base_url: Some(server.uri()),
        token: Some("secret".to_string()),
        token_hosts,
        timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn test_fetch_parses_daily_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2024/03/01.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"from": "USD", "to": {"EUR": 0.9, "JPY": 150.0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = HttpRateFeed::new(&feed_config(&server, vec![])).unwrap();
    let quote = feed.fetch(date(2024, 3, 1)).await.unwrap().unwrap();

    assert_eq!(quote, FeedQuote::usd([("EUR", 0.9), ("JPY", 150.0)]));
}

#[tokio::test]
async fn test_not_found_is_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2024/03/02.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let feed = HttpRateFeed::new(&feed_config(&server, vec![])).unwrap();
    assert_eq!(feed.fetch(date(2024, 3, 2)).await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = HttpRateFeed::new(&feed_config(&server, vec![])).unwrap();
    let err = feed.fetch(date(2024, 3, 3)).await.unwrap_err();
    assert!(matches!(err, SubtrackError::Http { message, source: None } if message.contains("503")));
}

#[tokio::test]
async fn test_token_sent_to_allowed_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "USD", "to": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let feed = HttpRateFeed::new(&feed_config(&server, vec![server.uri()])).unwrap();
    assert!(feed.fetch(date(2024, 3, 4)).await.unwrap().is_some());
}

#[tokio::test]
async fn test_token_withheld_from_other_hosts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "USD", "to": {}})))
        .mount(&server)
        .await;

    let config = feed_config(&server, vec!["https://rates.internal.example".to_string()]);
    let feed = HttpRateFeed::new(&config).unwrap();
    feed.fetch(date(2024, 3, 5)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_missing_base_url_is_configuration_error() {
    let err = HttpRateFeed::new(&ExchangeConfig::default()).unwrap_err();
    assert!(matches!(err, SubtrackError::Configuration(_)));
}

#[tokio::test]
async fn test_resolver_over_http_with_same_day_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2024/06/09.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2024/06/10.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "USD", "to": {"EUR": 0.95}})))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryRateStore::new());
    let resolver = ExchangeResolver::with_clock(
        Arc::new(CacheFabric::default()),
        store.clone(),
        Arc::new(HttpRateFeed::new(&feed_config(&server, vec![])).unwrap()),
        Arc::new(FixedClock::at_date(date(2024, 6, 10))),
    );

    let converted = resolver
        .to_currency_at(
            &RequestContext::new(),
            &Amount::new(100.0, CurrencyUnit::USD),
            CurrencyUnit::EUR,
            noon(2024, 6, 9),
        )
        .await
        .unwrap();

    assert_close(converted.value, 95.0);
    assert!(store.is_empty());
}
