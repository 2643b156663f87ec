use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode as HttpStatus,
    routing::get,
    Router,
};
use chrono::TimeZone;
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

type CapturedQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

#[derive(Clone)]
struct CatalogServerState {
    status: HttpStatus,
    body: Arc<String>,
    queries: CapturedQueries,
}

async fn handle_catalog_query(
    State(state): State<CatalogServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> (HttpStatus, String) {
    state.queries.lock().await.push(params);
    (state.status, state.body.to_string())
}

async fn spawn_catalog_server(
    status: HttpStatus,
    body: String,
) -> anyhow::Result<(String, CapturedQueries)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = CatalogServerState {
        status,
        body: Arc::new(body),
        queries: Arc::new(Mutex::new(Vec::new())),
    };
    let queries = Arc::clone(&state.queries);
    let app = Router::new()
        .route("/fdsnws/event/1/query", get(handle_catalog_query))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/fdsnws/event/1/query"), queries))
}

fn catalog_client(base_url: &str) -> CatalogClient {
    CatalogClient::new(CatalogClientOptions {
        base_url: base_url.to_string(),
        ..CatalogClientOptions::default()
    })
    .expect("catalog client")
}

fn feature(id: &str, mag: f64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "id": id,
        "properties": {
            "mag": mag,
            "place": format!("near {id}"),
            "time": 1_709_251_200_000_i64,
            "status": "automatic"
        },
        "geometry": {"type": "Point", "coordinates": [-117.5, 35.7, 6.4]}
    })
}

fn query(offset: u32) -> PageQuery {
    PageQuery {
        start_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        min_magnitude: 2.5,
        limit: 20,
        offset,
    }
}

#[tokio::test]
async fn fetch_page_sends_windowed_geojson_query() {
    let body = json!({
        "type": "FeatureCollection",
        "features": [feature("ci1", 2.7), feature("ci2", 4.1)]
    });
    let (base_url, queries) = spawn_catalog_server(HttpStatus::OK, body.to_string())
        .await
        .expect("spawn server");

    let records = catalog_client(&base_url)
        .fetch_page(&query(21))
        .await
        .expect("fetch page");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id().as_str(), "ci1");
    assert_eq!(records[1].magnitude(), 4.1);
    assert_eq!(records[1].place(), "near ci2");

    let queries = queries.lock().await;
    assert_eq!(queries.len(), 1);
    let params = &queries[0];
    assert_eq!(params["format"], "geojson");
    assert_eq!(params["starttime"], "2024-03-01T00:00:00Z");
    assert_eq!(params["endtime"], "2024-03-02T00:00:00Z");
    assert_eq!(params["minmagnitude"].parse::<f64>().expect("decimal"), 2.5);
    assert_eq!(params["limit"], "20");
    assert_eq!(params["offset"], "21");
}

#[tokio::test]
async fn non_ok_status_is_a_request_error_carrying_the_status() {
    let (base_url, _queries) =
        spawn_catalog_server(HttpStatus::SERVICE_UNAVAILABLE, "busy".to_string())
            .await
            .expect("spawn server");

    let err = catalog_client(&base_url)
        .fetch_page(&query(1))
        .await
        .expect_err("503 should fail");

    assert!(matches!(err, SourceError::Request { status: 503 }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn undecodable_body_is_a_parse_error() {
    let (base_url, _queries) = spawn_catalog_server(HttpStatus::OK, "<html>".to_string())
        .await
        .expect("spawn server");

    let err = catalog_client(&base_url)
        .fetch_page(&query(1))
        .await
        .expect_err("html body should fail");

    assert!(matches!(err, SourceError::Parse(_)));
}

#[tokio::test]
async fn feature_without_magnitude_is_a_parse_error() {
    let body = json!({"features": [{
        "id": "nm1",
        "properties": {"time": 0},
        "geometry": {"coordinates": [0.0, 0.0, 0.0]}
    }]});
    let (base_url, _queries) = spawn_catalog_server(HttpStatus::OK, body.to_string())
        .await
        .expect("spawn server");

    let err = catalog_client(&base_url)
        .fetch_page(&query(1))
        .await
        .expect_err("missing mag should fail");

    match err {
        SourceError::Parse(message) => assert!(message.contains("properties.mag")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_query_is_rejected_before_any_request() {
    let (base_url, queries) = spawn_catalog_server(HttpStatus::OK, r#"{"features":[]}"#.into())
        .await
        .expect("spawn server");
    let client = catalog_client(&base_url);

    let err = client.fetch_page(&query(0)).await.expect_err("offset 0");
    assert!(matches!(err, SourceError::InvalidQuery(_)));

    let mut inverted = query(1);
    std::mem::swap(&mut inverted.start_time, &mut inverted.end_time);
    let err = client.fetch_page(&inverted).await.expect_err("inverted window");
    assert!(matches!(err, SourceError::InvalidQuery(_)));

    assert!(queries.lock().await.is_empty());
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = catalog_client(&format!("http://{addr}/query"))
        .fetch_page(&query(1))
        .await
        .expect_err("nothing listening");

    assert!(matches!(err, SourceError::Transport(_)));
}

#[test]
fn unparseable_base_url_is_a_config_error() {
    let result = CatalogClient::new(CatalogClientOptions {
        base_url: "not a url".into(),
        ..CatalogClientOptions::default()
    });

    assert!(matches!(result, Err(SourceError::Config(_))));
}

#[test]
fn default_options_target_the_public_catalog() {
    let client = CatalogClient::new(CatalogClientOptions::default()).expect("client");
    assert_eq!(client.base_url().as_str(), DEFAULT_CATALOG_URL);
}
