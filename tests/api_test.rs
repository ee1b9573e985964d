mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::{Value, json};
use tower::ServiceExt;
use trending_harvest::lookup_api::{LookupState, router};
use trending_harvest::store::{TokenRecord, TokenStore};

fn state(site: &FakeSite, store: &TokenStore) -> LookupState {
    LookupState {
        store: store.clone(),
        factory: site.factory(),
        plan: Arc::new(quick_plan()),
    }
}

async fn get(state: LookupState, uri: &str) -> Result<(StatusCode, Value)> {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn test_stored_token_is_served_without_a_browser() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let mut record = TokenRecord::new("MintA");
    record.name = Some("Alpha".into());
    record.thumbnail = Some("https://cdn.dexscreener.com/cms/images/alpha".into());
    record.market_cap = Some(1_000.0);
    store.upsert_token(&record).await?;

    let site = FakeSite::new();
    let (status, body) = get(state(&site, &store), "/token/MintA").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "contract": "MintA",
            "name": "Alpha",
            "logo_url": "https://cdn.dexscreener.com/cms/images/alpha",
        })
    );
    assert_eq!(site.acquired(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_token_is_extracted_and_stored() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();
    site.page(token_url("MintB"), FakePage::new(token_html("Beta", &[])));

    let (status, body) = get(state(&site, &store), "/token/MintB").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contract"], "MintB");
    assert_eq!(body["name"], "Beta");
    assert_eq!(site.released(), 1);

    let stored = store.get_token("MintB").await?;
    assert_eq!(stored.and_then(|t| t.name).as_deref(), Some("Beta"));
    Ok(())
}

#[tokio::test]
async fn test_extraction_failure_is_a_server_error() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();

    let (status, body) = get(state(&site, &store), "/token/Unreachable").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|msg| msg.starts_with("Failed to scrape token data"))
    );
    assert_eq!(store.token_count().await?, 0);
    assert_eq!(site.acquired(), site.released());
    Ok(())
}

#[tokio::test]
async fn test_health_reports_database_status() -> Result<()> {
    let (_dir, store) = temp_store().await?;
    let site = FakeSite::new();

    let (status, body) = get(state(&site, &store), "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    store.close().await;
    let (status, body) = get(state(&site, &store), "/health").await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    Ok(())
}
