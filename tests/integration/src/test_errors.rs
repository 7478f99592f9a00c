use chrono::Utc;
use s3relay_auth::presign::presign_v4;
use s3relay_auth::{ObjectPath, PresignRequest};
use s3relay_core::{OriginEndpoint, OriginScheme};

use crate::{client_credentials, http_client, relay_config, start_pair, start_relay};

#[tokio::test]
async fn test_should_reject_signed_bucket_only_path() {
    let (origin, relay) = start_pair().await.unwrap();
    let endpoint = OriginEndpoint::new(OriginScheme::Http, relay.to_string());
    let creds = client_credentials();
    let object = ObjectPath::new("onlybucket", "ignored");
    let signed = presign_v4(
        &PresignRequest {
            method: "GET",
            endpoint: &endpoint,
            credentials: &creds,
            object: &object,
            expires_in: 60,
            region: "us-east-1",
        },
        Utc::now(),
    );

    let response = http_client()
        .get(format!("http://{relay}/onlybucket?{}", signed.query))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid S3 path"));
    assert!(origin.seen().is_empty());
}

#[tokio::test]
async fn test_should_report_healthy_origin() {
    let (origin, relay) = start_pair().await.unwrap();

    let response = http_client()
        .get(format!("http://{relay}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let seen = origin.seen();
    assert_eq!(seen[0].method, http::Method::HEAD);
    assert_eq!(seen[0].path, "/");
}

#[tokio::test]
async fn test_should_report_unreachable_origin() {
    let parked = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = parked.local_addr().unwrap();
    drop(parked);

    let config = relay_config(OriginEndpoint::new(OriginScheme::Http, dead.to_string()));
    let relay = start_relay(config).await.unwrap();

    let health = http_client()
        .get(format!("http://{relay}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status().as_u16(), 521);

    let forwarded = http_client()
        .get(format!("http://{relay}/bucket/key"))
        .send()
        .await
        .unwrap();
    assert_eq!(forwarded.status(), 502);
    let body: serde_json::Value = forwarded.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("origin request failed"));
}
