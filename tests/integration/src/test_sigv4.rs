use std::time::Duration;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::Utc;
use s3relay_auth::presign::presign_v4;
use s3relay_auth::{ObjectPath, PresignRequest, QueryParams};
use s3relay_core::{CredentialPair, OriginEndpoint, OriginScheme};

use crate::{
    CLIENT_ACCESS_KEY, CLIENT_SECRET_KEY, ORIGIN_ACCESS_KEY, client_credentials, http_client,
    start_origin, start_pair, start_relay,
};

fn presigned_query(relay: std::net::SocketAddr, creds: &CredentialPair, key: &str) -> String {
    presigned_for("GET", relay, creds, key)
}

fn presigned_for(
    method: &str,
    relay: std::net::SocketAddr,
    creds: &CredentialPair,
    key: &str,
) -> String {
    let endpoint = OriginEndpoint::new(OriginScheme::Http, relay.to_string());
    let object = ObjectPath::new("bucket", key);
    presign_v4(
        &PresignRequest {
            method,
            endpoint: &endpoint,
            credentials: creds,
            object: &object,
            expires_in: 600,
            region: "us-east-1",
        },
        Utc::now(),
    )
    .to_string()
}

#[tokio::test]
async fn test_should_relay_valid_v4_request_with_origin_signature() {
    let (origin, relay) = start_pair().await.unwrap();
    let url = presigned_query(relay, &client_credentials(), "reports/2024 q1.csv");

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "GET /bucket/reports/2024%20q1.csv");

    let seen = origin.seen();
    assert_eq!(seen[0].status, 200);
    let params = QueryParams::parse(seen[0].query.as_deref().unwrap());
    let credential = params.first("X-Amz-Credential").unwrap();
    assert!(credential.starts_with(&format!("{ORIGIN_ACCESS_KEY}/")));
    assert!(credential.ends_with("/us-east-1/s3/aws4_request"));
    assert_eq!(params.first("X-Amz-Expires"), Some("600"));
}

#[tokio::test]
async fn test_should_relay_v4_head_request() {
    let (origin, relay) = start_pair().await.unwrap();
    let url = presigned_for("HEAD", relay, &client_credentials(), "reports/q1.csv");

    let response = http_client().head(url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let seen = origin.seen();
    assert_eq!(seen[0].method, http::Method::HEAD);
    assert_eq!(seen[0].status, 200);
}

#[tokio::test]
async fn test_should_reject_v4_signed_with_foreign_secret() {
    let (origin, relay) = start_pair().await.unwrap();
    let forged = CredentialPair::new(CLIENT_ACCESS_KEY, "not-the-secret");
    let url = presigned_query(relay, &forged, "reports/q1.csv");

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 403);
    assert!(response.headers().contains_key("x-relay-request-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "signature does not match");
    assert!(origin.seen().is_empty());
}

#[tokio::test]
async fn test_should_reject_v4_with_wrong_algorithm() {
    let (origin, relay) = start_pair().await.unwrap();
    let url = presigned_query(relay, &client_credentials(), "reports/q1.csv")
        .replace("AWS4-HMAC-SHA256", "AWS4-HMAC-SHA1");

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 400);
    assert!(origin.seen().is_empty());
}

#[tokio::test]
async fn test_should_accept_url_presigned_by_aws_sdk() {
    let origin = start_origin().await.unwrap();
    let relay = start_relay(crate::relay_config(origin.endpoint()))
        .await
        .unwrap();

    let creds = Credentials::new(CLIENT_ACCESS_KEY, CLIENT_SECRET_KEY, None, None, "relay-test");
    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(format!("http://{relay}"))
        .force_path_style(true)
        .build();
    let client = aws_sdk_s3::Client::from_conf(config);

    let presigned = client
        .get_object()
        .bucket("bucket")
        .key("reports/q1.csv")
        .presigned(PresigningConfig::expires_in(Duration::from_secs(300)).unwrap())
        .await
        .unwrap();

    let mut request = http_client().get(presigned.uri());
    for (name, value) in presigned.headers() {
        request = request.header(name, value);
    }
    let response = request.send().await.unwrap();
    assert_eq!(response.status(), 200);

    let seen = origin.seen();
    assert_eq!(seen[0].path, "/bucket/reports/q1.csv");
    assert_eq!(seen[0].status, 200);
}
