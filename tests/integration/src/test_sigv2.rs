use chrono::Utc;
use s3relay_auth::presign::presign_v2;
use s3relay_auth::{ObjectPath, PresignRequest, QueryParams};
use s3relay_core::{CredentialPair, OriginEndpoint, OriginScheme};

use crate::{ORIGIN_ACCESS_KEY, client_credentials, http_client, start_pair};

fn presigned_url(
    relay: std::net::SocketAddr,
    creds: &CredentialPair,
    key: &str,
    expires_in: u64,
) -> String {
    let endpoint = OriginEndpoint::new(OriginScheme::Http, relay.to_string());
    let object = ObjectPath::new("bucket", key);
    presign_v2(
        &PresignRequest {
            method: "GET",
            endpoint: &endpoint,
            credentials: creds,
            object: &object,
            expires_in,
            region: "",
        },
        Utc::now(),
    )
    .to_string()
}

#[tokio::test]
async fn test_should_relay_valid_v2_request() {
    let (origin, relay) = start_pair().await.unwrap();
    let url = presigned_url(relay, &client_credentials(), "images/logo.png", 900);

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let seen = origin.seen();
    assert_eq!(seen[0].status, 200);
    let params = QueryParams::parse(seen[0].query.as_deref().unwrap());
    assert_eq!(params.first("AWSAccessKeyId"), Some(ORIGIN_ACCESS_KEY));
}

#[tokio::test]
async fn test_should_give_short_lived_v2_urls_at_least_a_minute() {
    let (origin, relay) = start_pair().await.unwrap();
    let before = Utc::now().timestamp();
    let url = presigned_url(relay, &client_credentials(), "images/logo.png", 1);

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let params = QueryParams::parse(origin.seen()[0].query.as_deref().unwrap());
    let expires: i64 = params.first("Expires").unwrap().parse().unwrap();
    assert!(expires >= before + 60);
}

#[tokio::test]
async fn test_should_require_exact_v2_access_key() {
    let (origin, relay) = start_pair().await.unwrap();
    let other = CredentialPair::new("SOMEONEELSE", "whatever");
    let url = presigned_url(relay, &other, "images/logo.png", 900);

    let response = http_client().get(url).send().await.unwrap();
    assert_eq!(response.status(), 403);
    assert!(origin.seen().is_empty());
}
