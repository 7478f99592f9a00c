use crate::{REDIRECT_PATH, http_client, start_pair};

#[tokio::test]
async fn test_should_pass_unsigned_query_through_byte_identical() {
    let (origin, relay) = start_pair().await.unwrap();
    let raw_query = "list-type=2&prefix=a+b%2Fc&delimiter=%2F&acl";

    let response = http_client()
        .get(format!("http://{relay}/bucket/?{raw_query}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-origin"], "mock");
    assert_eq!(response.text().await.unwrap(), "GET /bucket/");

    let seen = origin.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].query.as_deref(), Some(raw_query));
    assert_eq!(
        seen[0].headers[http::header::HOST],
        origin.addr.to_string().as_str()
    );
}

#[tokio::test]
async fn test_should_stream_put_body_to_origin() {
    let (origin, relay) = start_pair().await.unwrap();
    let payload = vec![b'x'; 256 * 1024];

    let response = http_client()
        .put(format!("http://{relay}/bucket/blob.bin"))
        .header("x-amz-meta-owner", "integration")
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let seen = origin.seen();
    assert_eq!(seen[0].method, http::Method::PUT);
    assert_eq!(seen[0].body.len(), payload.len());
    assert_eq!(
        seen[0].headers[http::header::CONTENT_LENGTH],
        payload.len().to_string().as_str()
    );
    assert_eq!(seen[0].headers["x-amz-meta-owner"], "integration");
}

#[tokio::test]
async fn test_should_relay_redirect_without_following_it() {
    let (_origin, relay) = start_pair().await.unwrap();

    let response = http_client()
        .get(format!("http://{relay}{REDIRECT_PATH}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()[http::header::LOCATION],
        "http://elsewhere.invalid/"
    );
}
