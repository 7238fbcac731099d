//! Session lifecycle against a running Keyhole server.
//!
//! These tests require the server to be running with rate limiting off:
//! `KEYHOLE_AUTH_RATE_LIMIT=false cargo run -p keyhole-web`

#![allow(clippy::unwrap_used)]

use keyhole_integration_tests::{base_url, client, unique_email};
use reqwest::{StatusCode, header::LOCATION};

fn location(resp: &reqwest::Response) -> &str {
    resp.headers().get(LOCATION).unwrap().to_str().unwrap()
}

#[tokio::test]
#[ignore = "Requires running keyhole server"]
async fn test_health() {
    let resp = client()
        .unwrap()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "Requires running keyhole server"]
async fn test_register_login_logout() {
    let client = client().unwrap();
    let base = base_url();
    let email = unique_email();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = client
        .post(format!("{base}/register"))
        .form(&[("name", "Ann"), ("email", email.as_str()), ("password", "secret1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = client
        .post(format!("{base}/login"))
        .form(&[("email", email.as_str()), ("password", "secret1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Hi Ann"));

    let resp = client
        .post(format!("{base}/logout"))
        .form(&[("_method", "DELETE")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "Requires running keyhole server"]
async fn test_wrong_password_keeps_visitor_anonymous() {
    let client = client().unwrap();
    let base = base_url();
    let email = unique_email();

    client
        .post(format!("{base}/register"))
        .form(&[("name", "Ann"), ("email", email.as_str()), ("password", "secret1")])
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/login"))
        .form(&[("email", email.as_str()), ("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Incorrect password"));

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}
