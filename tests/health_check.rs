//! Smoke tests for the vidtube server

use std::net::TcpListener;
use std::sync::Arc;
use vidtube::configuration::{Environment, JwtSettings};
use vidtube::startup::run;
use vidtube::store::InMemoryUserStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let jwt_config = JwtSettings {
        access_token_secret: "health-access-secret-at-least-32-characters".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "health-refresh-secret-at-least-32-characters".to_string(),
        refresh_token_expiry: 864000,
        issuer: "vidtube-test".to_string(),
    };
    let server = run(
        listener,
        Arc::new(InMemoryUserStore::new()),
        jwt_config,
        Environment::Local,
    )
    .expect("Failed to create server");

    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/v1/videos", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
