use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::helpers::{spawn_app, spawn_unconfigured_app};

#[tokio::test]
async fn reachable_store_is_connected() {
    let app = spawn_app().await;

    Mock::given(path("/rest/v1/Reparix"))
        .and(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let res = app.get("/health_check/backend").await;
    assert_eq!(200, res.status().as_u16());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(true, body["configured"]);
    assert_eq!(true, body["connected"]);
}

#[tokio::test]
async fn missing_table_is_not_connected() {
    let app = spawn_app().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.store_server)
        .await;

    let body: serde_json::Value = app.get("/health_check/backend").await.json().await.unwrap();
    assert_eq!(true, body["configured"]);
    assert_eq!(false, body["connected"]);
}

#[tokio::test]
async fn unconfigured_store_is_reported() {
    let app = spawn_unconfigured_app().await;

    let body: serde_json::Value = app.get("/health_check/backend").await.json().await.unwrap();
    assert_eq!(false, body["configured"]);
    assert_eq!(false, body["connected"]);
    assert!(app.store_server.received_requests().await.unwrap().is_empty());
}
