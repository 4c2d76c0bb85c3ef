use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::helpers::{spawn_app, spawn_unconfigured_app};

fn store_error(status: u16, code: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "code": code,
        "message": "rejected by the test store",
        "details": null,
        "hint": null
    }))
}

#[tokio::test]
async fn valid_subscribe() {
    let app = spawn_app().await;

    Mock::given(path("/rest/v1/Reparix"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": 1, "email": "git@github.com" }
        ])))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let res = app.post_subscriptions(" Git@GitHub.com ").await;
    assert_eq!(200, res.status().as_u16());

    let page = res.text().await.unwrap();
    assert!(page.contains("You are now subscribed"));
    assert!(page.contains(r#"value="""#));
    assert!(page.contains(r#"http-equiv="refresh" content="5; url=/#newsletter""#));

    let rows = app.inserted_rows().await;
    assert_eq!("git@github.com", rows[0][0]["email"]);
    assert!(rows[0][0]["created_at"].is_string());
}

#[tokio::test]
async fn invalid_subscribe() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.store_server)
        .await;

    let datas = [
        ("", "email is empty."),
        ("gitgithub.com", "missing @."),
        ("git@github", "domain without a dot."),
        ("@github.com", "missing local part."),
    ];
    for (email, payload) in datas {
        let res = app.post_subscriptions(email).await;
        assert_eq!(400, res.status().as_u16(), "{payload}");
        let page = res.text().await.unwrap();
        assert!(page.contains("Please enter a valid email address."), "{payload}");
    }
}

#[tokio::test]
async fn missing_email_field_is_rejected() {
    let app = spawn_app().await;

    let res = reqwest::Client::new()
        .post(format!("{}/subscriptions", &app.address))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("name=git")
        .send()
        .await
        .expect("failed to execute request.");
    assert_eq!(400, res.status().as_u16());
}

#[tokio::test]
async fn duplicate_subscribe_keeps_input() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(store_error(409, "23505"))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let res = app.post_subscriptions("git@github.com").await;
    assert_eq!(409, res.status().as_u16());

    let page = res.text().await.unwrap();
    assert!(page.contains("already subscribed"));
    assert!(page.contains(r#"value="git@github.com""#));
    assert!(!page.contains("http-equiv"));
}

#[tokio::test]
async fn permission_error_has_its_own_message() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(store_error(401, "42501"))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let res = app.post_subscriptions("git@github.com").await;
    assert_eq!(500, res.status().as_u16());

    let page = res.text().await.unwrap();
    assert!(page.contains("not allowed to record your subscription"));
    assert!(!page.contains("Please try again."));
}

#[tokio::test]
async fn store_failure_asks_to_retry() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&app.store_server)
        .await;

    let res = app.post_subscriptions("git@github.com").await;
    assert_eq!(500, res.status().as_u16());
    assert!(res.text().await.unwrap().contains("Please try again."));
}

#[tokio::test]
async fn same_email_twice_is_duplicate() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .expect(1)
        .mount(&app.store_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(store_error(409, "23505"))
        .expect(1)
        .mount(&app.store_server)
        .await;

    assert_eq!(200, app.post_subscriptions("git@github.com").await.status().as_u16());
    assert_eq!(409, app.post_subscriptions("git@github.com").await.status().as_u16());
    assert_eq!(2, app.inserted_rows().await.len());
}

#[tokio::test]
async fn unconfigured_store_is_unavailable() {
    let app = spawn_unconfigured_app().await;

    let res = app.post_subscriptions("git@github.com").await;
    assert_eq!(503, res.status().as_u16());
    assert!(res.text().await.unwrap().contains("temporarily unavailable"));
    assert!(app.store_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn double_submit_inserts_once() {
    let app = spawn_app().await;

    Mock::given(path("/rest/v1/Reparix"))
        .and(method("POST"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([{ "id": 1, "email": "git@github.com" }]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&app.store_server)
        .await;

    let (first, second) = tokio::join!(
        app.post_subscriptions("git@github.com"),
        app.post_subscriptions("git@github.com"),
    );
    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!([200, 409], statuses);

    let busy = if first.status().as_u16() == 409 { first } else { second };
    let page = busy.text().await.unwrap();
    assert!(page.contains(r#"data-status="submitting""#));
    assert!(page.contains("Subscribing..."));

    assert_eq!(1, app.inserted_rows().await.len());
}
