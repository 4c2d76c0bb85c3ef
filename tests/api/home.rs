use crate::helpers::{spawn_app, spawn_unconfigured_app};

#[tokio::test]
async fn landing_page_has_newsletter_form() {
    let app = spawn_app().await;

    let res = app.get("/").await;
    assert_eq!(200, res.status().as_u16());
    assert!(res
        .headers()
        .get("content-type")
        .is_some_and(|v| v.to_str().unwrap().starts_with("text/html")));

    let page = res.text().await.unwrap();
    assert!(page.contains(r#"<form method="post" action="/subscriptions""#));
    assert!(page.contains(r#"data-status="idle""#));
    assert!(!page.contains(" disabled"));
}

#[tokio::test]
async fn landing_page_without_store_disables_form() {
    let app = spawn_unconfigured_app().await;

    let page = app.get("/").await.text().await.unwrap();
    assert!(page.contains("<button type=\"submit\" disabled>"));
    assert!(page.contains("temporarily unavailable"));
}
