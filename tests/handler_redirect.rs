mod common;

use shortlink::infrastructure::counters::CounterStore;

#[tokio::test]
async fn test_redirect_temporary() {
    let mut app = common::create_test_app();
    app.create_link("promo", "https://example.com/a", 302).await;
    let server = common::test_server(app.state.clone());

    let response = server.get("/promo").await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(response.header("location"), "https://example.com/a");
    assert_eq!(
        response.header("cache-control"),
        "no-cache, no-store, must-revalidate"
    );

    let event = app.visits.try_recv().unwrap();
    assert_eq!(event.code, "promo");
    assert_eq!(event.visitor, "127.0.0.1");
}

#[tokio::test]
async fn test_redirect_permanent() {
    let app = common::create_test_app();
    app.create_link("docs", "https://example.com/docs", 301).await;
    let server = common::test_server(app.state.clone());

    let response = server.get("/docs").await;

    assert_eq!(response.status_code(), 301);
    assert_eq!(response.header("location"), "https://example.com/docs");
    assert!(response.maybe_header("cache-control").is_none());
}

#[tokio::test]
async fn test_redirect_code_with_slash() {
    let app = common::create_test_app();
    app.create_link("team/promo", "https://example.com/team", 302).await;
    let server = common::test_server(app.state.clone());

    let response = server.get("/team/promo").await;

    assert_eq!(response.status_code(), 302);
    assert_eq!(response.header("location"), "https://example.com/team");
}

#[tokio::test]
async fn test_redirect_not_found() {
    let app = common::create_test_app();
    let server = common::test_server(app.state.clone());

    let response = server.get("/nonexistent").await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_redirect_disabled_link_not_found() {
    let app = common::create_test_app();
    let link = app.create_link("promo", "https://example.com/a", 302).await;
    app.state.sync_service.set_disabled(link.id, true).await.unwrap();
    let server = common::test_server(app.state.clone());

    server.get("/promo").await.assert_status_not_found();
}

#[tokio::test]
async fn test_redirect_counts_visits() {
    let mut app = common::create_test_app();
    app.create_link("promo", "https://example.com/a", 302).await;
    let server = common::test_server(app.state.clone());

    for _ in 0..3 {
        assert_eq!(server.get("/promo").await.status_code(), 302);
    }
    assert_eq!(app.drain_visits().await, 3);

    assert_eq!(app.counters.get_total_pv("promo").await.unwrap(), Some(3));
    assert_eq!(app.counters.get_total_uv("promo").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_health() {
    let app = common::create_test_app();
    app.create_link("promo", "https://example.com/a", 302).await;
    let server = common::test_server(app.state.clone());

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["cache"]["status"], "ok");
    assert_eq!(body["checks"]["counters"]["status"], "ok");
    assert_eq!(body["checks"]["visit_queue"]["status"], "ok");
}

#[tokio::test]
async fn test_health_degraded_when_queue_closed() {
    let app = common::create_test_app();
    let common::TestApp { state, visits, .. } = app;
    drop(visits);
    let server = common::test_server(state);

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), 503);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["visit_queue"]["status"], "error");
}
