use crate::common::{TestApp, routes};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::HEALTH).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_lists_entry_routes() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token("/api-docs/openapi.json").await;
    assert_eq!(res.status, 200);
    let paths = res.body["paths"].as_object().unwrap();
    assert!(paths.keys().any(|p| p.starts_with("/api/entries")));
    assert!(res.body["paths"]["/api/entries/{id}/polish"].is_object());
}

mod rate_limit {
    use super::*;

    #[tokio::test]
    async fn requests_over_the_limit_are_rejected() {
        let app = TestApp::spawn_with(|config| {
            config.rate_limit.max_requests = 2;
            config.rate_limit.window_secs = 60;
        })
        .await;

        let first = app.get_without_token(routes::HEALTH).await;
        assert_eq!(first.status, 200);
        assert_eq!(first.headers["x-ratelimit-limit"], "2");
        assert_eq!(first.headers["x-ratelimit-remaining"], "1");

        let second = app.get_without_token(routes::HEALTH).await;
        assert_eq!(second.status, 200);

        let third = app.get_without_token(routes::HEALTH).await;
        assert_eq!(third.status, 429);
        assert_eq!(third.code(), "RATE_LIMITED");
        let retry_after: u64 = third.headers["retry-after"].to_str().unwrap().parse().unwrap();
        assert!(retry_after >= 1 && retry_after <= 60);
    }

    #[tokio::test]
    async fn disabled_limiter_adds_no_headers() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert!(res.headers.get("x-ratelimit-limit").is_none());
    }
}
