mod test_utils;

use axum::Router;
use axum_test::TestServer;
use serde_json::Value;

use caresync_api::routes;

use test_utils::TestContext;

fn test_server() -> TestServer {
    let ctx = TestContext::new();
    let app: Router = Router::new()
        .merge(routes::health::routes())
        .with_state(ctx.build_state());

    TestServer::new(app).expect("failed to start test server")
}

#[tokio::test]
async fn test_health_check_returns_ok() {
    let server = test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_version_reports_crate_version() {
    let server = test_server();

    let response = server.get("/version").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
