//! Application router configuration.

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    batch_import::{get_import_page, import_transactions},
    dashboard::{create_transaction_endpoint, get_dashboard_page, get_transaction_page, post_refresh},
    endpoints,
    live::get_live_feed,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::LIVE_FEED, get(get_live_feed))
        .route(endpoints::TRANSACTION_VIEW, get(get_transaction_page))
        .route(endpoints::IMPORT_VIEW, get(get_import_page));

    let api_routes = Router::new()
        .route(endpoints::REFRESH, post(post_refresh))
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(endpoints::IMPORT, post(import_transactions));

    page_routes
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum_test::TestServer;

    use crate::{
        AppState, config::AppConfig, dashboard::DashboardStore, endpoints, live::LiveHandle,
        test_utils::FakeApi, transaction::test_utils::transaction,
    };

    use super::build_router;

    fn server() -> TestServer {
        let state = AppState::new(
            Arc::new(FakeApi::with_transactions(vec![transaction(1, 42.0)])),
            DashboardStore::default(),
            LiveHandle::disconnected(),
            &AppConfig::default(),
        );

        TestServer::try_new(build_router(state)).unwrap()
    }

    #[tokio::test]
    async fn serves_pages() {
        let server = server();

        for path in [endpoints::DASHBOARD_VIEW, endpoints::IMPORT_VIEW, endpoints::LIVE_FEED] {
            server.get(path).await.assert_status_ok();
        }
    }

    #[tokio::test]
    async fn serves_transaction_detail() {
        let server = server();

        server.get("/transactions/1").await.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = server();

        server
            .get("/does-not-exist")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
