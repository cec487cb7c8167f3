use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod error;
mod handlers;
mod import;
mod models;
mod store;

use crate::config::Config;
use crate::store::ProductStore;

/// Shared application state — cheap to clone (all heap behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProductStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,catalog_service=debug".parse().unwrap()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Catalog Service  —  Rust + Axum     ║");
    info!("║  Flat-file product catalog backend   ║");
    info!("╚══════════════════════════════════════╝");

    let store = ProductStore::open(config.data_file.clone()).await?;
    info!(
        path = %config.data_file.display(),
        products = store.len().await,
        "Product store ready"
    );

    let state = AppState {
        store: Arc::new(store),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health & demo login ─────────────────────────────────────────────
        .route("/api/health", get(handlers::health))
        .route("/api/login", post(handlers::auth::login))

        // ── Products CRUD ───────────────────────────────────────────────────
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )

        // ── Bulk import / export ────────────────────────────────────────────
        .route(
            "/api/products/import/json",
            post(handlers::import::import_json),
        )
        .route(
            "/api/products/import/csv",
            post(handlers::import::import_csv),
        )
        .route(
            "/api/products/export/csv",
            get(handlers::products::export_csv),
        )

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "CATALOG-TEST-BOUNDARY";

    async fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = ProductStore::open(dir.path().join("products.json"))
            .await
            .unwrap();
        let state = AppState {
            store: Arc::new(store),
        };
        (dir, build_router(state))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn upload_request(uri: &str, filename: &str, content_type: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: {ct}\r\n\
             \r\n\
             {data}\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            ct = content_type,
            data = data,
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router, name: &str, price: f64) -> Value {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/products",
                json!({ "name": name, "price": price }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    // ── Health ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_ok_with_timestamp() {
        let (_dir, app) = test_app().await;
        let response = app.oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["time"].is_string());
    }

    // ── Login ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn login_returns_static_admin_token() {
        let (_dir, app) = test_app().await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/login",
                json!({ "email": "admin@lore.com", "password": "password" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["token"], "SIMULATED_TOKEN_123");
        assert_eq!(body["user"]["email"], "admin@lore.com");
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (_dir, app) = test_app().await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/login",
                json!({ "email": "admin@lore.com", "password": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ── Products CRUD ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_dir, app) = test_app().await;
        let created = create(&app, "Mug", 4.5).await;
        assert_eq!(created["id"], 1);

        let response = app
            .oneshot(get_request("/api/products/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);
    }

    #[tokio::test]
    async fn list_returns_plain_array() {
        let (_dir, app) = test_app().await;
        create(&app, "A", 1.0).await;
        create(&app, "B", 2.0).await;

        let response = app.oneshot(get_request("/api/products")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let (_dir, app) = test_app().await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/products",
                json!({ "name": "   " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_preserves_id_whatever_the_body_says() {
        let (_dir, app) = test_app().await;
        create(&app, "Mug", 4.5).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/products/1",
                json!({ "id": 999, "price": 12.0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["price"], 12.0);
        assert_eq!(body["name"], "Mug");
    }

    #[tokio::test]
    async fn update_missing_product_is_404() {
        let (_dir, app) = test_app().await;
        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/products/42",
                json!({ "price": 1.0 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_acknowledges_then_404s() {
        let (_dir, app) = test_app().await;
        create(&app, "Mug", 4.5).await;

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/products/1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "ok": true }));

        let response = app
            .oneshot(get_request("/api/products/1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_missing_product_is_404() {
        let (_dir, app) = test_app().await;
        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/products/9")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // ── Import ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn json_import_merge_appends_to_catalog() {
        let (_dir, app) = test_app().await;
        create(&app, "Existing", 1.0).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/products/import/json",
                json!({ "products": [
                    { "name": "Imported A", "price": 2.0 },
                    { "name": "Imported B", "price": 3.0 },
                ]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["imported"], 2);
        assert_eq!(body["total"], 3);
        assert_eq!(body["mode"], "merge");

        let list = body_json(app.oneshot(get_request("/api/products")).await.unwrap()).await;
        let ids: Vec<u64> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn json_import_replace_discards_prior_records() {
        let (_dir, app) = test_app().await;
        create(&app, "Old", 1.0).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/products/import/json?mode=replace",
                json!({ "products": [{ "name": "Only", "price": 5.0 }] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["imported"], 1);
        assert_eq!(body["total"], 1);
        assert_eq!(body["mode"], "replace");

        let list = body_json(app.oneshot(get_request("/api/products")).await.unwrap()).await;
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "Only");
    }

    #[tokio::test]
    async fn json_import_accepts_uploaded_array_file() {
        let (_dir, app) = test_app().await;

        let response = app
            .clone()
            .oneshot(upload_request(
                "/api/products/import/json",
                "products.json",
                "application/json",
                r#"[{ "name": "From file", "price": 7.5 }]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["imported"], 1);
    }

    #[tokio::test]
    async fn json_import_rejects_malformed_payload() {
        let (_dir, app) = test_app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/products/import/json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn csv_import_assigns_ids_after_current_maximum() {
        let (_dir, app) = test_app().await;
        create(&app, "Existing", 1.0).await;

        let csv = "id,name,price,image,description,category\n\
                   ,From CSV A,9.99,,first,Misc\n\
                   ,From CSV B,19.99,,second,Misc\n";
        let response = app
            .clone()
            .oneshot(upload_request(
                "/api/products/import/csv",
                "products.csv",
                "text/csv",
                csv,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["imported"], 2);
        assert_eq!(body["total"], 3);

        let list = body_json(app.oneshot(get_request("/api/products")).await.unwrap()).await;
        let ids: Vec<u64> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn csv_import_without_file_field_is_rejected() {
        let (_dir, app) = test_app().await;
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\
             \r\n\
             hello\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/products/import/csv")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ── Export ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn csv_export_serves_the_catalog_as_attachment() {
        let (_dir, app) = test_app().await;
        create(&app, "Mug", 4.5).await;

        let response = app
            .oneshot(get_request("/api/products/export/csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("id,name,price,image,description,category"));
        assert!(text.contains("1,Mug,4.5"));
    }
}
