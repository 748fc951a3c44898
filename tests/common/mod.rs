use std::net::SocketAddr;

use chrono::Duration;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use fruitful_backend::config::{Config, JwtConfig};
use fruitful_backend::manage::{self, CreateOutcome, CreateUser};

pub const CSV_HEADER: &str = "calendar_month,impressions,engagements,outbound_clicks,saves";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    admin_url: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/auth/register"))
            .json(body)
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Login through the password form and return the raw response.
    pub async fn login_response(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await
            .expect("login request failed")
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self.login_response(email, password).await;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register an ordinary user and return an access token for them.
    pub async fn user_token(&self, email: &str) -> String {
        let (body, status) = self
            .register(&json!({ "email": email, "password": "password123" }))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        self.token_for(email, "password123").await
    }

    /// Create an admin through the management API and return a token.
    pub async fn admin_token(&self, email: &str) -> String {
        let outcome = manage::create_user(
            &self.pool,
            CreateUser {
                email,
                password: "admin-password",
                full_name: Some("Admin"),
                is_admin: true,
                groups: vec![],
            },
        )
        .await
        .expect("admin creation failed");
        assert!(matches!(outcome, CreateOutcome::Created(_)));
        self.token_for(email, "admin-password").await
    }

    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let (body, status) = self.login(email, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Make a GET request, optionally with a bearer token.
    pub async fn get(&self, path: &str, token: Option<&str>) -> (Value, StatusCode) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Upload CSV text as the `file` part.
    pub async fn upload_csv(
        &self,
        token: &str,
        csv: &str,
        content_type: &str,
        query: &str,
    ) -> (Value, StatusCode) {
        let part = reqwest::multipart::Part::bytes(csv.as_bytes().to_vec())
            .file_name("stats.csv")
            .mime_str(content_type)
            .expect("valid mime");
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url(&format!("/pinterest-stats/upload-csv{query}")))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("upload request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn stat_count(&self) -> i64 {
        fruitful_backend::db::monthly_stats::count_all(&self.pool)
            .await
            .unwrap()
    }
}

/// Spawn a test app with a fresh temporary database.
///
/// The database tests are `#[ignore]`d; run them against Postgres with
/// `cargo test -- --include-ignored`.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("fruitful_test_{}", Uuid::now_v7().simple());

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt: JwtConfig::new(
            Some("test-jwt-secret-that-is-long-enough".to_string()),
            Duration::minutes(60),
        ),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        max_upload_size: 1_048_576,
        log_level: "warn".to_string(),
    };

    let app = fruitful_backend::build_app(pool.clone(), config);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
        admin_url,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    app.pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&app.admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
        app.db_name
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}
