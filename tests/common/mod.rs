//! Shared harness: a real server on an ephemeral port backed by a temp database.
#![allow(dead_code)]

use forum::auth::totp::Totp;
use forum::config::Config;
use forum::db;
use forum::state::{AppState, DbPool};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse";

pub struct TestServer {
    pub base_url: String,
    pub pool: DbPool,
    pub config: Config,
    _dir: TempDir,
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub totp_secret: Option<String>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("forum.db")).expect("create pool");
        db::run_migrations(&pool).expect("run migrations");

        let config = Config::default();
        let state = AppState {
            db: pool.clone(),
            config: config.clone(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, forum::app(state)).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            pool,
            config,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Insert a user directly; cheap bcrypt cost keeps the suite fast.
    pub fn add_user(&self, username: &str, with_totp: bool) -> TestUser {
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let secret = with_totp
            .then(|| Totp::enroll(&self.config.auth.totp_issuer, username).unwrap().secret);
        let conn = self.pool.get().unwrap();
        let id = db::users::create_user(
            &conn,
            username,
            &username.to_uppercase(),
            &hash,
            secret.as_deref(),
        )
        .unwrap();
        TestUser {
            id,
            username: username.to_string(),
            totp_secret: secret,
        }
    }

    pub fn anonymous_client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    /// A cookie-holding client logged in as `user`.
    pub async fn login(&self, user: &TestUser) -> Client {
        let client = self.anonymous_client();
        let response = client
            .post(self.url("/sessions"))
            .json(&json!({ "username": user.username, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        client
    }

    /// Log in and confirm the second factor.
    pub async fn login_admin(&self, user: &TestUser) -> Client {
        let client = self.login(user).await;
        let secret = user.totp_secret.as_deref().expect("user has no TOTP secret");
        let code = Totp::new(secret, &self.config.auth.totp_issuer, &user.username)
            .current_code()
            .unwrap();
        let response = client
            .post(self.url("/login-totp"))
            .json(&json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        client
    }

    pub async fn create_post(&self, client: &Client, title: &str, max_comments: Option<i64>) -> i64 {
        let mut body = json!({ "title": title, "text": "Some text" });
        if let Some(max) = max_comments {
            body["max_comments"] = json!(max);
        }
        let response = client
            .post(self.url("/posts/add"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    pub async fn add_comment(&self, client: &Client, post_id: i64, text: &str) -> reqwest::Response {
        client
            .post(self.url("/comments/add"))
            .json(&json!({ "postId": post_id, "text": text }))
            .send()
            .await
            .unwrap()
    }

    pub async fn get_json(&self, client: &Client, path: &str) -> (StatusCode, Value) {
        let response = client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}
