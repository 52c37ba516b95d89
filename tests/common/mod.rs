#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use one_api_rust::app::{self, AppContext};
use one_api_rust::config::{AppConfig, StorageBackend};
use one_api_rust::database::models::{Role, User};
use one_api_rust::database::{Entity, MemoryStore, Record};
use one_api_rust::session::{MemorySessionStore, Session};

/// An in-process server on the memory backends, with a seeded administrator
pub struct TestServer {
    pub base_url: String,
    pub prefix: String,
    pub cookie_name: String,
    pub admin_cookie: String,
    pub ctx: AppContext,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.storage = StorageBackend::Memory;

        let ctx = AppContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemorySessionStore::new()),
            &config,
        );
        let router = app::router(&ctx, &config)?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let mut server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            prefix: config.server.api_prefix.clone(),
            cookie_name: config.session.cookie_name.clone(),
            admin_cookie: String::new(),
            ctx,
            client: reqwest::Client::new(),
        };
        server.admin_cookie = server.login_as("admin", &["*"]).await?;
        server.wait_ready(Duration::from_secs(10)).await?;

        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// Create a user holding one role with `permissions` and return a session cookie for them
    pub async fn login_as(&self, username: &str, permissions: &[&str]) -> Result<String> {
        let store = &self.ctx.store;

        let user: User = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": username,
            "username": username,
        }))?;
        let role: Role = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": format!("{} role", username),
            "permissions": permissions,
        }))?;

        store.create(User::meta(), user.to_record()?).await?;
        let roles = User::meta().relation("Roles").context("users have roles")?;
        store
            .association_append(User::meta(), user.id(), roles, role.to_record()?)
            .await?;

        let session = Session::new(Uuid::new_v4().to_string(), user.id(), chrono::Duration::hours(1));
        self.ctx.sessions.save(&session).await?;

        Ok(format!("{}={}", self.cookie_name, session.id))
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.get_as(path, &self.admin_cookie).await
    }

    pub async fn get_as(&self, path: &str, cookie: &str) -> Result<Response> {
        Ok(self
            .client
            .get(self.url(path))
            .header("Cookie", cookie)
            .send()
            .await?)
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        self.post_as(path, body, &self.admin_cookie).await
    }

    pub async fn post_as(&self, path: &str, body: &Value, cookie: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header("Cookie", cookie)
            .json(body)
            .send()
            .await?)
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Response> {
        Ok(self
            .client
            .put(self.url(path))
            .header("Cookie", &self.admin_cookie)
            .json(body)
            .send()
            .await?)
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .header("Cookie", &self.admin_cookie)
            .send()
            .await?)
    }

    /// Create a record through the API and return its wire form
    pub async fn create(&self, base: &str, body: Value) -> Result<Value> {
        let res = self.post(base, &body).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "create {} failed: {}", base, res.status());
        let body: Value = res.json().await?;
        Ok(body["item"].clone())
    }

    /// Insert rows directly into storage, bypassing the API
    pub async fn seed(&self, meta: &'static one_api_rust::database::EntityMeta, record: Record) -> Result<Record> {
        Ok(self.ctx.store.create(meta, record).await?)
    }
}

/// Error body fields `(error, message)`
pub async fn error_of(res: Response) -> Result<(String, String)> {
    let body: Value = res.json().await?;
    Ok((
        body["error"].as_str().unwrap_or_default().to_string(),
        body["message"].as_str().unwrap_or_default().to_string(),
    ))
}
